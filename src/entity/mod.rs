pub mod audit_logs;
pub mod orders;
pub mod products;
pub mod services;
pub mod users;
pub mod walk_ins;

pub use audit_logs::Entity as AuditLogs;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use services::Entity as Services;
pub use users::Entity as Users;
pub use walk_ins::Entity as WalkIns;
