pub mod auth;
pub mod finance;
pub mod orders;
pub mod products;
pub mod services;
pub mod uploads;
pub mod walk_ins;
