//! Append-only trail of admin and customer mutations.

use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    ServiceCreate,
    ServiceUpdate,
    ServiceDelete,
    OrderPlace,
    OrderFulfill,
    OrderDelete,
    WalkInCreate,
    WalkInDelete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductCreate => "product_create",
            Self::ProductUpdate => "product_update",
            Self::ProductDelete => "product_delete",
            Self::ServiceCreate => "service_create",
            Self::ServiceUpdate => "service_update",
            Self::ServiceDelete => "service_delete",
            Self::OrderPlace => "order_place",
            Self::OrderFulfill => "order_fulfill",
            Self::OrderDelete => "order_delete",
            Self::WalkInCreate => "walk_in_create",
            Self::WalkInDelete => "walk_in_delete",
        }
    }

    /// Table the action touched.
    pub fn resource(self) -> &'static str {
        match self {
            Self::ProductCreate | Self::ProductUpdate | Self::ProductDelete => "products",
            Self::ServiceCreate | Self::ServiceUpdate | Self::ServiceDelete => "services",
            Self::OrderPlace | Self::OrderFulfill | Self::OrderDelete => "orders",
            Self::WalkInCreate | Self::WalkInDelete => "walk_ins",
        }
    }
}

pub async fn log_audit(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    metadata: Option<Value>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record an audit entry. A failed write is logged and does not fail the
/// mutation that triggered it.
pub async fn record(pool: &DbPool, user_id: Uuid, action: AuditAction, metadata: Value) {
    if let Err(err) = log_audit(pool, Some(user_id), action, Some(metadata)).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_map_to_their_tables() {
        assert_eq!(AuditAction::OrderFulfill.as_str(), "order_fulfill");
        assert_eq!(AuditAction::OrderFulfill.resource(), "orders");
        assert_eq!(AuditAction::WalkInDelete.resource(), "walk_ins");
        assert_eq!(AuditAction::ServiceUpdate.resource(), "services");
    }
}
