use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[sea_orm(string_value = "regular")]
    Regular,
    #[sea_orm(string_value = "admin")]
    Admin,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    #[sea_orm(string_value = "pre_owned")]
    PreOwned,
    #[sea_orm(string_value = "accessory")]
    Accessory,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    #[sea_orm(string_value = "printing")]
    Printing,
    #[sea_orm(string_value = "repair")]
    Repair,
}

/// `Pending -> Fulfilled` is the only transition; `Fulfilled` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "fulfilled")]
    Fulfilled,
}

/// What a walk-in sale sold: exactly one product or one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WalkInTarget {
    Product(Uuid),
    Service(Uuid),
}

impl WalkInTarget {
    /// Rebuild the union from the two nullable storage columns.
    pub fn from_columns(product_id: Option<Uuid>, service_id: Option<Uuid>) -> Option<Self> {
        match (product_id, service_id) {
            (Some(id), None) => Some(Self::Product(id)),
            (None, Some(id)) => Some(Self::Service(id)),
            _ => None,
        }
    }

    pub fn product_id(&self) -> Option<Uuid> {
        match self {
            Self::Product(id) => Some(*id),
            Self::Service(_) => None,
        }
    }

    pub fn service_id(&self) -> Option<Uuid> {
        match self {
            Self::Product(_) => None,
            Self::Service(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub price: Decimal,
    pub image: Option<String>,
    pub category: ProductCategory,
    pub stock_remaining: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub starting_price: Option<Decimal>,
    pub image: Option<String>,
    pub category: ServiceCategory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// `None` while unpaid.
    pub price_paid: Option<Decimal>,
    pub status: OrderStatus,
    pub delivery_location: String,
    pub phone_number: String,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalkIn {
    pub id: Uuid,
    pub customer_name: Option<String>,
    pub quantity: i32,
    pub price_paid: Decimal,
    pub target: WalkInTarget,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_in_target_requires_exactly_one_column() {
        let id = Uuid::new_v4();
        assert_eq!(
            WalkInTarget::from_columns(Some(id), None),
            Some(WalkInTarget::Product(id))
        );
        assert_eq!(
            WalkInTarget::from_columns(None, Some(id)),
            Some(WalkInTarget::Service(id))
        );
        assert_eq!(WalkInTarget::from_columns(None, None), None);
        assert_eq!(WalkInTarget::from_columns(Some(id), Some(id)), None);
    }

    #[test]
    fn walk_in_target_serializes_tagged() {
        let id = Uuid::nil();
        let json = serde_json::to_value(WalkInTarget::Service(id)).unwrap();
        assert_eq!(json["kind"], "service");
        assert_eq!(json["id"], id.to_string());
    }
}
