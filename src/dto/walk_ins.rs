use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::WalkIn;

/// Wire shape of a walk-in sale. `product_id` and `service_id` are mutually
/// exclusive; `into_walk_in` turns the pair into a `WalkInTarget`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateWalkInRequest {
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub customer_name: Option<String>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
    #[validate(custom(function = "crate::validation::non_negative_price"))]
    #[schema(value_type = Option<String>)]
    pub price_paid: Option<Decimal>,
    pub product_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalkInList {
    pub items: Vec<WalkIn>,
}
