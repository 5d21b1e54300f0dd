use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::{Order, Product, User};

/// Order-intent placed by a signed-in customer. The upper bound on `quantity`
/// is the live stock and is applied by `validation::OrderIntentRules`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
    #[validate(length(min = 5, max = 200, message = "must be between 5 and 200 characters"))]
    pub delivery_location: String,
    #[validate(
        length(min = 8, max = 15, message = "must be between 8 and 15 characters"),
        regex(path = *crate::validation::PHONE_RE, message = "is not a valid phone number")
    )]
    pub phone_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FulfillOrderRequest {
    #[schema(value_type = String, example = "30.00")]
    pub price_paid: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub product: Option<Product>,
    pub customer: Option<User>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
