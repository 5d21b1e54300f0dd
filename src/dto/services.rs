use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Service, ServiceCategory};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateServiceRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub title: String,
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(custom(function = "crate::validation::non_negative_price"))]
    #[schema(value_type = Option<String>)]
    pub starting_price: Option<Decimal>,
    pub image: Option<String>,
    pub category: ServiceCategory,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateServiceRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    #[validate(custom(function = "crate::validation::non_negative_price"))]
    #[schema(value_type = Option<String>)]
    pub starting_price: Option<Decimal>,
    pub image: Option<String>,
    pub category: Option<ServiceCategory>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ServiceList {
    #[schema(value_type = Vec<Service>)]
    pub items: Vec<Service>,
}
