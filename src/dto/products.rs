use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Product, ProductCategory};

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateProductRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub title: String,
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(custom(function = "crate::validation::positive_price"))]
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,
    /// Ignored when an image file is uploaded with the request.
    pub image: Option<String>,
    pub category: ProductCategory,
    #[validate(range(min = 0, message = "must be 0 or more"))]
    pub stock_remaining: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "crate::validation::non_blank"))]
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    #[validate(custom(function = "crate::validation::positive_price"))]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub image: Option<String>,
    pub category: Option<ProductCategory>,
    #[validate(range(min = 0, message = "must be 0 or more"))]
    pub stock_remaining: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Trim tags, drop empty ones and keep the first occurrence of duplicates.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_keep_order_without_blanks_or_duplicates() {
        let tags = vec![" toner ".into(), "".into(), "hp".into(), "toner".into()];
        assert_eq!(normalize_tags(tags), vec!["toner".to_string(), "hp".to_string()]);
    }

    #[test]
    fn tags_default_to_empty() {
        let req: CreateProductRequest = serde_json::from_value(serde_json::json!({
            "title": "USB cable",
            "description": "1m braided",
            "price": "4.50",
            "category": "accessory",
            "stock_remaining": 12
        }))
        .unwrap();
        assert!(req.tags.is_empty());
        assert_eq!(req.price, Decimal::new(450, 2));
    }
}
