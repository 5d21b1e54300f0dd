use serde::Deserialize;
use utoipa::ToSchema;

use crate::models::{OrderStatus, ProductCategory, ServiceCategory};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1).saturating_mul(per_page);
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Title,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category: Option<ProductCategory>,
    pub tag: Option<String>,
    pub in_stock: Option<bool>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ServiceQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub category: Option<ServiceCategory>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

/// Query structs carry `page`/`per_page` inline; `serde(flatten)` breaks numeric
/// fields under urlencoded deserialization.
macro_rules! paginated {
    ($($ty:ty),+) => {
        $(impl $ty {
            pub fn pagination(&self) -> Pagination {
                Pagination {
                    page: self.page,
                    per_page: self.per_page,
                }
            }
        })+
    };
}

paginated!(ProductQuery, ServiceQuery, OrderListQuery, LowStockQuery);

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LowStockQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub threshold: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let p = Pagination {
            page: Some(0),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (1, 100, 0));

        let p = Pagination {
            page: Some(3),
            per_page: None,
        };
        assert_eq!(p.normalize(), (3, 20, 40));
    }

    #[test]
    fn huge_page_saturates_offset() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(100),
        };
        assert_eq!(p.normalize(), (i64::MAX, 100, i64::MAX));
    }
}
