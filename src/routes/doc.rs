use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        finance::{FinanceSummary, MonthlyRevenue},
        orders::{CreateOrderRequest, FulfillOrderRequest, OrderDetail, OrderList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        services::{CreateServiceRequest, ServiceList, UpdateServiceRequest},
        uploads::UploadList,
        walk_ins::{CreateWalkInRequest, WalkInList},
    },
    models::{
        Order, OrderStatus, Product, ProductCategory, Role, Service, ServiceCategory, User,
        WalkIn, WalkInTarget,
    },
    response::{ApiResponse, Meta},
    routes::{admin, health, orders, products, services},
    storage::UploadOutcome,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        services::list_services,
        services::get_service,
        orders::place_order,
        orders::list_orders,
        orders::get_order,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::create_service,
        admin::update_service,
        admin::delete_service,
        admin::upload_images,
        admin::list_all_orders,
        admin::fulfill_order,
        admin::delete_order,
        admin::list_walk_ins,
        admin::create_walk_in,
        admin::delete_walk_in,
        admin::list_low_stock,
        admin::finance_summary
    ),
    components(
        schemas(
            Role,
            User,
            Product,
            ProductCategory,
            Service,
            ServiceCategory,
            Order,
            OrderStatus,
            WalkIn,
            WalkInTarget,
            CreateProductRequest,
            UpdateProductRequest,
            CreateServiceRequest,
            UpdateServiceRequest,
            CreateOrderRequest,
            FulfillOrderRequest,
            CreateWalkInRequest,
            ProductList,
            ServiceList,
            OrderList,
            OrderDetail,
            WalkInList,
            UploadList,
            UploadOutcome,
            FinanceSummary,
            MonthlyRevenue,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<FinanceSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Public product catalog"),
        (name = "Services", description = "Public service catalog"),
        (name = "Orders", description = "Customer order-intents"),
        (name = "Admin", description = "Catalog, fulfillment, walk-ins and finance"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_admin_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/admin/orders/{id}/fulfill",
            "/api/admin/walk-ins/{id}",
            "/api/admin/finance",
            "/api/orders",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
