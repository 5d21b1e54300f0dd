use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        finance::{FinanceQuery, FinanceSummary},
        orders::{FulfillOrderRequest, OrderList},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        services::{CreateServiceRequest, UpdateServiceRequest},
        uploads::UploadList,
        walk_ins::{CreateWalkInRequest, WalkInList},
    },
    error::AppResult,
    middleware::auth::Session,
    models::{Order, Product, Service, WalkIn},
    response::ApiResponse,
    routes::{
        multipart::{read_catalog_form, read_files},
        params::{LowStockQuery, OrderListQuery, Pagination},
    },
    services::{
        admin_service, finance_service, offering_service, product_service, upload_service,
        walk_in_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/services", post(create_service))
        .route("/services/{id}", put(update_service).delete(delete_service))
        .route("/uploads", post(upload_images))
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", delete(delete_order))
        .route("/orders/{id}/fulfill", post(fulfill_order))
        .route("/walk-ins", get(list_walk_ins).post(create_walk_in))
        .route("/walk-ins/{id}", delete(delete_walk_in))
        .route("/inventory/low-stock", get(list_low_stock))
        .route("/finance", get(finance_summary))
}

#[utoipa::path(
    post,
    path = "/api/admin/products",
    request_body(
        content = CreateProductRequest,
        content_type = "multipart/form-data",
        description = "`data` part with the JSON payload, optional `image` file part"
    ),
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Duplicate title"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid payload"),
        (status = 502, description = "Image upload failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    session.require_admin()?;
    let form = read_catalog_form::<CreateProductRequest>(multipart).await?;
    let resp = product_service::create_product(&state, &session, form.payload, form.image).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(
        content = UpdateProductRequest,
        content_type = "multipart/form-data",
        description = "`data` part with the fields to change, optional `image` file part"
    ),
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    session.require_admin()?;
    let form = read_catalog_form::<UpdateProductRequest>(multipart).await?;
    let resp =
        product_service::update_product(&state, &session, id, form.payload, form.image).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product with its orders and walk-ins"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/services",
    request_body(
        content = CreateServiceRequest,
        content_type = "multipart/form-data",
        description = "`data` part with the JSON payload, optional `image` file part"
    ),
    responses(
        (status = 200, description = "Create service", body = ApiResponse<Service>),
        (status = 400, description = "Duplicate title"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid payload"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_service(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Service>>> {
    session.require_admin()?;
    let form = read_catalog_form::<CreateServiceRequest>(multipart).await?;
    let resp =
        offering_service::create_service(&state, &session, form.payload, form.image).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/services/{id}",
    params(
        ("id" = Uuid, Path, description = "Service ID")
    ),
    request_body(
        content = UpdateServiceRequest,
        content_type = "multipart/form-data",
        description = "`data` part with the fields to change, optional `image` file part"
    ),
    responses(
        (status = 200, description = "Updated service", body = ApiResponse<Service>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_service(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Service>>> {
    session.require_admin()?;
    let form = read_catalog_form::<UpdateServiceRequest>(multipart).await?;
    let resp =
        offering_service::update_service(&state, &session, id, form.payload, form.image).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/services/{id}",
    params(
        ("id" = Uuid, Path, description = "Service ID")
    ),
    responses(
        (status = 200, description = "Deleted service with its walk-ins"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_service(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = offering_service::delete_service(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/uploads",
    responses(
        (status = 200, description = "Per-file outcome for the `files` parts (png, jpg, jpeg, webp)", body = ApiResponse<UploadList>),
        (status = 403, description = "Forbidden"),
        (status = 502, description = "Image upload failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<UploadList>>> {
    session.require_admin()?;
    let files = read_files(multipart).await?;
    let resp = upload_service::upload_images(&state, &session, files).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending or fulfilled"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/fulfill",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = FulfillOrderRequest,
    responses(
        (status = 200, description = "Order fulfilled and stock taken", body = ApiResponse<Order>),
        (status = 400, description = "Already fulfilled or not enough stock"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Invalid price"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn fulfill_order(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<FulfillOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::fulfill_order(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Deleted pending order"),
        (status = 400, description = "Fulfilled orders cannot be deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = admin_service::delete_order(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/walk-ins",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Recorded walk-in sales", body = ApiResponse<WalkInList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_walk_ins(
    State(state): State<AppState>,
    session: Session,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<WalkInList>>> {
    let resp = walk_in_service::list_walk_ins(&state, &session, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/walk-ins",
    request_body = CreateWalkInRequest,
    responses(
        (status = 200, description = "Walk-in recorded", body = ApiResponse<WalkIn>),
        (status = 400, description = "Not enough stock"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Product or service not found"),
        (status = 422, description = "Invalid walk-in"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_walk_in(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateWalkInRequest>,
) -> AppResult<Json<ApiResponse<WalkIn>>> {
    let resp = walk_in_service::create_walk_in(&state, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/walk-ins/{id}",
    params(
        ("id" = Uuid, Path, description = "Walk-in ID")
    ),
    responses(
        (status = 200, description = "Walk-in deleted, product stock restored", body = ApiResponse<WalkIn>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_walk_in(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<WalkIn>>> {
    let resp = walk_in_service::delete_walk_in(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(
        ("threshold" = Option<i32>, Query, description = "Stock threshold, default 5"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List low stock products", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = admin_service::list_low_stock(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/finance",
    params(
        ("from" = Option<String>, Query, description = "Inclusive start date, YYYY-MM-DD"),
        ("to" = Option<String>, Query, description = "Exclusive end date, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Revenue from fulfilled orders and walk-ins", body = ApiResponse<FinanceSummary>),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Invalid date range"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn finance_summary(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<FinanceQuery>,
) -> AppResult<Json<ApiResponse<FinanceSummary>>> {
    let resp = finance_service::summary(&state, &session, query).await?;
    Ok(Json(resp))
}
