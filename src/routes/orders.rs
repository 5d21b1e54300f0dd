use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderDetail, OrderList},
    error::AppResult,
    middleware::auth::Session,
    models::Order,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/{id}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed, pending fulfillment", body = ApiResponse<Order>),
        (status = 403, description = "Not signed in"),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Invalid order details"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::place_order(&state, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending or fulfilled"),
        ("sort_order" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "The caller's orders", body = ApiResponse<OrderList>),
        (status = 403, description = "Not signed in"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_my_orders(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with product and customer", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_order(&state, &session, id).await?;
    Ok(Json(resp))
}
