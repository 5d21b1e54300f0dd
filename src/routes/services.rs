use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::services::ServiceList,
    error::AppResult,
    models::Service,
    response::ApiResponse,
    routes::params::ServiceQuery,
    services::offering_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services))
        .route("/{id}", get(get_service))
}

#[utoipa::path(
    get,
    path = "/api/services",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in title and description"),
        ("category" = Option<String>, Query, description = "printing or repair")
    ),
    responses(
        (status = 200, description = "List services", body = ApiResponse<ServiceList>)
    ),
    tag = "Services"
)]
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ServiceQuery>,
) -> AppResult<Json<ApiResponse<ServiceList>>> {
    let resp = offering_service::list_services(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/services/{id}",
    params(
        ("id" = Uuid, Path, description = "Service ID")
    ),
    responses(
        (status = 200, description = "Get service", body = ApiResponse<Service>),
        (status = 404, description = "Service not found"),
    ),
    tag = "Services"
)]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Service>>> {
    let resp = offering_service::get_service(&state, id).await?;
    Ok(Json(resp))
}
