//! Shop services (printing, repair). Same catalog shape as products, without stock.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::products::normalize_tags,
    dto::services::{CreateServiceRequest, ServiceList, UpdateServiceRequest},
    entity::services::{ActiveModel, Column, Entity as Services},
    error::{AppError, AppResult},
    middleware::auth::Session,
    models::Service,
    response::{ApiResponse, Meta},
    routes::params::ServiceQuery,
    services::{
        product_service::{release_image, stage_image},
        service_from_entity, unique_violation,
    },
    state::AppState,
    storage::UploadFile,
    validation::validate_payload,
};

const DUPLICATE_TITLE: &str = "A service with this title already exists";

pub async fn list_services(
    state: &AppState,
    query: ServiceQuery,
) -> AppResult<ApiResponse<ServiceList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(category) = query.category {
        condition = condition.add(Column::Category.eq(category));
    }

    let finder = Services::find()
        .filter(condition)
        .order_by_asc(Column::Title);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(service_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Services",
        ServiceList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_service(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Service>> {
    let service = Services::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(service_from_entity)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Service", service, Some(Meta::empty())))
}

pub async fn create_service(
    state: &AppState,
    session: &Session,
    payload: CreateServiceRequest,
    image: Option<UploadFile>,
) -> AppResult<ApiResponse<Service>> {
    let user = session.require_admin()?;
    validate_payload(&payload)?;

    let staged = stage_image(state, image).await?;
    let image_url = staged.as_ref().map(|(url, _)| url.clone()).or(payload.image);

    let now = Utc::now();
    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description.trim().to_string()),
        tags: Set(normalize_tags(payload.tags)),
        starting_price: Set(payload.starting_price),
        image: Set(image_url),
        category: Set(payload.category),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let service = match active.insert(&state.orm).await {
        Ok(service) => service,
        Err(err) => {
            release_image(state, staged).await;
            return Err(unique_violation(err, DUPLICATE_TITLE));
        }
    };

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ServiceCreate,
        serde_json::json!({ "service_id": service.id }),
    )
    .await;
    state.revalidate.views(["/services", "/admin/services"]);

    Ok(ApiResponse::success(
        "Service created",
        service_from_entity(service),
        Some(Meta::empty()),
    ))
}

pub async fn update_service(
    state: &AppState,
    session: &Session,
    id: Uuid,
    payload: UpdateServiceRequest,
    image: Option<UploadFile>,
) -> AppResult<ApiResponse<Service>> {
    let user = session.require_admin()?;
    validate_payload(&payload)?;

    let existing = Services::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let staged = stage_image(state, image).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description.trim().to_string());
    }
    if let Some(tags) = payload.tags {
        active.tags = Set(normalize_tags(tags));
    }
    if let Some(price) = payload.starting_price {
        active.starting_price = Set(Some(price));
    }
    if let Some(url) = staged.as_ref().map(|(url, _)| url.clone()).or(payload.image) {
        active.image = Set(Some(url));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    active.updated_at = Set(Utc::now().into());

    let service = match active.update(&state.orm).await {
        Ok(service) => service,
        Err(err) => {
            release_image(state, staged).await;
            return Err(unique_violation(err, DUPLICATE_TITLE));
        }
    };

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ServiceUpdate,
        serde_json::json!({ "service_id": service.id }),
    )
    .await;
    state.revalidate.views([
        "/services".to_string(),
        format!("/services/{}", service.id),
        "/admin/services".to_string(),
    ]);

    Ok(ApiResponse::success(
        "Updated",
        service_from_entity(service),
        Some(Meta::empty()),
    ))
}

pub async fn delete_service(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user = session.require_admin()?;
    let result = Services::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ServiceDelete,
        serde_json::json!({ "service_id": id }),
    )
    .await;
    state.revalidate.views([
        "/services".to_string(),
        format!("/services/{id}"),
        "/admin/services".to_string(),
        "/admin/walk-ins".to_string(),
    ]);

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
