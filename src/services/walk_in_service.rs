use sea_orm::{EntityTrait, PaginatorTrait, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::walk_ins::{CreateWalkInRequest, WalkInList},
    entity::walk_ins::{Column, Entity as WalkIns},
    error::AppResult,
    inventory,
    middleware::auth::Session,
    models::{WalkIn, WalkInTarget},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::walk_in_from_entity,
    state::AppState,
};

pub async fn list_walk_ins(
    state: &AppState,
    session: &Session,
    pagination: Pagination,
) -> AppResult<ApiResponse<WalkInList>> {
    session.require_admin()?;
    let (page, limit, offset) = pagination.normalize();

    let finder = WalkIns::find().order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(walk_in_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Walk-ins",
        WalkInList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_walk_in(
    state: &AppState,
    session: &Session,
    payload: CreateWalkInRequest,
) -> AppResult<ApiResponse<WalkIn>> {
    let user = session.require_admin()?;
    let input = payload.into_walk_in()?;
    let target = input.target;

    let walk_in = inventory::record_walk_in(&state.orm, input).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::WalkInCreate,
        serde_json::json!({ "walk_in_id": walk_in.id, "target": target, "quantity": walk_in.quantity }),
    )
    .await;
    state.revalidate.views(affected_views(target));

    Ok(ApiResponse::success(
        "Walk-in recorded",
        walk_in_from_entity(walk_in)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_walk_in(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<WalkIn>> {
    let user = session.require_admin()?;

    let walk_in = walk_in_from_entity(inventory::delete_walk_in(&state.orm, id).await?)?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::WalkInDelete,
        serde_json::json!({ "walk_in_id": walk_in.id, "target": walk_in.target }),
    )
    .await;
    state.revalidate.views(affected_views(walk_in.target));

    Ok(ApiResponse::success(
        "Walk-in deleted",
        walk_in,
        Some(Meta::empty()),
    ))
}

fn affected_views(target: WalkInTarget) -> Vec<String> {
    let mut views = vec!["/admin/walk-ins".to_string(), "/admin/finance".to_string()];
    if let WalkInTarget::Product(id) = target {
        views.push("/products".to_string());
        views.push(format!("/products/{id}"));
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_walk_ins_invalidate_catalog_views() {
        let id = Uuid::new_v4();
        let views = affected_views(WalkInTarget::Product(id));
        assert!(views.contains(&format!("/products/{id}")));

        let views = affected_views(WalkInTarget::Service(id));
        assert!(!views.iter().any(|v| v.starts_with("/products")));
    }
}
