use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{FulfillOrderRequest, OrderList},
    dto::products::ProductList,
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
    },
    error::AppResult,
    inventory,
    middleware::auth::Session,
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{LowStockQuery, OrderListQuery, SortOrder},
    services::{order_from_entity, product_from_entity},
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    session: &Session,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    session.require_admin()?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);

    let order_list = OrderList { items: orders };

    Ok(ApiResponse::success("Orders", order_list, Some(meta)))
}

/// Record payment for a pending order and take its quantity out of stock.
pub async fn fulfill_order(
    state: &AppState,
    session: &Session,
    id: Uuid,
    payload: FulfillOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let user = session.require_admin()?;

    let (order, product) = inventory::fulfill_order(&state.orm, id, payload.price_paid).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderFulfill,
        serde_json::json!({
            "order_id": order.id,
            "product_id": product.id,
            "quantity": order.quantity,
            "price_paid": order.price_paid,
        }),
    )
    .await;
    state.revalidate.views([
        "/orders".to_string(),
        "/admin/orders".to_string(),
        "/admin/finance".to_string(),
        "/products".to_string(),
        format!("/products/{}", product.id),
    ]);

    Ok(ApiResponse::success(
        "Order fulfilled",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn delete_order(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user = session.require_admin()?;

    let order = inventory::delete_order(&state.orm, id).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderDelete,
        serde_json::json!({ "order_id": order.id }),
    )
    .await;
    state.revalidate.views(["/orders", "/admin/orders"]);

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_low_stock(
    state: &AppState,
    session: &Session,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    session.require_admin()?;
    let threshold = query.threshold.unwrap_or(5);
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Products::find().filter(ProdCol::StockRemaining.lte(threshold));
    finder = finder
        .order_by_asc(ProdCol::StockRemaining)
        .order_by_desc(ProdCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let data = ProductList { items };
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Low stock", data, Some(meta)))
}
