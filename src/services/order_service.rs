use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbErr, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::orders::{CreateOrderRequest, OrderDetail, OrderList},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::Entity as Products,
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{Session, SessionUser},
    models::{Order, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{order_from_entity, product_from_entity, user_from_entity},
    state::AppState,
    validation::OrderIntentRules,
};

/// Place an order-intent. The order starts Pending and unpaid; stock is only
/// taken when an admin fulfills it.
pub async fn place_order(
    state: &AppState,
    session: &Session,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let user = session.require_user()?;

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    OrderIntentRules::for_stock(product.stock_remaining).check(&payload)?;

    sync_customer(state, user).await?;

    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.user_id),
        product_id: Set(product.id),
        quantity: Set(payload.quantity),
        price_paid: Set(None),
        status: Set(OrderStatus::Pending),
        delivery_location: Set(payload.delivery_location.trim().to_string()),
        phone_number: Set(payload.phone_number.trim().to_string()),
        fulfilled_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(order_id = %order.id, product_id = %product.id, quantity = order.quantity, "order placed");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderPlace,
        serde_json::json!({ "order_id": order.id, "product_id": product.id }),
    )
    .await;
    state.revalidate.views(["/orders", "/admin/orders"]);

    Ok(ApiResponse::success(
        "Order placed",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

/// The signed-in customer's own order history.
pub async fn list_my_orders(
    state: &AppState,
    session: &Session,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let user = session.require_user()?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::CustomerId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
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
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Visible to the customer who placed the order and to admins.
pub async fn get_order(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    session.require_user()?;

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    session.require_owner_or_admin(order.customer_id)?;

    let product = Products::find_by_id(order.product_id)
        .one(&state.orm)
        .await?
        .map(product_from_entity);
    let customer = Users::find_by_id(order.customer_id)
        .one(&state.orm)
        .await?
        .map(user_from_entity);

    Ok(ApiResponse::success(
        "OK",
        OrderDetail {
            order: order_from_entity(order),
            product,
            customer,
        },
        Some(Meta::empty()),
    ))
}

/// Mirror the auth provider's user into `users` so orders can reference it.
/// An email already held by another id falls back to the placeholder address.
async fn sync_customer(state: &AppState, user: &SessionUser) -> AppResult<()> {
    let placeholder = placeholder_email(user.user_id);
    if user.email.is_empty() {
        upsert_user(state, user, placeholder).await?;
        return Ok(());
    }
    match upsert_user(state, user, user.email.clone()).await {
        Ok(()) => Ok(()),
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            tracing::warn!(
                user_id = %user.user_id,
                "email already mirrored under another user; using placeholder"
            );
            upsert_user(state, user, placeholder).await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn placeholder_email(user_id: Uuid) -> String {
    format!("{user_id}@users.invalid")
}

async fn upsert_user(state: &AppState, user: &SessionUser, email: String) -> Result<(), DbErr> {
    let now = Utc::now();
    let row = users::ActiveModel {
        id: Set(user.user_id),
        name: Set(user.name.clone()),
        email: Set(email),
        role: Set(user.role),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    Users::insert(row)
        .on_conflict(
            OnConflict::column(users::Column::Id)
                .update_columns([
                    users::Column::Name,
                    users::Column::Email,
                    users::Column::Role,
                    users::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(&state.orm)
        .await?;
    Ok(())
}
