//! Stock-changing composites. Each runs in one transaction and pairs every
//! stock mutation with the order or walk-in event that caused it:
//!
//! - fulfilling an order decrements its product by the order quantity, once;
//! - recording a product walk-in decrements at creation;
//! - deleting a product walk-in restores its quantity.
//!
//! Rows whose stock is read and then written are locked `FOR UPDATE`, so two
//! concurrent sales of the same product serialize instead of both reading the
//! pre-decrement value.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        services::Entity as Services,
        walk_ins::{ActiveModel as WalkInActive, Entity as WalkIns, Model as WalkInModel},
    },
    error::{AppError, AppResult},
    models::{OrderStatus, WalkInTarget},
    validation::NewWalkIn,
};

/// Mark a pending order fulfilled with the amount paid and take its quantity
/// out of stock. Rolls back both writes if either fails.
pub async fn fulfill_order(
    conn: &OrmConn,
    order_id: Uuid,
    price_paid: Decimal,
) -> AppResult<(OrderModel, ProductModel)> {
    if price_paid <= Decimal::ZERO {
        return Err(AppError::Validation(
            "price_paid: must be greater than 0".into(),
        ));
    }

    let txn = conn.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.status == OrderStatus::Fulfilled {
        return Err(AppError::BadRequest("Order is already fulfilled".into()));
    }

    let product = Products::find_by_id(order.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if product.stock_remaining < order.quantity {
        return Err(AppError::BadRequest(format!(
            "Insufficient stock: {} left, order needs {}",
            product.stock_remaining, order.quantity
        )));
    }

    let quantity = order.quantity;
    let now = Utc::now();

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Fulfilled);
    active.price_paid = Set(Some(price_paid));
    active.fulfilled_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    let order = active.update(&txn).await?;

    let new_stock = product.stock_remaining - quantity;
    let mut active: ProductActive = product.into();
    active.stock_remaining = Set(new_stock);
    active.updated_at = Set(now.into());
    let product = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        product_id = %product.id,
        quantity,
        stock_remaining = product.stock_remaining,
        "order fulfilled"
    );
    Ok((order, product))
}

/// Delete an order. Pending orders never touched stock, so nothing is restored.
/// Fulfilled orders are refused: removing one would leave its stock decrement
/// without the event that caused it.
pub async fn delete_order(conn: &OrmConn, order_id: Uuid) -> AppResult<OrderModel> {
    let txn = conn.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.status == OrderStatus::Fulfilled {
        return Err(AppError::BadRequest(
            "Fulfilled orders cannot be deleted".into(),
        ));
    }

    order.clone().delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, "pending order deleted");
    Ok(order)
}

/// Record an in-person sale. Product sales leave stock at creation time.
pub async fn record_walk_in(conn: &OrmConn, input: NewWalkIn) -> AppResult<WalkInModel> {
    let txn = conn.begin().await?;
    let now = Utc::now();

    match input.target {
        WalkInTarget::Product(product_id) => {
            let product = Products::find_by_id(product_id)
                .lock(LockType::Update)
                .one(&txn)
                .await?
                .ok_or(AppError::NotFound)?;

            if product.stock_remaining < input.quantity {
                return Err(AppError::BadRequest(format!(
                    "Insufficient stock: {} left, sale needs {}",
                    product.stock_remaining, input.quantity
                )));
            }

            let new_stock = product.stock_remaining - input.quantity;
            let mut active: ProductActive = product.into();
            active.stock_remaining = Set(new_stock);
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }
        WalkInTarget::Service(service_id) => {
            if Services::find_by_id(service_id).one(&txn).await?.is_none() {
                return Err(AppError::NotFound);
            }
        }
    }

    let walk_in = WalkInActive {
        id: Set(Uuid::new_v4()),
        customer_name: Set(input.customer_name),
        quantity: Set(input.quantity),
        price_paid: Set(input.price_paid),
        product_id: Set(input.target.product_id()),
        service_id: Set(input.target.service_id()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        walk_in_id = %walk_in.id,
        target = ?input.target,
        quantity = walk_in.quantity,
        "walk-in recorded"
    );
    Ok(walk_in)
}

/// Delete a walk-in, putting a product sale's quantity back into stock.
/// A missing walk-in changes nothing.
pub async fn delete_walk_in(conn: &OrmConn, walk_in_id: Uuid) -> AppResult<WalkInModel> {
    let txn = conn.begin().await?;

    let walk_in = WalkIns::find_by_id(walk_in_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(product_id) = walk_in.product_id {
        let result = Products::update_many()
            .col_expr(
                ProdCol::StockRemaining,
                Expr::col(ProdCol::StockRemaining).add(walk_in.quantity),
            )
            .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(ProdCol::Id.eq(product_id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
    }

    walk_in.clone().delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        walk_in_id = %walk_in.id,
        restored = walk_in.product_id.map(|_| walk_in.quantity).unwrap_or(0),
        "walk-in deleted"
    );
    Ok(walk_in)
}
