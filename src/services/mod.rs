pub mod admin_service;
pub mod finance_service;
pub mod offering_service;
pub mod order_service;
pub mod product_service;
pub mod upload_service;
pub mod walk_in_service;

use chrono::Utc;
use sea_orm::{DbErr, SqlErr};

use crate::{
    entity::{orders, products, services, users, walk_ins},
    error::{AppError, AppResult},
    models::{Order, Product, Service, User, WalkIn, WalkInTarget},
};

pub(crate) fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        title: model.title,
        description: model.description,
        tags: model.tags,
        price: model.price,
        image: model.image,
        category: model.category,
        stock_remaining: model.stock_remaining,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn service_from_entity(model: services::Model) -> Service {
    Service {
        id: model.id,
        title: model.title,
        description: model.description,
        tags: model.tags,
        starting_price: model.starting_price,
        image: model.image,
        category: model.category,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn order_from_entity(model: orders::Model) -> Order {
    Order {
        id: model.id,
        customer_id: model.customer_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price_paid: model.price_paid,
        status: model.status,
        delivery_location: model.delivery_location,
        phone_number: model.phone_number,
        fulfilled_at: model.fulfilled_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub(crate) fn walk_in_from_entity(model: walk_ins::Model) -> AppResult<WalkIn> {
    let target = WalkInTarget::from_columns(model.product_id, model.service_id).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("walk-in {} has no single target", model.id))
    })?;
    Ok(WalkIn {
        id: model.id,
        customer_name: model.customer_name,
        quantity: model.quantity,
        price_paid: model.price_paid,
        target,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn user_from_entity(model: users::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

/// Turn a unique-key violation into a caller-facing message.
pub(crate) fn unique_violation(err: DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::BadRequest(message.to_string()),
        _ => AppError::OrmError(err),
    }
}
