use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest, normalize_tags},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::Session,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    services::{product_from_entity, unique_violation},
    state::AppState,
    storage::{self, UploadFile},
    validation::validate_payload,
};
use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
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

    if let Some(tag) = query.tag.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::cust_with_values("? = ANY(tags)", [tag.to_string()]));
    }

    match query.in_stock {
        Some(true) => condition = condition.add(Column::StockRemaining.gt(0)),
        Some(false) => condition = condition.add(Column::StockRemaining.eq(0)),
        None => {}
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Title => Column::Title,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(product_from_entity);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, Some(Meta::empty())))
}

pub async fn create_product(
    state: &AppState,
    session: &Session,
    payload: CreateProductRequest,
    image: Option<UploadFile>,
) -> AppResult<ApiResponse<Product>> {
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
        price: Set(payload.price),
        image: Set(image_url),
        category: Set(payload.category),
        stock_remaining: Set(payload.stock_remaining),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let product = match active.insert(&state.orm).await {
        Ok(product) => product,
        Err(err) => {
            release_image(state, staged).await;
            return Err(unique_violation(err, "A product with this title already exists"));
        }
    };

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductCreate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;
    state.revalidate.views(["/products", "/admin/products"]);

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        Some(Meta::empty()),
    ))
}

/// Partial update. Only the fields present in the payload are written, and the
/// row is locked so an edit does not race a concurrent sale of the same product.
pub async fn update_product(
    state: &AppState,
    session: &Session,
    id: Uuid,
    payload: UpdateProductRequest,
    image: Option<UploadFile>,
) -> AppResult<ApiResponse<Product>> {
    let user = session.require_admin()?;
    validate_payload(&payload)?;

    let staged = stage_image(state, image).await?;
    let image_url = staged.as_ref().map(|(url, _)| url.clone()).or(payload.image.clone());

    let result = apply_update(state, id, payload, image_url).await;
    let product = match result {
        Ok(product) => product,
        Err(err) => {
            release_image(state, staged).await;
            return Err(err);
        }
    };

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductUpdate,
        serde_json::json!({ "product_id": product.id }),
    )
    .await;
    state.revalidate.views([
        "/products".to_string(),
        format!("/products/{}", product.id),
        "/admin/products".to_string(),
    ]);

    Ok(ApiResponse::success("Updated", product, Some(Meta::empty())))
}

async fn apply_update(
    state: &AppState,
    id: Uuid,
    payload: UpdateProductRequest,
    image_url: Option<String>,
) -> AppResult<Product> {
    let txn = state.orm.begin().await?;
    let existing = Products::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

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
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(image) = image_url {
        active.image = Set(Some(image));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(stock) = payload.stock_remaining {
        active.stock_remaining = Set(stock);
    }
    active.updated_at = Set(Utc::now().into());

    let product = active
        .update(&txn)
        .await
        .map_err(|err| unique_violation(err, "A product with this title already exists"))?;
    txn.commit().await?;
    Ok(product_from_entity(product))
}

/// Hard delete; the product's orders and walk-ins go with it.
pub async fn delete_product(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user = session.require_admin()?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ProductDelete,
        serde_json::json!({ "product_id": id }),
    )
    .await;
    state.revalidate.views([
        "/products".to_string(),
        format!("/products/{id}"),
        "/admin/products".to_string(),
        "/admin/orders".to_string(),
        "/admin/walk-ins".to_string(),
    ]);

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Upload the image ahead of the database write. Returns `(url, key)`.
pub(crate) async fn stage_image(
    state: &AppState,
    image: Option<UploadFile>,
) -> AppResult<Option<(String, String)>> {
    match image {
        Some(file) => storage::upload_one(&*state.storage, file, state.max_upload_bytes)
            .await
            .map(Some),
        None => Ok(None),
    }
}

/// Undo `stage_image` after the database write failed.
pub(crate) async fn release_image(state: &AppState, staged: Option<(String, String)>) {
    if let Some((_, key)) = staged {
        storage::compensate(&*state.storage, &key).await;
    }
}
