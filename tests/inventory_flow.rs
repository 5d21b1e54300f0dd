use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use printshop_storefront::{
    db::{create_orm_conn, run_migrations},
    dto::{
        orders::{CreateOrderRequest, FulfillOrderRequest},
        products::CreateProductRequest,
        walk_ins::CreateWalkInRequest,
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{Column as OrderCol, Entity as Orders},
        products::{ActiveModel as ProductActive, Entity as Products},
        services::ActiveModel as ServiceActive,
        users::Entity as Users,
        walk_ins::{Column as WalkInCol, Entity as WalkIns},
    },
    error::{AppError, AppResult, NOT_AUTHORIZED},
    middleware::auth::{Session, SessionUser},
    models::{OrderStatus, ProductCategory, Role, ServiceCategory, WalkInTarget},
    response::{ApiResponse, Meta},
    services::{
        admin_service, offering_service, order_service, product_service, walk_in_service,
    },
    state::AppState,
    storage::{ObjectStore, UploadFile, UploadOutcome},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

const SECRET: &str = "integration-test-secret";

/// In-memory object store that records what is currently stored.
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, files: Vec<UploadFile>) -> AppResult<Vec<UploadOutcome>> {
        let mut objects = self.objects.lock().unwrap();
        Ok(files
            .into_iter()
            .map(|file| {
                let key = format!("{}-{}", Uuid::new_v4(), file.file_name);
                objects.insert(key.clone(), file.bytes.len());
                UploadOutcome::Stored {
                    url: format!("https://files.test/{key}"),
                    key,
                }
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// Allow skipping when no DB is configured in the environment.
async fn setup() -> anyhow::Result<Option<(AppState, Arc<MemoryStore>)>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    let store = Arc::new(MemoryStore::default());
    let state = AppState::with_store(orm, SECRET, store.clone());
    Ok(Some((state, store)))
}

fn session(role: Role) -> Session {
    let user_id = Uuid::new_v4();
    Session::signed_in(SessionUser {
        user_id,
        role,
        name: format!("{role:?} {user_id}"),
        email: format!("{user_id}@example.test"),
    })
}

async fn product_with_stock(state: &AppState, stock: i32) -> anyhow::Result<Uuid> {
    let now = Utc::now();
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        title: Set(format!("Test Widget {}", Uuid::new_v4())),
        description: Set("A product for testing".into()),
        tags: Set(vec!["test".into()]),
        price: Set(Decimal::new(1000, 2)),
        image: Set(None),
        category: Set(ProductCategory::Accessory),
        stock_remaining: Set(stock),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

async fn stock_of(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {id} vanished"))?;
    Ok(product.stock_remaining)
}

async fn order_for(
    state: &AppState,
    customer: &Session,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let order = order_service::place_order(
        state,
        customer,
        CreateOrderRequest {
            product_id,
            quantity,
            delivery_location: "Stall 9, Upper Hill".into(),
            phone_number: "0712345678".into(),
        },
    )
    .await?
    .data
    .ok_or_else(|| anyhow::anyhow!("order missing from envelope"))?;
    Ok(order.id)
}

fn paid(cents: i64) -> FulfillOrderRequest {
    FulfillOrderRequest {
        price_paid: Decimal::new(cents, 2),
    }
}

fn product_walk_in(product_id: Uuid, quantity: i32) -> CreateWalkInRequest {
    CreateWalkInRequest {
        customer_name: None,
        quantity,
        price_paid: Some(Decimal::new(500, 2)),
        product_id: Some(product_id),
        service_id: None,
    }
}

async fn service_row(state: &AppState) -> anyhow::Result<Uuid> {
    let now = Utc::now();
    let service = ServiceActive {
        id: Set(Uuid::new_v4()),
        title: Set(format!("Binding {}", Uuid::new_v4())),
        description: Set("Spiral binding".into()),
        tags: Set(Vec::new()),
        starting_price: Set(None),
        image: Set(None),
        category: Set(ServiceCategory::Printing),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(service.id)
}

#[tokio::test]
async fn stock_moves_only_on_fulfillment() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let customer = session(Role::Regular);
    let admin = session(Role::Admin);
    let product_id = product_with_stock(&state, 10).await?;

    let placed = order_service::place_order(
        &state,
        &customer,
        CreateOrderRequest {
            product_id,
            quantity: 3,
            delivery_location: "12 Market Street".into(),
            phone_number: "+254 700 123456".into(),
        },
    )
    .await?;
    let order = placed.data.expect("order");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.price_paid, None);
    assert_eq!(stock_of(&state, product_id).await?, 10);

    let fulfilled = admin_service::fulfill_order(
        &state,
        &admin,
        order.id,
        FulfillOrderRequest {
            price_paid: Decimal::new(3000, 2),
        },
    )
    .await?;
    let fulfilled = fulfilled.data.expect("fulfilled order");
    assert_eq!(fulfilled.status, OrderStatus::Fulfilled);
    assert_eq!(fulfilled.price_paid, Some(Decimal::new(3000, 2)));
    assert!(fulfilled.fulfilled_at.is_some());
    assert_eq!(stock_of(&state, product_id).await?, 7);

    // a second fulfillment must not take stock again
    let again = admin_service::fulfill_order(
        &state,
        &admin,
        order.id,
        FulfillOrderRequest {
            price_paid: Decimal::new(3000, 2),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&state, product_id).await?, 7);

    let deleted = admin_service::delete_order(&state, &admin, order.id).await;
    assert!(matches!(deleted, Err(AppError::BadRequest(_))));

    let fulfil_entries = AuditLogs::find()
        .filter(AuditCol::Action.eq("order_fulfill"))
        .filter(AuditCol::UserId.eq(admin.user().map(|u| u.user_id)))
        .all(&state.orm)
        .await?;
    assert_eq!(fulfil_entries.len(), 1);
    assert_eq!(fulfil_entries[0].resource.as_deref(), Some("orders"));

    Ok(())
}

#[tokio::test]
async fn customers_cannot_fulfill_or_see_other_orders() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let owner = session(Role::Regular);
    let stranger = session(Role::Regular);
    let product_id = product_with_stock(&state, 2).await?;

    let order = order_service::place_order(
        &state,
        &owner,
        CreateOrderRequest {
            product_id,
            quantity: 1,
            delivery_location: "Kiosk 4, Bus Station".into(),
            phone_number: "0712345678".into(),
        },
    )
    .await?
    .data
    .expect("order");

    let resp = ApiResponse::from_result(
        admin_service::fulfill_order(
            &state,
            &owner,
            order.id,
            FulfillOrderRequest {
                price_paid: Decimal::ONE,
            },
        )
        .await,
    );
    assert!(!resp.success);
    assert_eq!(resp.message, NOT_AUTHORIZED);

    let peek = order_service::get_order(&state, &stranger, order.id).await;
    assert!(matches!(peek, Err(AppError::Unauthorized)));
    let own = order_service::get_order(&state, &owner, order.id).await?;
    assert_eq!(own.data.expect("detail").order.id, order.id);

    // more than is in stock is rejected up front
    let too_many = order_service::place_order(
        &state,
        &owner,
        CreateOrderRequest {
            product_id,
            quantity: 3,
            delivery_location: "Kiosk 4, Bus Station".into(),
            phone_number: "0712345678".into(),
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn walk_in_round_trip_restores_stock() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let admin = session(Role::Admin);
    let product_id = product_with_stock(&state, 5).await?;

    let walk_in = walk_in_service::create_walk_in(
        &state,
        &admin,
        CreateWalkInRequest {
            customer_name: Some("  Jo  ".into()),
            quantity: 2,
            price_paid: Some(Decimal::new(2000, 2)),
            product_id: Some(product_id),
            service_id: None,
        },
    )
    .await?
    .data
    .expect("walk-in");
    assert_eq!(walk_in.target, WalkInTarget::Product(product_id));
    assert_eq!(walk_in.customer_name.as_deref(), Some("Jo"));
    assert_eq!(stock_of(&state, product_id).await?, 3);

    let oversell = walk_in_service::create_walk_in(
        &state,
        &admin,
        CreateWalkInRequest {
            customer_name: None,
            quantity: 4,
            price_paid: None,
            product_id: Some(product_id),
            service_id: None,
        },
    )
    .await;
    assert!(matches!(oversell, Err(AppError::BadRequest(_))));
    assert_eq!(stock_of(&state, product_id).await?, 3);

    walk_in_service::delete_walk_in(&state, &admin, walk_in.id).await?;
    assert_eq!(stock_of(&state, product_id).await?, 5);

    let missing = walk_in_service::delete_walk_in(&state, &admin, walk_in.id).await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    assert_eq!(stock_of(&state, product_id).await?, 5);

    Ok(())
}

#[tokio::test]
async fn service_walk_ins_leave_stock_alone() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let admin = session(Role::Admin);
    let product_id = product_with_stock(&state, 4).await?;
    let service_id = service_row(&state).await?;

    let walk_in = walk_in_service::create_walk_in(
        &state,
        &admin,
        CreateWalkInRequest {
            customer_name: None,
            quantity: 1,
            price_paid: None,
            product_id: None,
            service_id: Some(service_id),
        },
    )
    .await?
    .data
    .expect("walk-in");
    assert_eq!(walk_in.price_paid, Decimal::ZERO);

    walk_in_service::delete_walk_in(&state, &admin, walk_in.id).await?;
    assert_eq!(stock_of(&state, product_id).await?, 4);

    let both = walk_in_service::create_walk_in(
        &state,
        &admin,
        CreateWalkInRequest {
            customer_name: None,
            quantity: 1,
            price_paid: None,
            product_id: Some(product_id),
            service_id: Some(service_id),
        },
    )
    .await;
    assert!(matches!(both, Err(AppError::Validation(_))));

    Ok(())
}

#[tokio::test]
async fn non_admin_delete_leaves_product_in_place() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let product_id = product_with_stock(&state, 1).await?;

    for caller in [Session::anonymous(), session(Role::Regular)] {
        let resp = ApiResponse::from_result(
            product_service::delete_product(&state, &caller, product_id).await,
        );
        assert!(!resp.success);
        assert!(resp.message.starts_with("Not authorized"));
    }
    assert!(Products::find_by_id(product_id).one(&state.orm).await?.is_some());

    product_service::delete_product(&state, &session(Role::Admin), product_id).await?;
    assert!(Products::find_by_id(product_id).one(&state.orm).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn failed_create_removes_uploaded_image() -> anyhow::Result<()> {
    let Some((state, store)) = setup().await? else {
        return Ok(());
    };
    let admin = session(Role::Admin);
    let title = format!("Refurbished Dell {}", Uuid::new_v4());
    let request = || CreateProductRequest {
        title: title.clone(),
        description: "Latitude 5490".into(),
        tags: vec!["laptop".into()],
        price: Decimal::new(25000, 2),
        image: None,
        category: ProductCategory::PreOwned,
        stock_remaining: 1,
    };
    let image = || UploadFile {
        file_name: "dell.png".into(),
        content_type: Some("image/png".into()),
        bytes: vec![1, 2, 3],
    };

    let created = product_service::create_product(&state, &admin, request(), Some(image()))
        .await?
        .data
        .expect("product");
    assert!(created.image.is_some());
    assert_eq!(store.len(), 1);

    let duplicate = product_service::create_product(&state, &admin, request(), Some(image())).await;
    assert!(matches!(duplicate, Err(AppError::BadRequest(_))));
    assert_eq!(store.len(), 1);

    Ok(())
}

#[tokio::test]
async fn deleting_pending_order_keeps_stock() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let customer = session(Role::Regular);
    let admin = session(Role::Admin);
    let product_id = product_with_stock(&state, 6).await?;
    let order_id = order_for(&state, &customer, product_id, 4).await?;

    let resp = admin_service::delete_order(&state, &admin, order_id).await?;
    assert!(resp.success);
    assert!(Orders::find_by_id(order_id).one(&state.orm).await?.is_none());
    assert_eq!(stock_of(&state, product_id).await?, 6);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_fulfillments_cannot_oversell() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let customer = session(Role::Regular);
    let admin = session(Role::Admin);
    let product_id = product_with_stock(&state, 3).await?;
    let first = order_for(&state, &customer, product_id, 2).await?;
    let second = order_for(&state, &customer, product_id, 2).await?;

    let (a, b) = tokio::join!(
        admin_service::fulfill_order(&state, &admin, first, paid(2000)),
        admin_service::fulfill_order(&state, &admin, second, paid(2000)),
    );
    let succeeded = [a.is_ok(), b.is_ok()].into_iter().filter(|ok| *ok).count();
    assert_eq!(succeeded, 1);
    for result in [a, b] {
        if let Err(err) = result {
            assert!(matches!(err, AppError::BadRequest(_)), "unexpected {err:?}");
        }
    }
    assert_eq!(stock_of(&state, product_id).await?, 1);

    let statuses: Vec<OrderStatus> = Orders::find()
        .filter(OrderCol::ProductId.eq(product_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|order| order.status)
        .collect();
    assert_eq!(
        statuses.iter().filter(|s| **s == OrderStatus::Fulfilled).count(),
        1
    );

    Ok(())
}

#[tokio::test]
async fn rejected_fulfillment_changes_nothing() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let customer = session(Role::Regular);
    let admin = session(Role::Admin);
    let product_id = product_with_stock(&state, 3).await?;
    let order_id = order_for(&state, &customer, product_id, 3).await?;

    for price in [0, -100] {
        let resp = admin_service::fulfill_order(&state, &admin, order_id, paid(price)).await;
        assert!(matches!(resp, Err(AppError::Validation(_))));
    }

    // stock drops below the order's quantity after it was placed
    walk_in_service::create_walk_in(&state, &admin, product_walk_in(product_id, 2)).await?;
    assert_eq!(stock_of(&state, product_id).await?, 1);

    let short = admin_service::fulfill_order(&state, &admin, order_id, paid(3000)).await;
    match short {
        Err(AppError::BadRequest(message)) => assert!(message.starts_with("Insufficient stock")),
        other => panic!("expected insufficient stock, got {other:?}"),
    }

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .expect("order still present");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.price_paid, None);
    assert!(order.fulfilled_at.is_none());
    assert_eq!(stock_of(&state, product_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn stock_matches_fulfilled_and_active_walk_ins() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let customer = session(Role::Regular);
    let admin = session(Role::Admin);
    let initial = 20;
    let product_id = product_with_stock(&state, initial).await?;

    let fulfilled_a = order_for(&state, &customer, product_id, 3).await?;
    let fulfilled_b = order_for(&state, &customer, product_id, 2).await?;
    let pending = order_for(&state, &customer, product_id, 4).await?;
    let dropped = order_for(&state, &customer, product_id, 1).await?;

    admin_service::fulfill_order(&state, &admin, fulfilled_a, paid(3000)).await?;
    let kept = walk_in_service::create_walk_in(&state, &admin, product_walk_in(product_id, 4))
        .await?
        .data
        .expect("walk-in");
    let removed = walk_in_service::create_walk_in(&state, &admin, product_walk_in(product_id, 5))
        .await?
        .data
        .expect("walk-in");
    admin_service::fulfill_order(&state, &admin, fulfilled_b, paid(2000)).await?;
    walk_in_service::delete_walk_in(&state, &admin, removed.id).await?;
    admin_service::delete_order(&state, &admin, dropped).await?;

    let fulfilled_qty = 3 + 2;
    let active_walk_in_qty = kept.quantity;
    assert_eq!(
        stock_of(&state, product_id).await?,
        initial - fulfilled_qty - active_walk_in_qty
    );

    let pending = Orders::find_by_id(pending)
        .one(&state.orm)
        .await?
        .expect("pending order");
    assert_eq!(pending.status, OrderStatus::Pending);

    Ok(())
}

#[tokio::test]
async fn walk_in_for_missing_target_is_not_found() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let admin = session(Role::Admin);
    let ghost = Uuid::new_v4();

    let missing_product =
        walk_in_service::create_walk_in(&state, &admin, product_walk_in(ghost, 1)).await;
    assert!(matches!(missing_product, Err(AppError::NotFound)));

    let missing_service = walk_in_service::create_walk_in(
        &state,
        &admin,
        CreateWalkInRequest {
            customer_name: None,
            quantity: 1,
            price_paid: None,
            product_id: None,
            service_id: Some(ghost),
        },
    )
    .await;
    assert!(matches!(missing_service, Err(AppError::NotFound)));

    let rows = WalkIns::find()
        .filter(
            WalkInCol::ProductId
                .eq(ghost)
                .or(WalkInCol::ServiceId.eq(ghost)),
        )
        .count(&state.orm)
        .await?;
    assert_eq!(rows, 0);

    Ok(())
}

#[tokio::test]
async fn shared_email_does_not_block_orders() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let product_id = product_with_stock(&state, 5).await?;
    let email = format!("shared-{}@example.test", Uuid::new_v4());
    let user = |user_id: Uuid| {
        Session::signed_in(SessionUser {
            user_id,
            role: Role::Regular,
            name: "Shared Inbox".into(),
            email: email.clone(),
        })
    };
    let first_id = Uuid::new_v4();
    let second_id = Uuid::new_v4();

    order_for(&state, &user(first_id), product_id, 1).await?;
    order_for(&state, &user(second_id), product_id, 1).await?;

    let first = Users::find_by_id(first_id)
        .one(&state.orm)
        .await?
        .expect("first user");
    let second = Users::find_by_id(second_id)
        .one(&state.orm)
        .await?
        .expect("second user");
    assert_eq!(first.email, email);
    assert_eq!(second.email, format!("{second_id}@users.invalid"));

    // the same session again still places orders
    order_for(&state, &user(second_id), product_id, 1).await?;

    Ok(())
}

#[tokio::test]
async fn single_catalog_items_carry_empty_meta() -> anyhow::Result<()> {
    let Some((state, _store)) = setup().await? else {
        return Ok(());
    };
    let product_id = product_with_stock(&state, 1).await?;
    let service_id = service_row(&state).await?;

    let product = product_service::get_product(&state, product_id).await?;
    assert!(product.success);
    assert_eq!(product.meta, Some(Meta::empty()));

    let service = offering_service::get_service(&state, service_id).await?;
    assert!(service.success);
    assert_eq!(service.meta, Some(Meta::empty()));

    Ok(())
}
