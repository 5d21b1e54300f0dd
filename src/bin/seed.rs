use chrono::Utc;
use printshop_storefront::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{products, services, users},
    middleware::auth::{SessionUser, issue_token},
    models::{ProductCategory, Role, ServiceCategory},
};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin = ensure_user(&orm, "Shop Admin", "admin@example.com", Role::Admin).await?;
    let customer = ensure_user(&orm, "Test Customer", "customer@example.com", Role::Regular).await?;
    seed_products(&orm).await?;
    seed_services(&orm).await?;

    // Development tokens, signed the way the auth provider signs sessions.
    let ttl = chrono::Duration::days(7);
    println!("Admin token:    {}", issue_token(&config.jwt_secret, &admin, ttl)?);
    println!("Customer token: {}", issue_token(&config.jwt_secret, &customer, ttl)?);
    Ok(())
}

async fn ensure_user(
    orm: &OrmConn,
    name: &str,
    email: &str,
    role: Role,
) -> anyhow::Result<SessionUser> {
    let now = Utc::now();
    users::Entity::insert(users::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        role: Set(role),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    })
    .on_conflict(
        OnConflict::column(users::Column::Email)
            .update_columns([users::Column::Name, users::Column::Role])
            .to_owned(),
    )
    .exec(orm)
    .await?;

    // If the user already existed the insert kept its id, so read it back.
    let user = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {email} missing after upsert"))?;

    println!("Ensured user {email} (role={role:?})");
    Ok(SessionUser {
        user_id: user.id,
        role: user.role,
        name: user.name,
        email: user.email,
    })
}

async fn seed_products(orm: &OrmConn) -> anyhow::Result<()> {
    let catalog = [
        (
            "ThinkPad T480",
            "Refurbished, 16GB RAM, 256GB SSD",
            &["laptop", "lenovo"][..],
            Decimal::new(32000, 2),
            ProductCategory::PreOwned,
            4,
        ),
        (
            "USB-C Charger 65W",
            "Universal laptop charger",
            &["charger", "usb-c"][..],
            Decimal::new(2999, 2),
            ProductCategory::Accessory,
            25,
        ),
        (
            "HP 305 Ink Cartridge",
            "Black, original",
            &["ink", "hp"][..],
            Decimal::new(1450, 2),
            ProductCategory::Accessory,
            3,
        ),
    ];

    let now = Utc::now();
    for (title, description, tags, price, category, stock) in catalog {
        let row = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            tags: Set(tags.iter().map(|t| t.to_string()).collect()),
            price: Set(price),
            image: Set(None),
            category: Set(category),
            stock_remaining: Set(stock),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        products::Entity::insert(row)
            .on_conflict(
                OnConflict::column(products::Column::Title)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(orm)
            .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_services(orm: &OrmConn) -> anyhow::Result<()> {
    let catalog = [
        (
            "A4 Colour Printing",
            "Per page, 80gsm paper",
            ServiceCategory::Printing,
            Some(Decimal::new(50, 2)),
        ),
        (
            "Laptop Screen Replacement",
            "Parts quoted separately",
            ServiceCategory::Repair,
            None,
        ),
    ];

    let now = Utc::now();
    for (title, description, category, starting_price) in catalog {
        let row = services::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            tags: Set(Vec::new()),
            starting_price: Set(starting_price),
            image: Set(None),
            category: Set(category),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        services::Entity::insert(row)
            .on_conflict(
                OnConflict::column(services::Column::Title)
                    .do_nothing()
                    .to_owned(),
            )
            .do_nothing()
            .exec(orm)
            .await?;
    }

    println!("Seeded services");
    Ok(())
}
