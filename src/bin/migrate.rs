use printshop_storefront::db::{create_orm_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    // Only the database is needed here, not the full service configuration.
    let database_url = std::env::var("DATABASE_URL")?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    println!("Migrations applied");
    Ok(())
}
