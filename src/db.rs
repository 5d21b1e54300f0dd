use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait,
};
use tokio::fs;

pub type DbPool = sqlx::PgPool;
pub type OrmConn = DatabaseConnection;

const MIGRATIONS_DIR: &str = "migrations";
const MIGRATION_LOCK_KEY: i64 = 0x5052_494e_5453;

/// Create a SeaORM connection. Statements are traced by sea-orm at debug level.
pub async fn create_orm_conn(database_url: &str) -> Result<OrmConn> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(20)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    let conn = Database::connect(options)
        .await
        .context("failed to connect to the database")?;
    Ok(conn)
}

/// The sqlx pool backing a SeaORM connection, used for raw aggregate queries.
pub fn pool_of(conn: &OrmConn) -> DbPool {
    conn.get_postgres_connection_pool().clone()
}

/// Apply `migrations/*.sql` in filename order, recording each file in
/// `schema_migrations` so reruns skip it. The whole run is one transaction held
/// under an advisory lock, so concurrent starters apply nothing twice.
pub async fn run_migrations(conn: &OrmConn) -> Result<()> {
    let backend = conn.get_database_backend();
    let txn = conn.begin().await?;
    txn.execute(Statement::from_string(
        backend,
        format!("SELECT pg_advisory_xact_lock({MIGRATION_LOCK_KEY})"),
    ))
    .await?;
    txn.execute(Statement::from_string(
        backend,
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
    ))
    .await?;

    for file in migration_files(Path::new(MIGRATIONS_DIR)).await? {
        let version = file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context("migration file name is not valid UTF-8")?
            .to_string();

        let applied = txn
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT 1 FROM schema_migrations WHERE version = $1",
                [version.clone().into()],
            ))
            .await?
            .is_some();
        if applied {
            tracing::debug!(%version, "migration already applied");
            continue;
        }

        let sql = fs::read_to_string(&file)
            .await
            .with_context(|| format!("failed to read {}", file.display()))?;
        for stmt in split_statements(&sql) {
            txn.execute(Statement::from_string(backend, stmt)).await?;
        }
        txn.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO schema_migrations (version) VALUES ($1)",
            [version.clone().into()],
        ))
        .await?;
        tracing::info!(%version, "migration applied");
    }

    txn.commit().await?;
    Ok(())
}

async fn migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to open {}", dir.display()))?;
    let mut files: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Postgres prepared statements hold one command each. Migration files must not
/// put `;` inside string literals or function bodies.
fn split_statements(sql: &str) -> Vec<String> {
    sql.split(';')
        .map(|stmt| {
            stmt.lines()
                .filter(|line| !line.trim_start().starts_with("--"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .map(|stmt| stmt.trim().to_string())
        .filter(|stmt| !stmt.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_skip_comments_and_blanks() {
        let sql = "-- users\nCREATE TABLE a (id INT);\n\n-- trailing comment only\n;\nCREATE INDEX i ON a (id);\n";
        assert_eq!(
            split_statements(sql),
            vec![
                "CREATE TABLE a (id INT)".to_string(),
                "CREATE INDEX i ON a (id)".to_string()
            ]
        );
    }
}
