//! Database and collection table bootstrap for the PostgreSQL store.

use crate::error::{AppError, ConfigError};
use crate::resource::ResourceAdapter;
use crate::store::sql::qualified_table;
use sqlx::ConnectOptions;
use sqlx::PgPool;
use std::str::FromStr;

/// A collection table and the top-level fields that must hold distinct values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: &'static str,
    pub unique: &'static [&'static str],
}

impl CollectionSpec {
    pub const fn of<R: ResourceAdapter>() -> Self {
        CollectionSpec {
            name: R::COLLECTION,
            unique: R::UNIQUE,
        }
    }
}

/// Create the schema if needed, then one `(seq, id, doc)` table per collection with a GIN index on `doc`
/// and a unique expression index per unique field.
pub async fn ensure_collections(pool: &PgPool, schema: &str, collections: &[CollectionSpec]) -> Result<(), AppError> {
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema)))
        .execute(pool)
        .await?;

    for spec in collections {
        let collection = spec.name;
        let table = qualified_table(schema, collection);
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                seq BIGSERIAL NOT NULL,
                id TEXT PRIMARY KEY,
                doc JSONB NOT NULL
            )
            "#,
            table
        );
        tracing::debug!(sql = %ddl, "ddl");
        sqlx::query(&ddl).execute(pool).await?;
        let index = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN (doc jsonb_path_ops)",
            quote_ident(&format!("{}_doc_idx", collection)),
            table
        );
        sqlx::query(&index).execute(pool).await?;
        for field in spec.unique {
            let ddl = unique_index_ddl(&table, collection, field);
            tracing::debug!(sql = %ddl, "ddl");
            sqlx::query(&ddl).execute(pool).await?;
        }
    }
    tracing::info!(schema = %schema, collections = collections.len(), "collections ready");
    Ok(())
}

fn unique_index_ddl(table: &str, collection: &str, field: &str) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc ->> '{}'))",
        quote_ident(&format!("{}_{}_key", collection, field)),
        table,
        field.replace('\'', "''")
    )
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|_| invalid_url(database_url))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn invalid_url(url: &str) -> AppError {
    AppError::Config(ConfigError::Invalid {
        var: "DATABASE_URL",
        value: url.to_string(),
    })
}

/// Split a connection URL into (URL of the `postgres` admin database, target database name).
fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let scheme_end = url.find("://").map(|i| i + 3).ok_or_else(|| invalid_url(url))?;
    let path_start = match url[scheme_end..].find('/') {
        Some(i) => scheme_end + i + 1,
        None => return Ok((format!("{}/postgres", url), String::new())),
    };
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((db, q)) => (db.trim(), Some(q)),
        None => (path_and_query.trim(), None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
