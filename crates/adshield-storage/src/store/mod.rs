use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

pub mod brand;
pub mod company;
pub mod notification;
pub mod run;
pub mod user;

/// Unified access layer for the management database.
///
/// All methods are `async fn` over SeaORM. `db_url` is provided by the
/// server config; the SQLite form is `sqlite://data/adshield.db?mode=rwc`
/// and `sqlite::memory:` works for tests.
pub struct Store {
    pub(crate) db: DatabaseConnection,
}

impl Store {
    /// Connect and initialize the database: enables WAL for SQLite files and
    /// runs any pending migrations so the schema is always current.
    pub async fn new(db_url: &str) -> Result<Self> {
        let db = Database::connect(db_url).await?;

        if db_url.starts_with("sqlite://") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized store");
        Ok(Self { db })
    }

    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}
