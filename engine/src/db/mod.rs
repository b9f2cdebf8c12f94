//! SQLite persistence for the legal case store
//!
//! One pooled connection set per database file, WAL journaling and enforced
//! foreign keys so deleting a case removes its notes and documents.
//! Migrations are embedded at compile time and recorded in
//! `schema_migrations`, so each runs once per file.

use anyhow::{Context, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::ConnectOptions;
use std::path::Path;
use tracing::{debug, info};

pub mod cases;

pub use cases::{Case, CaseDocument, CaseNote, CaseRepository, CaseUpdate};

/// Embedded migrations in apply order: (version, name, sql)
const MIGRATIONS: &[(i64, &str, &str)] = &[(
    1,
    "001_cases.sql",
    include_str!("../../migrations/001_cases.sql"),
)];

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the case database and bring its schema up to date.
    ///
    /// An unclean shutdown needs no recovery step; SQLite replays a leftover
    /// WAL on open.
    pub async fn new(db_path: &Path) -> Result<Self> {
        info!("Opening case database at {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        let applied = db.run_migrations().await?;
        if applied > 0 {
            info!("Applied {} migration(s)", applied);
        }

        Ok(db)
    }

    /// Apply every embedded migration newer than the recorded schema version
    async fn run_migrations(&self) -> Result<usize> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (\
             version INTEGER PRIMARY KEY, name TEXT NOT NULL, applied_at TEXT NOT NULL)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create schema_migrations")?;

        let current = self.schema_version().await?;
        let mut applied = 0;

        for &(version, name, sql) in MIGRATIONS.iter().filter(|m| m.0 > current) {
            debug!("Applying migration {}", name);
            let mut tx = self.pool.begin().await?;

            sqlx::raw_sql(sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to execute migration {}", name))?;
            sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
                .bind(version)
                .bind(name)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&mut *tx)
                .await?;

            tx.commit()
                .await
                .with_context(|| format!("Failed to commit migration {}", name))?;
            applied += 1;
        }

        Ok(applied)
    }

    /// Highest applied migration version, 0 for a fresh file
    pub async fn schema_version(&self) -> Result<i64> {
        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .context("Failed to read schema version")?;
        Ok(version.unwrap_or(0))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checkpoint the WAL into the main database file
    pub async fn flush_wal(&self) -> Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .context("Failed to flush WAL")?;
        Ok(())
    }

    /// Checkpoint and close every pooled connection
    pub async fn close(self) -> Result<()> {
        self.flush_wal().await?;
        self.pool.close().await;
        debug!("Case database closed");
        Ok(())
    }

    pub fn cases(&self) -> CaseRepository {
        CaseRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> Database {
        Database::new(&dir.path().join("nested").join("cases.db"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_schema_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let db = open(&temp_dir).await;

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();

        for table in ["cases", "case_notes", "case_documents", "schema_migrations"] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
        assert_eq!(db.schema_version().await.unwrap(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_run_once() {
        let temp_dir = TempDir::new().unwrap();
        open(&temp_dir).await.close().await.unwrap();

        let db = open(&temp_dir).await;
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, MIGRATIONS.len() as i64);
    }

    #[tokio::test]
    async fn test_pragmas() {
        let temp_dir = TempDir::new().unwrap();
        let db = open(&temp_dir).await;

        let journal_mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");

        let foreign_keys: i32 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
