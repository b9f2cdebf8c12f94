/// Case persistence operations
///
/// Cases own their notes and documents; deleting a case cascades to both.
/// All queries are parameterized. Timestamps are RFC 3339 strings.
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Status given to new cases when none is supplied
pub const DEFAULT_STATUS: &str = "Open";

/// Case record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Case {
    pub case_id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Note attached to a case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseNote {
    pub note_id: i64,
    pub case_id: i64,
    pub content: String,
    pub created_at: String,
}

/// Document reference attached to a case
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDocument {
    pub document_id: i64,
    pub case_id: i64,
    pub title: String,
    pub file_path: Option<String>,
    pub uploaded_at: String,
}

/// Partial update of a case; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl CaseUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }
}

/// Case repository for database operations
pub struct CaseRepository {
    pool: SqlitePool,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn case_from_row(r: &SqliteRow) -> Case {
    Case {
        case_id: r.get("case_id"),
        title: r.get("title"),
        description: r.get("description"),
        status: r.get("status"),
        created_at: r.get("created_at"),
        updated_at: r.get("updated_at"),
    }
}

impl CaseRepository {
    /// Create a new case repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new case
    pub async fn create_case(
        &self,
        title: &str,
        description: &str,
        status: Option<&str>,
    ) -> Result<Case> {
        let now = now();
        let status = status.unwrap_or(DEFAULT_STATUS);

        let result = sqlx::query(
            "INSERT INTO cases (title, description, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(title)
        .bind(description)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to create case")?;

        Ok(Case {
            case_id: result.last_insert_rowid(),
            title: title.to_string(),
            description: description.to_string(),
            status: status.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Get a case by ID
    pub async fn get_case(&self, case_id: i64) -> Result<Option<Case>> {
        let row = sqlx::query(
            "SELECT case_id, title, description, status, created_at, updated_at FROM cases WHERE case_id = ?",
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch case")?;

        Ok(row.as_ref().map(case_from_row))
    }

    /// List cases, optionally filtered by status
    pub async fn list_cases(&self, status: Option<&str>) -> Result<Vec<Case>> {
        let rows = match status {
            Some(status) => sqlx::query(
                "SELECT case_id, title, description, status, created_at, updated_at FROM cases WHERE status = ? ORDER BY case_id",
            )
            .bind(status)
            .fetch_all(&self.pool)
            .await,
            None => sqlx::query(
                "SELECT case_id, title, description, status, created_at, updated_at FROM cases ORDER BY case_id",
            )
            .fetch_all(&self.pool)
            .await,
        }
        .context("Failed to list cases")?;

        Ok(rows.iter().map(case_from_row).collect())
    }

    /// Apply a partial update.
    ///
    /// Returns false when the update is empty or no case matched.
    pub async fn update_case(&self, case_id: i64, update: &CaseUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let now = now();
        let result = sqlx::query(
            "UPDATE cases SET title = COALESCE(?, title), description = COALESCE(?, description), \
             status = COALESCE(?, status), updated_at = ? WHERE case_id = ?",
        )
        .bind(update.title.as_deref())
        .bind(update.description.as_deref())
        .bind(update.status.as_deref())
        .bind(&now)
        .bind(case_id)
        .execute(&self.pool)
        .await
        .context("Failed to update case")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a case together with its notes and documents
    pub async fn delete_case(&self, case_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cases WHERE case_id = ?")
            .bind(case_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete case")?;

        Ok(result.rows_affected() > 0)
    }

    /// Add a note. Returns `None` when the case does not exist.
    pub async fn add_note(&self, case_id: i64, content: &str) -> Result<Option<CaseNote>> {
        if self.get_case(case_id).await?.is_none() {
            return Ok(None);
        }

        let now = now();
        let result =
            sqlx::query("INSERT INTO case_notes (case_id, content, created_at) VALUES (?, ?, ?)")
                .bind(case_id)
                .bind(content)
                .bind(&now)
                .execute(&self.pool)
                .await
                .context("Failed to add note")?;

        Ok(Some(CaseNote {
            note_id: result.last_insert_rowid(),
            case_id,
            content: content.to_string(),
            created_at: now,
        }))
    }

    /// Notes for a case, oldest first
    pub async fn get_notes(&self, case_id: i64) -> Result<Vec<CaseNote>> {
        let rows = sqlx::query(
            "SELECT note_id, case_id, content, created_at FROM case_notes WHERE case_id = ? ORDER BY note_id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch notes")?;

        Ok(rows
            .iter()
            .map(|r| CaseNote {
                note_id: r.get("note_id"),
                case_id: r.get("case_id"),
                content: r.get("content"),
                created_at: r.get("created_at"),
            })
            .collect())
    }

    /// Attach a document reference. Returns `None` when the case does not exist.
    pub async fn add_document(
        &self,
        case_id: i64,
        title: &str,
        file_path: Option<&str>,
    ) -> Result<Option<CaseDocument>> {
        if self.get_case(case_id).await?.is_none() {
            return Ok(None);
        }

        let now = now();
        let result = sqlx::query(
            "INSERT INTO case_documents (case_id, title, file_path, uploaded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(case_id)
        .bind(title)
        .bind(file_path)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to add document")?;

        Ok(Some(CaseDocument {
            document_id: result.last_insert_rowid(),
            case_id,
            title: title.to_string(),
            file_path: file_path.map(str::to_string),
            uploaded_at: now,
        }))
    }

    /// Documents for a case, oldest first
    pub async fn get_documents(&self, case_id: i64) -> Result<Vec<CaseDocument>> {
        let rows = sqlx::query(
            "SELECT document_id, case_id, title, file_path, uploaded_at FROM case_documents WHERE case_id = ? ORDER BY document_id",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch documents")?;

        Ok(rows
            .iter()
            .map(|r| CaseDocument {
                document_id: r.get("document_id"),
                case_id: r.get("case_id"),
                title: r.get("title"),
                file_path: r.get("file_path"),
                uploaded_at: r.get("uploaded_at"),
            })
            .collect())
    }
}
