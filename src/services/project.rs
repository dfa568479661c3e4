//! Project service — rows and document load/save.
//!
//! DESIGN
//! ======
//! Projects are created and listed over REST. The canvas document is one
//! jsonb value per row; saving replaces it wholesale, so concurrent saves
//! resolve by whichever UPDATE lands last (document-granularity LWW).

use canvas::document::Document;
use sqlx::PgPool;
use uuid::Uuid;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl wire::ErrorCode for ProjectError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_PROJECT_NOT_FOUND",
            Self::Database(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Row returned from project listings.
#[derive(Debug, Clone)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
}

/// A project plus its persisted canvas document.
#[derive(Debug, Clone)]
pub struct ProjectDoc {
    pub id: Uuid,
    pub name: String,
    pub doc: serde_json::Value,
    /// Milliseconds since the Unix epoch of the last write.
    pub updated_at: i64,
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a new project with an empty document (root canvas only).
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_project(pool: &PgPool, name: &str) -> Result<ProjectRow, ProjectError> {
    let id = Uuid::new_v4();
    let doc = Document::new().to_value();
    sqlx::query("INSERT INTO projects (id, name, doc) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(&doc)
        .execute(pool)
        .await?;

    Ok(ProjectRow { id, name: name.to_owned() })
}

/// List all projects, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_projects(pool: &PgPool) -> Result<Vec<ProjectRow>, ProjectError> {
    let rows = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, name FROM projects ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id, name)| ProjectRow { id, name }).collect())
}

/// Fetch a project with its document.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids and a database error if the query fails.
pub async fn fetch_project(pool: &PgPool, project_id: Uuid) -> Result<ProjectDoc, ProjectError> {
    let row = sqlx::query_as::<_, (Uuid, String, serde_json::Value, i64)>(
        "SELECT id, name, doc, (EXTRACT(EPOCH FROM updated_at) * 1000)::BIGINT
         FROM projects WHERE id = $1",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or(ProjectError::NotFound(project_id))?;

    Ok(ProjectDoc { id: row.0, name: row.1, doc: row.2, updated_at: row.3 })
}

/// Replace a project's document wholesale. The later of two competing saves
/// is the one that persists.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids and a database error if the write fails.
pub async fn save_doc(pool: &PgPool, project_id: Uuid, doc: &serde_json::Value) -> Result<(), ProjectError> {
    let result = sqlx::query("UPDATE projects SET doc = $2, updated_at = now() WHERE id = $1")
        .bind(project_id)
        .bind(doc)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ProjectError::NotFound(project_id));
    }
    Ok(())
}
