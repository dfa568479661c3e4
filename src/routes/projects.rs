//! Project REST routes: list/create plus canvas-document load/save.

#[cfg(test)]
#[path = "projects_test.rs"]
mod tests;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use canvas::document::Document;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::services::project::{self, ProjectError};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocResponse {
    pub id: Uuid,
    pub name: String,
    pub doc: serde_json::Value,
    pub updated_at: i64,
}

#[derive(Deserialize)]
pub struct CreateProjectBody {
    pub name: Option<String>,
}

/// `GET /api/projects` — list projects.
pub async fn list_projects_rest(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectResponse>>, StatusCode> {
    let rows = project::list_projects(&state.pool)
        .await
        .map_err(project_error_to_status)?;
    Ok(Json(
        rows.into_iter()
            .map(|row| ProjectResponse { id: row.id, name: row.name })
            .collect(),
    ))
}

/// `POST /api/projects` — create a project with an empty document.
pub async fn create_project_rest(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> Result<(StatusCode, Json<ProjectResponse>), StatusCode> {
    let name = match body.name.as_deref() {
        None => "Untitled Project",
        Some(name) if name.trim().is_empty() => return Err(StatusCode::BAD_REQUEST),
        Some(name) => name,
    };
    let row = project::create_project(&state.pool, name)
        .await
        .map_err(project_error_to_status)?;
    Ok((StatusCode::CREATED, Json(ProjectResponse { id: row.id, name: row.name })))
}

/// `GET /api/projects/:id` — load the persisted canvas document.
pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectDocResponse>, StatusCode> {
    let row = project::fetch_project(&state.pool, project_id)
        .await
        .map_err(project_error_to_status)?;
    Ok(Json(ProjectDocResponse { id: row.id, name: row.name, doc: row.doc, updated_at: row.updated_at }))
}

/// `PATCH /api/projects/:id` — replace the canvas document wholesale.
///
/// Of two competing saves the later write persists (document-granularity
/// last-write-wins). A live in-memory copy is refreshed to the saved state
/// and marked clean so the flush worker does not resurrect the losing write.
pub async fn save_project_rest(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(doc): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if !doc.is_object() {
        return Err(StatusCode::BAD_REQUEST);
    }

    project::save_doc(&state.pool, project_id, &doc)
        .await
        .map_err(project_error_to_status)?;

    let mut projects = state.projects.write().await;
    if let Some(live) = projects.get_mut(&project_id) {
        let (document, report) = Document::from_value(&doc);
        if !report.is_clean() {
            warn!(
                %project_id,
                dropped_elements = report.dropped_elements,
                dropped_canvases = report.dropped_canvases,
                orphaned_elements = report.orphaned_elements,
                "saved document carried malformed entries"
            );
        }
        live.doc = document;
        live.revision += 1;
        live.dirty = false;
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

pub(crate) fn project_error_to_status(err: ProjectError) -> StatusCode {
    match err {
        ProjectError::NotFound(_) => StatusCode::NOT_FOUND,
        ProjectError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
