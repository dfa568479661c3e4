//! Session service — join/part, presence roster, and broadcast.
//!
//! DESIGN
//! ======
//! A project is hydrated from Postgres when its first client joins and kept
//! in memory while any client is connected. Presence (who is here, with what
//! color) is connection-scoped and never persisted.
//!
//! ERROR HANDLING
//! ==============
//! On last-client part, a dirty document is flushed before eviction. If that
//! flush fails the project is intentionally kept in memory with the dirty
//! flag intact so the persistence worker can retry instead of losing edits.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use canvas::document::Document;
use rand::Rng;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;
use wire::Frame;

use crate::services::project::{self, ProjectError};
use crate::state::{AppState, ConnectedUser, ProjectState};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("project not found: {0}")]
    NotFound(Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl wire::ErrorCode for SessionError {
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

impl From<ProjectError> for SessionError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound(id) => Self::NotFound(id),
            ProjectError::Database(e) => Self::Database(e),
        }
    }
}

/// What a joining client gets back: the document plus who is already here.
pub struct JoinSnapshot {
    pub elements: serde_json::Value,
    pub canvas_stack: serde_json::Value,
    pub roster: Vec<ConnectedUser>,
    /// Presence color assigned to the joining connection.
    pub color: String,
}

/// Presence colors handed out round-robin-by-chance at join time.
const PRESENCE_COLORS: [&str; 8] = [
    "#E05252", "#E09952", "#D4B944", "#6BBF59", "#52A7E0", "#7A6FE0", "#C45CC9", "#E0528F",
];

fn pick_color() -> String {
    let index = rand::rng().random_range(0..PRESENCE_COLORS.len());
    PRESENCE_COLORS[index].to_owned()
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Join a project. Hydrates the document from Postgres if this is the first
/// live client, registers the connection in the roster, and returns the full
/// document plus the roster as it was before this join.
///
/// # Errors
///
/// Returns `NotFound` for unknown projects and a database error if hydration
/// fails.
pub async fn join_project(
    state: &AppState,
    project_id: Uuid,
    client_id: Uuid,
    user_id: Uuid,
    user_name: &str,
    tx: mpsc::Sender<Frame>,
) -> Result<JoinSnapshot, SessionError> {
    // Fast path: already live, no database round trip.
    let hydrated = {
        let projects = state.projects.read().await;
        projects.contains_key(&project_id)
    };

    let loaded = if hydrated {
        None
    } else {
        let row = project::fetch_project(&state.pool, project_id).await?;
        let (doc, report) = Document::from_value(&row.doc);
        if !report.is_clean() {
            warn!(
                %project_id,
                dropped_elements = report.dropped_elements,
                dropped_canvases = report.dropped_canvases,
                orphaned_elements = report.orphaned_elements,
                "dropped malformed entries while hydrating document"
            );
        }
        Some(doc)
    };

    let mut projects = state.projects.write().await;
    let project = match projects.entry(project_id) {
        std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
        std::collections::hash_map::Entry::Vacant(entry) => {
            let doc = loaded.unwrap_or_default();
            info!(%project_id, elements = doc.element_count(), "hydrated project from database");
            entry.insert(ProjectState::new(doc))
        }
    };

    let color = pick_color();
    let roster: Vec<ConnectedUser> = project.users.values().cloned().collect();

    project.clients.insert(client_id, tx);
    project.users.insert(
        client_id,
        ConnectedUser { user_id, user_name: user_name.to_owned(), color: color.clone() },
    );

    let snapshot = project.doc.to_snapshot();
    info!(%project_id, %client_id, clients = project.clients.len(), "client joined project");

    Ok(JoinSnapshot {
        elements: serde_json::to_value(&snapshot.elements).unwrap_or_default(),
        canvas_stack: serde_json::to_value(&snapshot.canvas_stack).unwrap_or_default(),
        roster,
        color,
    })
}

/// Leave a project. Removes the connection from the roster. If it was the
/// last one, flushes a dirty document and evicts the project from memory.
pub async fn part_project(state: &AppState, project_id: Uuid, client_id: Uuid) {
    let mut projects = state.projects.write().await;
    let Some(project) = projects.get_mut(&project_id) else {
        return;
    };

    project.clients.remove(&client_id);
    project.users.remove(&client_id);
    info!(%project_id, %client_id, remaining = project.clients.len(), "client left project");

    if !project.clients.is_empty() {
        return;
    }

    if !project.dirty {
        projects.remove(&project_id);
        info!(%project_id, "evicted project from memory");
        return;
    }

    // Snapshot under the lock, write outside it, then re-check before
    // clearing: a rejoin or fresh edit during the write must win.
    let doc_value = project.doc.to_value();
    let flushed_revision = project.revision;
    drop(projects);

    let flush_result = project::save_doc(&state.pool, project_id, &doc_value).await;

    let mut projects = state.projects.write().await;
    let Some(project) = projects.get_mut(&project_id) else {
        return;
    };
    if !project.clients.is_empty() {
        return;
    }

    match flush_result {
        Ok(()) => {
            if project.revision == flushed_revision {
                projects.remove(&project_id);
                info!(%project_id, "flushed and evicted project from memory");
            } else {
                tracing::warn!(%project_id, "retaining project after final flush because newer edits exist");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, %project_id, "final flush failed; project retained for retry");
        }
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a project, optionally excluding one.
pub async fn broadcast(state: &AppState, project_id: Uuid, frame: &Frame, exclude: Option<Uuid>) {
    let projects = state.projects.read().await;
    let Some(project) = projects.get(&project_id) else {
        return;
    };

    for (client_id, tx) in &project.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(frame.clone());
    }
}
