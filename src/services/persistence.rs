//! Persistence service — background flush for dirty live documents.
//!
//! DESIGN
//! ======
//! A background task wakes on a fixed interval, snapshots every dirty
//! document under the lock, releases the lock, and writes each snapshot to
//! Postgres. One worker runs per process, so a flush already in flight is
//! never doubled.
//!
//! ERROR HANDLING
//! ==============
//! Dirty flags are cleared only after successful writes, and only when the
//! document revision is unchanged since the snapshot. This prioritizes
//! durability over duplicate flush attempts: repeated saves are acceptable,
//! silent data loss is not.

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::services::project;
use crate::state::AppState;

const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1000;

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    let flush_interval_ms = env_parse("FLUSH_INTERVAL_MS", DEFAULT_FLUSH_INTERVAL_MS);
    info!(flush_interval_ms, "document persistence flush configured");
    tokio::spawn(async move {
        loop {
            flush_all_dirty(&state).await;
            tokio::time::sleep(Duration::from_millis(flush_interval_ms)).await;
        }
    })
}

/// One dirty document captured for a lock-free write.
#[derive(Debug)]
pub(crate) struct DirtySnapshot {
    pub(crate) project_id: Uuid,
    pub(crate) doc: serde_json::Value,
    pub(crate) revision: u64,
}

/// Collect serialized copies of every dirty document under the lock.
pub(crate) async fn snapshot_dirty(state: &AppState) -> Vec<DirtySnapshot> {
    let projects = state.projects.read().await;
    projects
        .iter()
        .filter(|(_, project)| project.dirty)
        .map(|(project_id, project)| DirtySnapshot {
            project_id: *project_id,
            doc: project.doc.to_value(),
            revision: project.revision,
        })
        .collect()
}

/// Clear the dirty flag for a flushed snapshot, unless the document moved on.
pub(crate) async fn ack_flushed(state: &AppState, project_id: Uuid, flushed_revision: u64) {
    let mut projects = state.projects.write().await;
    let Some(project) = projects.get_mut(&project_id) else {
        return;
    };
    // EDGE: keep the dirty flag if the document was edited after the snapshot.
    if project.revision == flushed_revision {
        project.dirty = false;
    }
}

async fn flush_all_dirty(state: &AppState) {
    let batches = snapshot_dirty(state).await;

    for batch in batches {
        match project::save_doc(&state.pool, batch.project_id, &batch.doc).await {
            Ok(()) => {
                ack_flushed(state, batch.project_id, batch.revision).await;
            }
            Err(e) => {
                error!(error = %e, project_id = %batch.project_id, "persistence flush failed");
            }
        }
    }
}
