//! Sync service — last-write-wins replacement of document sections.
//!
//! DESIGN
//! ======
//! A `canvas-update` names one section (`elements` or `canvasStack`) and
//! carries its full replacement value. The update lands in memory wholesale,
//! marks the project dirty for the flush worker, and is relayed to peers
//! unchanged. There is no merge: a remote update arriving mid-edit clobbers
//! local state at document granularity, which is the documented conflict
//! policy for this protocol.

use canvas::element::Element;
use canvas::tree::CanvasNode;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("project not live: {0}")]
    ProjectNotLive(Uuid),
    #[error("unknown canvas-update type: {0}")]
    InvalidType(String),
    #[error("canvas-update payload does not match its type")]
    InvalidPayload,
}

impl wire::ErrorCode for SyncError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ProjectNotLive(_) => "E_PROJECT_NOT_LIVE",
            Self::InvalidType(_) => "E_INVALID_TYPE",
            Self::InvalidPayload => "E_INVALID_PAYLOAD",
        }
    }
}

/// Which document section a `canvas-update` replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Elements,
    CanvasStack,
}

impl UpdateKind {
    /// Parse the wire `type` field.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidType`] for anything but the two known
    /// section names.
    pub fn parse(value: &str) -> Result<Self, SyncError> {
        match value {
            "elements" => Ok(Self::Elements),
            "canvasStack" => Ok(Self::CanvasStack),
            other => Err(SyncError::InvalidType(other.to_owned())),
        }
    }

    /// The wire name of this section.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Elements => "elements",
            Self::CanvasStack => "canvasStack",
        }
    }
}

// =============================================================================
// APPLY
// =============================================================================

/// Apply a `canvas-update` to the live document: replace the named section
/// wholesale and mark the project dirty.
///
/// # Errors
///
/// Returns `ProjectNotLive` when no client has the project hydrated,
/// `InvalidType` for an unknown section name, and `InvalidPayload` when the
/// data does not deserialize as that section.
pub async fn apply_canvas_update(
    state: &AppState,
    project_id: Uuid,
    update_type: &str,
    data: &serde_json::Value,
) -> Result<(), SyncError> {
    let kind = UpdateKind::parse(update_type)?;

    let mut projects = state.projects.write().await;
    let project = projects
        .get_mut(&project_id)
        .ok_or(SyncError::ProjectNotLive(project_id))?;

    let dropped = match kind {
        UpdateKind::Elements => {
            let elements: Vec<Element> =
                serde_json::from_value(data.clone()).map_err(|_| SyncError::InvalidPayload)?;
            project.doc.replace_elements(elements)
        }
        UpdateKind::CanvasStack => {
            let nodes: Vec<CanvasNode> =
                serde_json::from_value(data.clone()).map_err(|_| SyncError::InvalidPayload)?;
            project.doc.replace_canvas_stack(nodes)
        }
    };

    if dropped > 0 {
        warn!(%project_id, section = kind.as_str(), dropped, "canvas-update dropped inconsistent entries");
    }

    project.mark_dirty();
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
