use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;
use uuid::Uuid;

use super::*;
use crate::state::test_helpers;

// =============================================================
// Validation paths (no database)
// =============================================================

#[tokio::test]
async fn create_rejects_blank_name() {
    let state = test_helpers::test_app_state();
    let body = CreateProjectBody { name: Some("   ".into()) };
    let result = create_project_rest(State(state), Json(body)).await;
    assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn save_rejects_non_object_document() {
    let state = test_helpers::test_app_state();
    let result = save_project_rest(State(state), Path(Uuid::new_v4()), Json(json!([1, 2, 3]))).await;
    assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));
}

#[test]
fn error_mapping() {
    assert_eq!(
        project_error_to_status(ProjectError::NotFound(Uuid::new_v4())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        project_error_to_status(ProjectError::Database(sqlx::Error::PoolClosed)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

// =============================================================
// Database-backed paths
// =============================================================

#[tokio::test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn create_get_save_round_trip() {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL for live test");
    let pool = crate::db::init_pool(&database_url).await.expect("pool");
    let state = crate::state::AppState::new(pool);

    let (status, Json(created)) = create_project_rest(
        State(state.clone()),
        Json(CreateProjectBody { name: Some("Live round trip".into()) }),
    )
    .await
    .expect("create");
    assert_eq!(status, StatusCode::CREATED);

    let Json(fetched) = get_project(State(state.clone()), Path(created.id)).await.expect("get");
    assert_eq!(fetched.name, "Live round trip");
    assert!(fetched.doc.get("canvasStack").is_some());

    let doc = json!({ "elements": [], "canvasStack": fetched.doc["canvasStack"] });
    save_project_rest(State(state.clone()), Path(created.id), Json(doc.clone()))
        .await
        .expect("save");

    let Json(after) = get_project(State(state), Path(created.id)).await.expect("get after save");
    assert_eq!(after.doc, doc);
}
