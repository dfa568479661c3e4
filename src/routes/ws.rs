//! WebSocket handler — bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID and enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by event name
//! - Broadcast frames from project peers → forward to client
//!
//! Handler functions are pure business logic — they validate, mutate state,
//! and return an `Outcome`. The dispatch layer owns all outbound concerns:
//! reply to sender and relay to peers.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session-connected` with `clientId`
//! 2. Client sends `join-project` → peers get `user-joined`
//! 3. `cursor-move` relays as `cursor-update`; `canvas-update` applies LWW
//!    and relays as `canvas-updated`
//! 4. Close → broadcast `user-left` → cleanup (last client flushes + evicts)

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;
use wire::{Data, Frame, event};

use crate::services;
use crate::state::{AppState, ConnectedUser};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
enum Outcome {
    /// Send empty done to sender only.
    Done,
    /// Reply done+data to sender, and send a request frame with `relay_event`
    /// to all project peers excluding the sender.
    ReplyAndRelay { reply: Data, relay_event: &'static str, relay: Data },
    /// Send a request frame with `relay_event` to peers excluding the
    /// sender. No reply — used for cursor moves (ephemeral, unacked).
    Relay { relay_event: &'static str, relay: Data },
}

/// Identity of a connection once `join-project` has succeeded.
#[derive(Debug, Clone)]
struct JoinedSession {
    project_id: Uuid,
    user_id: Uuid,
    user_name: String,
    color: String,
}

// =============================================================================
// UPGRADE / CONNECTION
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    let welcome = Frame::request(event::SESSION_CONNECTED, Data::new())
        .with_data("clientId", client_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_err() {
        return;
    }

    info!(%client_id, "ws: client connected");

    // Identity of the joined project, if any.
    let mut session: Option<JoinedSession> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let frames = process_inbound_text(&state, &mut session, client_id, &client_tx, &text).await;
                        let mut closed = false;
                        for frame in frames {
                            if send_frame(&mut socket, &frame).await.is_err() {
                                closed = true;
                                break;
                            }
                        }
                        if closed {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Broadcast user-left to peers BEFORE cleanup (part may evict state).
    if let Some(session) = session {
        announce_left(&state, &session, client_id).await;
        services::session::part_project(&state, session.project_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

/// Tell project peers this connection is gone.
async fn announce_left(state: &AppState, session: &JoinedSession, client_id: Uuid) {
    let mut data = Data::new();
    data.insert("userId".into(), serde_json::json!(session.user_id));
    data.insert("userName".into(), serde_json::json!(session.user_name));
    let frame = Frame::request(event::USER_LEFT, data)
        .with_project_id(session.project_id)
        .with_from(session.user_id.to_string());
    services::session::broadcast(state, session.project_id, &frame, Some(client_id)).await;
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and process one inbound text frame and return frames for the sender.
///
/// This keeps websocket transport concerns separate from frame handling, so
/// tests can exercise dispatch and relay behavior end-to-end.
async fn process_inbound_text(
    state: &AppState,
    session: &mut Option<JoinedSession>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    text: &str,
) -> Vec<Frame> {
    let mut req = match wire::decode_frame(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway-error", Data::new())
                .with_data("message", format!("invalid frame: {e}"));
            return vec![err];
        }
    };

    // Stamp the joined identity as `from`.
    if let Some(session) = session.as_ref() {
        req.from = Some(session.user_id.to_string());
    }

    let is_cursor = req.event == event::CURSOR_MOVE;
    if !is_cursor {
        info!(%client_id, id = %req.id, event = %req.event, status = ?req.status, "ws: recv frame");
    }

    // Dispatch to handler — returns Outcome or error Frame.
    let result = match req.event.as_str() {
        event::JOIN_PROJECT => handle_join(state, session, client_id, client_tx, &req).await,
        event::CURSOR_MOVE => Ok(handle_cursor(session.as_ref(), &req)),
        event::CANVAS_UPDATE => handle_canvas_update(state, session.as_ref(), &req).await,
        other => Err(req.error(format!("unknown event: {other}"))),
    };

    // Apply outcome — the dispatch layer owns all outbound logic.
    let identity = session
        .as_ref()
        .map(|s| (s.project_id, s.user_id.to_string()));
    match result {
        Ok(Outcome::Done) => vec![req.done()],
        Ok(Outcome::ReplyAndRelay { reply, relay_event, relay }) => {
            if let Some((project_id, from)) = identity {
                let frame = Frame::request(relay_event, relay)
                    .with_project_id(project_id)
                    .with_from(from);
                services::session::broadcast(state, project_id, &frame, Some(client_id)).await;
            }
            vec![req.done_with(reply)]
        }
        Ok(Outcome::Relay { relay_event, relay }) => {
            if let Some((project_id, from)) = identity {
                let frame = Frame::request(relay_event, relay)
                    .with_project_id(project_id)
                    .with_from(from);
                services::session::broadcast(state, project_id, &frame, Some(client_id)).await;
            }
            vec![]
        }
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// JOIN HANDLER
// =============================================================================

async fn handle_join(
    state: &AppState,
    session: &mut Option<JoinedSession>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<Frame>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(project_id) = req.project_id.or_else(|| {
        req.data
            .get("projectId")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
    }) else {
        return Err(req.error("projectId required"));
    };
    let Some(user_id) = req
        .data
        .get("userId")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<Uuid>().ok())
    else {
        return Err(req.error("userId required"));
    };
    let Some(user_name) = req.data.get("userName").and_then(|v| v.as_str()) else {
        return Err(req.error("userName required"));
    };

    // Part the current project when switching.
    if let Some(old) = session.take() {
        announce_left(state, &old, client_id).await;
        services::session::part_project(state, old.project_id, client_id).await;
    }

    match services::session::join_project(state, project_id, client_id, user_id, user_name, client_tx.clone())
        .await
    {
        Ok(snapshot) => {
            *session = Some(JoinedSession {
                project_id,
                user_id,
                user_name: user_name.to_owned(),
                color: snapshot.color.clone(),
            });

            let mut reply = Data::new();
            reply.insert("elements".into(), snapshot.elements);
            reply.insert("canvasStack".into(), snapshot.canvas_stack);
            reply.insert(
                "collaborators".into(),
                serde_json::Value::Array(snapshot.roster.iter().map(user_to_json).collect()),
            );
            reply.insert("color".into(), serde_json::json!(snapshot.color));

            let mut relay = Data::new();
            relay.insert("userId".into(), serde_json::json!(user_id));
            relay.insert("userName".into(), serde_json::json!(user_name));
            relay.insert("color".into(), serde_json::json!(snapshot.color));

            Ok(Outcome::ReplyAndRelay { reply, relay_event: event::USER_JOINED, relay })
        }
        Err(e) => Err(req.error_from(&e)),
    }
}

// =============================================================================
// CURSOR HANDLER
// =============================================================================

fn handle_cursor(session: Option<&JoinedSession>, req: &Frame) -> Outcome {
    let Some(session) = session else {
        // Silently ignore cursor moves before joining.
        return Outcome::Done;
    };

    let x = req
        .data
        .get("x")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);
    let y = req
        .data
        .get("y")
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(0.0);

    let mut relay = Data::new();
    relay.insert("userId".into(), serde_json::json!(session.user_id));
    relay.insert("userName".into(), serde_json::json!(session.user_name));
    relay.insert("color".into(), serde_json::json!(session.color));
    relay.insert("x".into(), serde_json::json!(x));
    relay.insert("y".into(), serde_json::json!(y));

    Outcome::Relay { relay_event: event::CURSOR_UPDATE, relay }
}

// =============================================================================
// CANVAS UPDATE HANDLER
// =============================================================================

async fn handle_canvas_update(
    state: &AppState,
    session: Option<&JoinedSession>,
    req: &Frame,
) -> Result<Outcome, Frame> {
    let Some(session) = session else {
        return Err(req.error("must join a project first"));
    };
    let Some(update_type) = req.data.get("type").and_then(|v| v.as_str()) else {
        return Err(req.error("type required"));
    };
    let Some(data) = req.data.get("data") else {
        return Err(req.error("data required"));
    };

    match services::sync::apply_canvas_update(state, session.project_id, update_type, data).await {
        Ok(()) => {
            let mut reply = Data::new();
            reply.insert("type".into(), serde_json::json!(update_type));

            let mut relay = Data::new();
            relay.insert("projectId".into(), serde_json::json!(session.project_id));
            relay.insert("type".into(), serde_json::json!(update_type));
            relay.insert("data".into(), data.clone());

            Ok(Outcome::ReplyAndRelay { reply, relay_event: event::CANVAS_UPDATED, relay })
        }
        Err(e) => Err(req.error_from(&e)),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn user_to_json(user: &ConnectedUser) -> serde_json::Value {
    serde_json::json!({
        "userId": user.user_id,
        "userName": user.user_name,
        "color": user.color,
    })
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = wire::encode_frame(frame);
    let is_cursor = frame.event == event::CURSOR_UPDATE || frame.event == event::CURSOR_MOVE;
    if !is_cursor {
        if frame.status == wire::Status::Error {
            let code = frame
                .data
                .get(wire::FRAME_CODE)
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            let message = frame
                .data
                .get(wire::FRAME_MESSAGE)
                .and_then(|v| v.as_str())
                .unwrap_or("-");
            warn!(id = %frame.id, event = %frame.event, code, message, "ws: send frame status=Error");
        } else {
            info!(id = %frame.id, event = %frame.event, status = ?frame.status, "ws: send frame");
        }
    }
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
