mod adapter;
mod api;

use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use canvas::draw::DrawCapture;
use canvas::element::Point;
use clap::{Args, Parser, Subcommand};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;
use wire::{Data, Frame, Status, event};

use adapter::ProjectAdapter;
use api::ApiClient;

const RECONNECT_BASE_MS: u64 = 500;
const RECONNECT_MAX_EXP: u32 = 4; // 500ms * 2^4 = 8s cap

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("websocket connect failed: {0}")]
    WsConnect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("websocket closed")]
    WsClosed,
    #[error("frame decode failed: {0}")]
    Decode(#[from] wire::CodecError),
    #[error("timed out waiting for websocket frame")]
    Timeout,
    #[error("server returned error for {context}: {message}")]
    ServerError { context: String, message: String },
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Document(#[from] canvas::document::DocumentError),
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Parser, Debug)]
#[command(name = "easel-cli", about = "Easel API and websocket CLI")]
struct Cli {
    #[arg(long, env = "EASEL_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    /// Identity sent on join; generated per invocation when absent.
    #[arg(long, env = "EASEL_USER_ID")]
    user_id: Option<Uuid>,

    #[arg(long, env = "EASEL_USER_NAME", default_value = "easel-cli")]
    user_name: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    user_id: Uuid,
    user_name: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check server liveness.
    Ping,
    /// Project operations over REST.
    Project(ProjectCommand),
    /// Fetch a document, reconstitute image bitmaps, and print it.
    Load {
        project_id: Uuid,
        /// Skip fetching bitmaps to refresh natural dimensions.
        #[arg(long, default_value_t = false)]
        skip_images: bool,
    },
    /// Push a document file to the server (whole-document, last write wins).
    Save {
        project_id: Uuid,
        #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
        input: String,
    },
    /// Join a project and stream realtime events; reconnects with backoff.
    Watch(WatchArgs),
    /// Draw a freehand squiggle, commit it as a group, sync it, and save.
    Scribble(ScribbleArgs),
}

#[derive(Args, Debug)]
struct ProjectCommand {
    #[command(subcommand)]
    command: ProjectSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProjectSubcommand {
    List,
    Create {
        #[arg(long, default_value = "Untitled Project")]
        name: String,
    },
    Show {
        project_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct WatchArgs {
    project_id: Uuid,

    /// Emit a wandering cursor on an interval, for presence demos.
    #[arg(long, default_value_t = false)]
    wander: bool,

    #[arg(long, default_value_t = 500)]
    cursor_interval_ms: u64,
}

#[derive(Args, Debug)]
struct ScribbleArgs {
    project_id: Uuid,

    /// Extent of the squiggle in world units.
    #[arg(long, default_value_t = 120.0)]
    size: f64,

    #[arg(long, default_value = canvas::consts::DEFAULT_STROKE_COLOR)]
    color: String,

    #[arg(long, default_value_t = canvas::consts::DEFAULT_STROKE_WIDTH)]
    width: f64,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = CliContext {
        base_url: cli.base_url,
        user_id: cli.user_id.unwrap_or_else(Uuid::new_v4),
        user_name: cli.user_name,
    };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Project(project) => run_project(&ctx, project).await,
        Command::Load { project_id, skip_images } => run_load(&ctx, project_id, skip_images).await,
        Command::Save { project_id, input } => run_save(&ctx, project_id, &input).await,
        Command::Watch(args) => run_watch(&ctx, args).await,
        Command::Scribble(args) => run_scribble(&ctx, args).await,
    }
}

// =============================================================================
// REST COMMANDS
// =============================================================================

async fn run_ping(ctx: &CliContext) -> Result<(), CliError> {
    ApiClient::new(&ctx.base_url)?.ping().await?;
    println!("ok");
    Ok(())
}

async fn run_project(ctx: &CliContext, project: ProjectCommand) -> Result<(), CliError> {
    let api = ApiClient::new(&ctx.base_url)?;
    match project.command {
        ProjectSubcommand::List => print_json(&api.list_projects().await?),
        ProjectSubcommand::Create { name } => print_json(&api.create_project(&name).await?),
        ProjectSubcommand::Show { project_id } => print_json(&api.fetch_project(project_id).await?),
    }
}

/// Load path: fetch the document, defensively rebuild it, and reconstitute
/// bitmap handles from the stored source URLs.
async fn run_load(ctx: &CliContext, project_id: Uuid, skip_images: bool) -> Result<(), CliError> {
    let api = ApiClient::new(&ctx.base_url)?;
    let record = api.fetch_project(project_id).await?;
    let doc_value = record.get("doc").ok_or(CliError::MissingField("doc"))?;

    let (mut session, report) = ProjectAdapter::from_load(project_id, doc_value);
    if !report.is_clean() {
        eprintln!(
            "load dropped malformed data: {} elements, {} canvases, {} orphans",
            report.dropped_elements, report.dropped_canvases, report.orphaned_elements
        );
    }

    if !skip_images {
        let mut elements = session.doc.to_snapshot().elements;
        let image_report = api.reconstitute_images(&mut elements).await;
        session.doc.replace_elements(elements);
        if image_report.attempted > 0 {
            eprintln!(
                "bitmaps: {} refreshed, {} kept stored dimensions",
                image_report.refreshed, image_report.failed
            );
        }
    }

    print_json(&session.doc.to_value())
}

async fn run_save(ctx: &CliContext, project_id: Uuid, input: &str) -> Result<(), CliError> {
    let text = read_input(input)?;
    let value: Value = serde_json::from_str(&text)?;

    let (mut session, report) = ProjectAdapter::from_load(project_id, &value);
    if !report.is_clean() {
        eprintln!(
            "input carried malformed data: {} elements, {} canvases, {} orphans dropped",
            report.dropped_elements, report.dropped_canvases, report.orphaned_elements
        );
    }

    let api = ApiClient::new(&ctx.base_url)?;
    let payload = session.begin_save().ok_or(CliError::MissingField("document"))?;
    let result = api.save_doc(project_id, &payload).await;
    session.finish_save(result.is_ok(), now_ms());
    result?;

    eprintln!(
        "saved {} elements to project {project_id}",
        session.doc.element_count()
    );
    Ok(())
}

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

// =============================================================================
// WATCH (reconnecting realtime client)
// =============================================================================

async fn run_watch(ctx: &CliContext, args: WatchArgs) -> Result<(), CliError> {
    let mut attempt: u32 = 0;
    loop {
        match watch_once(ctx, &args, &mut attempt).await {
            Ok(()) | Err(CliError::WsClosed) => {}
            Err(e) => eprintln!("watch error: {e}"),
        }

        // Reconnect with capped exponential backoff, then re-join.
        attempt = attempt.saturating_add(1);
        let delay = reconnect_delay(attempt);
        eprintln!("connection lost; reconnecting in {}ms", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}

fn reconnect_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(RECONNECT_MAX_EXP);
    Duration::from_millis(RECONNECT_BASE_MS << exp)
}

async fn watch_once(ctx: &CliContext, args: &WatchArgs, attempt: &mut u32) -> Result<(), CliError> {
    let (stream, session) = connect_and_join(ctx, args.project_id).await?;
    *attempt = 0; // successful join resets the backoff ladder

    eprintln!(
        "joined project {} as {} ({} collaborators already here, {} elements)",
        args.project_id,
        ctx.user_name,
        session.collaborators,
        session.adapter.doc.element_count()
    );

    let mut adapter = session.adapter;
    // Collaborator cursors: last write per user wins, nothing is buffered.
    let mut cursors: std::collections::HashMap<String, (f64, f64)> = std::collections::HashMap::new();
    // Split so the cursor ticker can write while a read is pending.
    let (mut write, mut read) = stream.split();
    let mut ticker = tokio::time::interval(Duration::from_millis(args.cursor_interval_ms.max(50)));
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            frame = recv_next(&mut read, Duration::from_secs(3600)) => {
                let frame = frame?;
                handle_watch_frame(&mut adapter, &mut cursors, &frame);
            }
            _ = ticker.tick(), if args.wander => {
                tick = tick.wrapping_add(1);
                let angle = (tick as f64) / 7.0;
                let mut data = Data::new();
                data.insert("x".into(), serde_json::json!(400.0 + 200.0 * angle.cos()));
                data.insert("y".into(), serde_json::json!(300.0 + 200.0 * angle.sin()));
                let cursor = Frame::request(event::CURSOR_MOVE, data).with_project_id(args.project_id);
                send_text(&mut write, &cursor).await?;
            }
        }
    }
}

fn handle_watch_frame(
    adapter: &mut ProjectAdapter,
    cursors: &mut std::collections::HashMap<String, (f64, f64)>,
    frame: &Frame,
) {
    match frame.event.as_str() {
        event::USER_JOINED => {
            let name = frame.data.get("userName").and_then(Value::as_str).unwrap_or("?");
            let color = frame.data.get("color").and_then(Value::as_str).unwrap_or("-");
            eprintln!("+ {name} joined ({color})");
        }
        event::USER_LEFT => {
            let name = frame.data.get("userName").and_then(Value::as_str).unwrap_or("?");
            if let Some(user_id) = frame.data.get("userId").and_then(Value::as_str) {
                cursors.remove(user_id);
            }
            eprintln!("- {name} left");
        }
        event::CURSOR_UPDATE => {
            let name = frame.data.get("userName").and_then(Value::as_str).unwrap_or("?");
            let user_id = frame.data.get("userId").and_then(Value::as_str).unwrap_or(name);
            let x = frame.data.get("x").and_then(Value::as_f64).unwrap_or(0.0);
            let y = frame.data.get("y").and_then(Value::as_f64).unwrap_or(0.0);
            cursors.insert(user_id.to_owned(), (x, y));
            eprintln!("~ {name} @ ({x:.0}, {y:.0}) [{} live cursors]", cursors.len());
        }
        event::CANVAS_UPDATED => {
            let update_type = frame.data.get("type").and_then(Value::as_str).unwrap_or("?");
            let Some(data) = frame.data.get("data") else {
                return;
            };
            match adapter.apply_remote(update_type, data) {
                Ok(()) => eprintln!(
                    "* {update_type} replaced ({} elements, {} canvases)",
                    adapter.doc.element_count(),
                    adapter.doc.tree().len()
                ),
                Err(e) => eprintln!("! dropped malformed update: {e}"),
            }
        }
        _ => {}
    }
}

// =============================================================================
// SCRIBBLE (drawing capture demo over the full stack)
// =============================================================================

async fn run_scribble(ctx: &CliContext, args: ScribbleArgs) -> Result<(), CliError> {
    let (mut stream, session) = connect_and_join(ctx, args.project_id).await?;
    let mut adapter = session.adapter;

    // Synthesize a freehand gesture: down, a sine wiggle, up. The release
    // commits the accumulated stroke into one transformable group.
    let mut capture = DrawCapture::new(true);
    capture.pointer_down(Point::new(100.0, 100.0), &args.color, args.width);
    let steps = 24;
    for i in 1..=steps {
        let t = f64::from(i) / f64::from(steps);
        capture.pointer_move(Point::new(
            100.0 + args.size * t,
            100.0 + (t * std::f64::consts::TAU).sin() * args.size / 4.0,
        ));
    }
    let commit = capture.pointer_up().ok_or(CliError::MissingField("drawing"))?;

    let canvas_id = adapter.doc.current_canvas_id();
    adapter.doc.add_drawing(canvas_id, commit)?;
    adapter.commit(now_ms());

    // Realtime: replace the elements section for every connected peer.
    let elements = serde_json::to_value(adapter.doc.to_snapshot().elements)?;
    let mut data = Data::new();
    data.insert("projectId".into(), serde_json::json!(args.project_id));
    data.insert("type".into(), serde_json::json!("elements"));
    data.insert("data".into(), elements);
    let update = Frame::request(event::CANVAS_UPDATE, data).with_project_id(args.project_id);
    let update_id = update.id;
    send_text(&mut stream, &update).await?;
    wait_for_terminal_response(&mut stream, update_id, event::CANVAS_UPDATE).await?;

    // Durable: the explicit save path (PATCH, then history snapshot).
    let api = ApiClient::new(&ctx.base_url)?;
    let payload = adapter.begin_save().ok_or(CliError::MissingField("document"))?;
    let result = api.save_doc(args.project_id, &payload).await;
    adapter.finish_save(result.is_ok(), now_ms());
    result?;

    eprintln!(
        "scribble committed: {} elements on canvas, saved at {}",
        adapter.doc.element_count(),
        adapter.last_saved_at().unwrap_or(0)
    );
    Ok(())
}

// =============================================================================
// WS HELPERS
// =============================================================================

struct JoinedWatch {
    adapter: ProjectAdapter,
    collaborators: usize,
}

async fn connect_and_join(ctx: &CliContext, project_id: Uuid) -> Result<(WsStream, JoinedWatch), CliError> {
    let url = ws_url(&ctx.base_url)?;
    let (mut stream, _) = connect_async(url)
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))?;

    wait_for_session_connected(&mut stream).await?;

    let mut data = Data::new();
    data.insert("projectId".into(), serde_json::json!(project_id));
    data.insert("userId".into(), serde_json::json!(ctx.user_id));
    data.insert("userName".into(), serde_json::json!(ctx.user_name));
    let join = Frame::request(event::JOIN_PROJECT, data).with_project_id(project_id);
    let join_id = join.id;
    send_text(&mut stream, &join).await?;

    let reply = wait_for_terminal_response(&mut stream, join_id, event::JOIN_PROJECT).await?;
    let doc_value = serde_json::json!({
        "elements": reply.data.get("elements").cloned().unwrap_or(Value::Array(Vec::new())),
        "canvasStack": reply.data.get("canvasStack").cloned().unwrap_or(Value::Array(Vec::new())),
    });
    let (adapter, report) = ProjectAdapter::from_load(project_id, &doc_value);
    if !report.is_clean() {
        eprintln!(
            "join snapshot carried malformed data: {} elements, {} canvases dropped",
            report.dropped_elements, report.dropped_canvases
        );
    }
    let collaborators = reply
        .data
        .get("collaborators")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);

    Ok((stream, JoinedWatch { adapter, collaborators }))
}

fn ws_url(base_url: &str) -> Result<String, CliError> {
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/api/ws"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/api/ws"));
    }
    Err(CliError::InvalidBaseUrl(base_url.to_owned()))
}

async fn send_text<S>(sink: &mut S, frame: &Frame) -> Result<(), CliError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    sink.send(Message::Text(wire::encode_frame(frame).into()))
        .await
        .map_err(|error| CliError::WsConnect(Box::new(error)))
}

async fn wait_for_session_connected(stream: &mut WsStream) -> Result<(), CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(5)).await?;
        if frame.event == event::SESSION_CONNECTED {
            return Ok(());
        }
    }
}

async fn wait_for_terminal_response(
    stream: &mut WsStream,
    request_id: Uuid,
    event_name: &str,
) -> Result<Frame, CliError> {
    loop {
        let frame = recv_next(stream, Duration::from_secs(15)).await?;
        if frame.parent_id != Some(request_id) {
            continue;
        }
        if frame.event != event_name {
            continue;
        }
        if !frame.status.is_terminal() {
            continue;
        }
        if frame.status == Status::Error {
            return Err(CliError::ServerError {
                context: frame.event,
                message: frame
                    .data
                    .get(wire::FRAME_MESSAGE)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown websocket error")
                    .to_owned(),
            });
        }
        return Ok(frame);
    }
}

async fn recv_next<S>(stream: &mut S, timeout: Duration) -> Result<Frame, CliError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    let fut = async {
        loop {
            let Some(message) = stream.next().await else {
                return Err(CliError::WsClosed);
            };
            match message.map_err(|error| CliError::WsConnect(Box::new(error)))? {
                Message::Text(text) => {
                    return wire::decode_frame(&text).map_err(CliError::from);
                }
                Message::Close(_) => return Err(CliError::WsClosed),
                _ => {}
            }
        }
    };

    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::Timeout)?
}

// =============================================================================
// MISC
// =============================================================================

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
