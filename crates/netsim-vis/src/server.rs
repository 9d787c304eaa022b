//! Axum web server: JSON command API plus a WebSocket streaming frames.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use netsim_topology::{
    ConfigOverrides, DeviceId, DeviceKind, DeviceRecord, Error as TopologyError, ImportReport,
    LinkId, LinkKind, Point, Protocol, Snapshot, TopologyStats,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::animation::{AnimationLoop, FrameReceiver};
use crate::config::VisConfig;
use crate::error::Error;
use crate::events::LogEntry;
use crate::interaction::{Mode, Outcome, PointerEvent};
use crate::simulator::{Frame, SharedSimulator, Simulator};
use crate::traffic::TrafficLoop;

/// Shared application state.
pub struct AppState {
    simulator: SharedSimulator,
    animation: Mutex<AnimationLoop>,
    traffic: Mutex<TrafficLoop>,
    frames: FrameReceiver,
}

/// Simulator server.
pub struct VisServer {
    state: Arc<AppState>,
}

impl VisServer {
    /// Create a server around a simulator. Nothing runs until started.
    pub fn new(simulator: Simulator, config: &VisConfig) -> Self {
        let simulator = simulator.into_shared();
        let animation = AnimationLoop::new(simulator.clone(), config.frame_interval);
        let frames = animation.subscribe();
        let traffic = TrafficLoop::new(simulator.clone(), config.traffic_interval);

        Self {
            state: Arc::new(AppState {
                simulator,
                animation: Mutex::new(animation),
                traffic: Mutex::new(traffic),
                frames,
            }),
        }
    }

    /// Handle to the shared simulator.
    pub fn simulator(&self) -> SharedSimulator {
        self.state.simulator.clone()
    }

    /// Start the frame loop.
    pub async fn start_animation(&self) -> bool {
        self.state.animation.lock().await.start()
    }

    /// Build the router for the server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(index_handler))
            .route("/api/status", get(status_handler))
            .route(
                "/api/topology",
                get(export_handler).put(import_handler).delete(clear_handler),
            )
            .route("/api/devices", post(add_device_handler))
            .route(
                "/api/devices/{id}",
                patch(update_device_handler).delete(remove_device_handler),
            )
            .route("/api/links", post(add_link_handler))
            .route("/api/links/{id}", delete(remove_link_handler))
            .route("/api/packets", post(send_packet_handler))
            .route("/api/selection", delete(delete_selection_handler))
            .route("/api/mode", post(mode_handler))
            .route("/api/pointer", post(pointer_handler))
            .route("/api/animation/start", post(animation_start_handler))
            .route("/api/animation/stop", post(animation_stop_handler))
            .route("/api/traffic/start", post(traffic_start_handler))
            .route("/api/traffic/stop", post(traffic_stop_handler))
            .route("/api/events", get(events_handler))
            .route("/api/frame", post(frame_handler))
            .route("/ws", get(ws_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Run the server on the given port.
    pub async fn serve(self, port: u16) -> Result<(), std::io::Error> {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Simulator running on http://localhost:{}", port);
        axum::serve(listener, self.router()).await
    }
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Simulator error mapped onto an HTTP status.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<TopologyError> for ApiError {
    fn from(e: TopologyError) -> Self {
        Self(Error::Topology(e))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Topology(TopologyError::UnknownDevice(_) | TopologyError::UnknownLink(_)) => {
                StatusCode::NOT_FOUND
            }
            Error::Topology(TopologyError::DuplicateLink(..) | TopologyError::NoLink(..)) => {
                StatusCode::CONFLICT
            }
            Error::Topology(_) => StatusCode::BAD_REQUEST,
            Error::Config(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!("Request refused ({}): {}", status, self.0);
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// Server status response.
#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    mode: Mode,
    mode_label: String,
    frame: u64,
    animation_running: bool,
    traffic_running: bool,
    stats: TopologyStats,
}

async fn status(state: &AppState) -> StatusResponse {
    let animation_running = state.animation.lock().await.is_running();
    let traffic_running = state.traffic.lock().await.is_running();
    let sim = state.simulator.read().await;
    StatusResponse {
        status: "ok",
        mode: sim.mode(),
        mode_label: sim.mode().to_string(),
        frame: sim.frame_number(),
        animation_running,
        traffic_running,
        stats: sim.stats(),
    }
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(status(&state).await)
}

async fn export_handler(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.simulator.write().await.export_snapshot())
}

async fn import_handler(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<Snapshot>,
) -> Json<ImportReport> {
    Json(state.simulator.write().await.import_snapshot(snapshot))
}

async fn clear_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.simulator.write().await.clear();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct AddDeviceRequest {
    kind: DeviceKind,
    x: f64,
    y: f64,
    #[serde(default)]
    config: ConfigOverrides,
}

fn device_record(sim: &Simulator, id: &DeviceId) -> ApiResult<DeviceRecord> {
    let device = sim
        .topology()
        .device(id)
        .ok_or_else(|| TopologyError::UnknownDevice(id.clone()))?;
    Ok(DeviceRecord {
        id: device.id.clone(),
        kind: device.kind,
        x: device.position.x,
        y: device.position.y,
        config: ConfigOverrides::from(device.config.clone()),
    })
}

async fn add_device_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddDeviceRequest>,
) -> ApiResult<(StatusCode, Json<DeviceRecord>)> {
    let mut sim = state.simulator.write().await;
    let id = sim.add_device(req.kind, Point::new(req.x, req.y), req.config);
    Ok((StatusCode::CREATED, Json(device_record(&sim, &id)?)))
}

async fn update_device_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(overrides): Json<ConfigOverrides>,
) -> ApiResult<Json<DeviceRecord>> {
    let id = DeviceId::new(id);
    let mut sim = state.simulator.write().await;
    sim.update_device_config(&id, overrides)?;
    Ok(Json(device_record(&sim, &id)?))
}

async fn remove_device_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .simulator
        .write()
        .await
        .remove_device(&DeviceId::new(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct AddLinkRequest {
    device1: DeviceId,
    device2: DeviceId,
    #[serde(rename = "type", default)]
    kind: LinkKind,
}

#[derive(Debug, Serialize)]
struct LinkCreated {
    id: LinkId,
}

async fn add_link_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddLinkRequest>,
) -> ApiResult<(StatusCode, Json<LinkCreated>)> {
    let id = state
        .simulator
        .write()
        .await
        .add_connection(&req.device1, &req.device2, req.kind)?;
    Ok((StatusCode::CREATED, Json(LinkCreated { id })))
}

async fn remove_link_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.simulator.write().await.remove_connection(LinkId(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_selection_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.simulator.write().await.delete_selection() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Deserialize)]
struct SendPacketRequest {
    from: DeviceId,
    to: DeviceId,
    #[serde(default)]
    protocol: Protocol,
}

#[derive(Serialize)]
struct PacketSent {
    link: LinkId,
}

async fn send_packet_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendPacketRequest>,
) -> ApiResult<Json<PacketSent>> {
    let link = state
        .simulator
        .write()
        .await
        .send_packet(&req.from, &req.to, req.protocol)?;
    Ok(Json(PacketSent { link }))
}

#[derive(Serialize)]
struct ModeResponse {
    mode: Mode,
    label: String,
}

async fn mode_handler(
    State(state): State<Arc<AppState>>,
    Json(mode): Json<Mode>,
) -> Json<ModeResponse> {
    state.simulator.write().await.set_mode(mode);
    Json(ModeResponse {
        mode,
        label: mode.to_string(),
    })
}

async fn pointer_handler(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PointerEvent>,
) -> Json<Outcome> {
    Json(state.simulator.write().await.pointer(event))
}

/// Start/stop result for a recurring task.
#[derive(Serialize)]
struct LoopStatus {
    running: bool,
    changed: bool,
}

async fn animation_start_handler(State(state): State<Arc<AppState>>) -> Json<LoopStatus> {
    let mut animation = state.animation.lock().await;
    let changed = animation.start();
    Json(LoopStatus {
        running: animation.is_running(),
        changed,
    })
}

async fn animation_stop_handler(State(state): State<Arc<AppState>>) -> Json<LoopStatus> {
    let mut animation = state.animation.lock().await;
    let changed = animation.stop().await;
    Json(LoopStatus {
        running: animation.is_running(),
        changed,
    })
}

async fn traffic_start_handler(State(state): State<Arc<AppState>>) -> Json<LoopStatus> {
    let mut traffic = state.traffic.lock().await;
    let changed = traffic.start();
    if changed {
        state.simulator.write().await.log("Network simulation started");
    }
    Json(LoopStatus {
        running: traffic.is_running(),
        changed,
    })
}

async fn traffic_stop_handler(State(state): State<Arc<AppState>>) -> Json<LoopStatus> {
    let mut traffic = state.traffic.lock().await;
    let changed = traffic.stop().await;
    if changed {
        state.simulator.write().await.log("Network simulation stopped");
    }
    Json(LoopStatus {
        running: traffic.is_running(),
        changed,
    })
}

async fn events_handler(State(state): State<Arc<AppState>>) -> Json<Vec<LogEntry>> {
    Json(state.simulator.read().await.events().to_vec())
}

/// Render one frame on demand, for clients that drive their own clock.
async fn frame_handler(State(state): State<Arc<AppState>>) -> Json<Frame> {
    Json(state.simulator.write().await.render_frame())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Commands accepted over the WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    Pointer(PointerEvent),
    SetMode(Mode),
    SendPacket {
        from: DeviceId,
        to: DeviceId,
        #[serde(default)]
        protocol: Protocol,
    },
    DeleteSelection,
    GetEvents,
    GetStatus,
}

/// Messages pushed to WebSocket clients.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsMessage<'a> {
    Frame(&'a Frame),
    Outcome(Outcome),
    Events { entries: Vec<LogEntry> },
    Status(StatusResponse),
    Error { message: String },
}

async fn send_json(socket: &mut WebSocket, message: &WsMessage<'_>) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::warn!("Failed to encode WebSocket message: {}", e);
            true
        }
    }
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut frames = state.frames.clone();
    tracing::debug!("WebSocket client connected");

    // Latest frame first so the client has something to show
    let current = frames.borrow_and_update().clone();
    if let Some(frame) = current {
        if !send_json(&mut socket, &WsMessage::Frame(frame.as_ref())).await {
            return;
        }
    }

    loop {
        tokio::select! {
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = frames.borrow_and_update().clone();
                if let Some(frame) = latest {
                    if !send_json(&mut socket, &WsMessage::Frame(frame.as_ref())).await {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<WsCommand>(&text) {
                            Ok(cmd) => handle_ws_command(&state, cmd).await,
                            Err(e) => WsMessage::Error { message: e.to_string() },
                        };
                        if !send_json(&mut socket, &reply).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::debug!("WebSocket client disconnected");
}

async fn handle_ws_command(state: &AppState, cmd: WsCommand) -> WsMessage<'static> {
    match cmd {
        WsCommand::Pointer(event) => {
            WsMessage::Outcome(state.simulator.write().await.pointer(event))
        }
        WsCommand::SetMode(mode) => {
            state.simulator.write().await.set_mode(mode);
            WsMessage::Status(status(state).await)
        }
        WsCommand::SendPacket { from, to, protocol } => {
            let result = state
                .simulator
                .write()
                .await
                .send_packet(&from, &to, protocol);
            match result {
                Ok(_) => WsMessage::Events {
                    entries: state.simulator.read().await.events().to_vec(),
                },
                Err(e) => WsMessage::Error {
                    message: e.to_string(),
                },
            }
        }
        WsCommand::DeleteSelection => {
            state.simulator.write().await.delete_selection();
            WsMessage::Status(status(state).await)
        }
        WsCommand::GetEvents => WsMessage::Events {
            entries: state.simulator.read().await.events().to_vec(),
        },
        WsCommand::GetStatus => WsMessage::Status(status(state).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsim_topology::LinkStatus;

    fn server() -> VisServer {
        let config = VisConfig::default();
        VisServer::new(Simulator::new(&config), &config)
    }

    #[test]
    fn router_builds() {
        let _router = server().router();
    }

    #[test]
    fn index_page_renders_event_text_without_markup() {
        let page = include_str!("../static/index.html");
        assert!(!page.contains("innerHTML"));
        assert!(page.contains("row.textContent"));
    }

    #[test]
    fn errors_map_to_status_codes() {
        let id = DeviceId::from("ghost");
        let cases = [
            (TopologyError::UnknownDevice(id.clone()), StatusCode::NOT_FOUND),
            (TopologyError::UnknownLink(LinkId(3)), StatusCode::NOT_FOUND),
            (TopologyError::DuplicateLink(id.clone(), id.clone()), StatusCode::CONFLICT),
            (TopologyError::NoLink(id.clone(), id.clone()), StatusCode::CONFLICT),
            (TopologyError::SelfLink(id.clone()), StatusCode::BAD_REQUEST),
            (TopologyError::UnknownKind("hub".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn device_and_link_endpoints() {
        let server = server();
        let state = server.state.clone();

        let (code, Json(a)) = add_device_handler(
            State(state.clone()),
            Json(AddDeviceRequest {
                kind: DeviceKind::Router,
                x: 0.0,
                y: 0.0,
                config: ConfigOverrides::default().with_name("Core"),
            }),
        )
        .await
        .unwrap();
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(a.config.name.as_deref(), Some("Core"));

        let (_, Json(b)) = add_device_handler(
            State(state.clone()),
            Json(AddDeviceRequest {
                kind: DeviceKind::Server,
                x: 200.0,
                y: 0.0,
                config: ConfigOverrides::default(),
            }),
        )
        .await
        .unwrap();

        let link = |state: Arc<AppState>| {
            add_link_handler(
                State(state),
                Json(AddLinkRequest {
                    device1: a.id.clone(),
                    device2: b.id.clone(),
                    kind: LinkKind::Ethernet,
                }),
            )
        };
        assert!(link(state.clone()).await.is_ok());
        let dup = link(state.clone()).await.unwrap_err();
        assert_eq!(dup.status(), StatusCode::CONFLICT);

        let Json(snapshot) = export_handler(State(state.clone())).await;
        assert_eq!(snapshot.devices.len(), 2);
        assert_eq!(snapshot.connections[0].status, LinkStatus::Active);

        let code = remove_device_handler(State(state.clone()), Path(a.id.to_string()))
            .await
            .unwrap();
        assert_eq!(code, StatusCode::NO_CONTENT);
        let missing = remove_device_handler(State(state.clone()), Path(a.id.to_string()))
            .await
            .unwrap_err();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let Json(status) = status_handler(State(state)).await;
        assert_eq!(status.stats.devices, 1);
        assert_eq!(status.stats.links, 0);
    }

    #[tokio::test]
    async fn traffic_start_stop_logs_once() {
        let server = server();
        let state = server.state.clone();

        let Json(first) = traffic_start_handler(State(state.clone())).await;
        let Json(second) = traffic_start_handler(State(state.clone())).await;
        assert!(first.changed && first.running);
        assert!(!second.changed && second.running);

        let Json(stopped) = traffic_stop_handler(State(state.clone())).await;
        assert!(stopped.changed && !stopped.running);

        let Json(events) = events_handler(State(state)).await;
        let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Network simulation stopped", "Network simulation started"]
        );
    }

    #[test]
    fn ws_commands_parse() {
        let cmd: WsCommand =
            serde_json::from_str(r#"{"type":"pointer","event":"down","x":10,"y":20}"#).unwrap();
        assert!(matches!(cmd, WsCommand::Pointer(PointerEvent::Down { .. })));

        let cmd: WsCommand =
            serde_json::from_str(r#"{"type":"set_mode","mode":"place_device","kind":"router"}"#)
                .unwrap();
        assert!(matches!(cmd, WsCommand::SetMode(Mode::PlaceDevice(DeviceKind::Router))));

        let cmd: WsCommand =
            serde_json::from_str(r#"{"type":"send_packet","from":"router_1","to":"switch_2"}"#)
                .unwrap();
        assert!(matches!(cmd, WsCommand::SendPacket { protocol: Protocol::Tcp, .. }));
    }
}
