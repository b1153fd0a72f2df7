use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use ledbridge_common::{
    keys::Flag, CommandRequest, FlagArmedReply, HeartbeatReply, LedAction, LedChangeReply,
    LedCommand, LedId, StatusPayload,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::{
    auth::require_api_key, broker::CommandPublisher, clock::Clock, error::ApiError,
    store::StateStore,
};

const HOME_PAGE: &str = r#"<h2>Servidor ESP32 - Control de LEDs</h2>
<p>Rutas disponibles:</p>
<ul>
    <li>GET /led/status</li>
    <li>/led/on/1 o /led/on/2</li>
    <li>/led/off/1 o /led/off/2</li>
    <li>POST /heartbeat</li>
    <li>POST /reset/wifi</li>
    <li>POST /reset/device</li>
    <li>POST /command (X-API-Key)</li>
</ul>
"#;

#[derive(Clone)]
pub struct AppState {
    pub store: StateStore,
    pub publisher: Option<Arc<dyn CommandPublisher>>,
    pub clock: Arc<dyn Clock>,
    pub heartbeat_timeout_secs: u64,
    pub api_key: Option<Arc<str>>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_home))
        .route("/health", get(handle_health))
        .route("/led/status", get(handle_get_status))
        .route(
            "/led/{action}/{id}",
            get(handle_led_change).post(handle_led_change),
        )
        .route("/heartbeat", post(handle_heartbeat))
        .route("/reset/wifi", post(handle_reset_wifi))
        .route("/credentials/reset", post(handle_reset_wifi))
        .route("/reset/device", post(handle_reset_device))
        .route("/command", post(handle_command))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_home() -> impl IntoResponse {
    Html(HOME_PAGE)
}

async fn handle_health(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.store.ping().await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn handle_get_status(
    State(state): State<AppState>,
) -> Result<Json<StatusPayload>, ApiError> {
    let now = state.clock.now_unix();
    let status = state
        .store
        .status(now, state.heartbeat_timeout_secs)
        .await?;
    Ok(Json(status))
}

async fn handle_led_change(
    State(state): State<AppState>,
    Path((action, id)): Path<(String, String)>,
) -> Result<Json<LedChangeReply>, ApiError> {
    let led: LedId = id.parse().map_err(|_| ApiError::LedNotFound(id))?;
    let action: LedAction = action
        .parse()
        .map_err(|_| ApiError::ActionNotFound(action))?;

    state.store.set_led_state(led, action.state()).await?;
    info!(led = led.number(), state = action.state(), "led state updated");

    Ok(Json(LedChangeReply::new(led, action)))
}

async fn handle_heartbeat(
    State(state): State<AppState>,
) -> Result<Json<HeartbeatReply>, ApiError> {
    let now = state.clock.now_unix();
    state.store.record_heartbeat(now).await?;

    let desired = state.store.desired_state().await?;
    let [clear_wifi, reset] = state
        .store
        .read_and_clear_flags([Flag::ClearWifi, Flag::Reset])
        .await?;
    debug!(now, clear_wifi, reset, "heartbeat recorded");
    if clear_wifi || reset {
        info!(clear_wifi, reset, "delivered pending device commands");
    }

    Ok(Json(HeartbeatReply {
        led1: desired.led1,
        led2: desired.led2,
        clear_wifi,
        reset,
    }))
}

async fn handle_reset_wifi(
    State(state): State<AppState>,
) -> Result<Json<FlagArmedReply>, ApiError> {
    arm_flag(&state, Flag::ClearWifi, "Borrado de credenciales WiFi solicitado").await
}

async fn handle_reset_device(
    State(state): State<AppState>,
) -> Result<Json<FlagArmedReply>, ApiError> {
    arm_flag(&state, Flag::Reset, "Reinicio del dispositivo solicitado").await
}

async fn arm_flag(
    state: &AppState,
    flag: Flag,
    message: &str,
) -> Result<Json<FlagArmedReply>, ApiError> {
    state.store.set_flag(flag, true).await?;
    info!(flag = flag.key(), "one-shot flag armed");
    Ok(Json(FlagArmedReply {
        message: message.to_string(),
        flag: flag.key().to_string(),
    }))
}

async fn handle_command(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<LedChangeReply>, ApiError> {
    require_api_key(state.api_key.as_deref(), &headers)?;

    let Json(request) =
        body.map_err(|rejection| ApiError::InvalidCommand(rejection.body_text()))?;
    let command = LedCommand::try_from(request)
        .map_err(|err| ApiError::InvalidCommand(err.to_string()))?;

    let publisher = state.publisher.as_ref().ok_or(ApiError::BrokerDisabled)?;
    publisher.publish(&command).await?;
    info!(led = command.led, state = command.state, "led command published");

    Ok(Json(LedChangeReply {
        message: "Comando enviado".to_string(),
        led: command.led,
        state: command.state,
    }))
}
