use std::{
    collections::HashMap, io::ErrorKind, net::SocketAddr, path::PathBuf, sync::Arc,
    time::Duration,
};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{info, warn};

use microwave_common::{
    CookingStage, HistoryLedger, HistoryRecord, ParseError, PowerLevel, RuntimeConfig,
    SessionError, StartOutcome, TOPIC_CMD_PAUSE, TOPIC_CMD_RESUME, TOPIC_CMD_START,
    TOPIC_CMD_STOP, TOPIC_CONTROLLER_STATE, TOPIC_CONTROLLER_STATUS,
};

use crate::session::SessionController;

#[derive(Clone)]
struct AppState {
    controller: Arc<SessionController>,
    mqtt: AsyncClient,
    store: AppStore,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
    history_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct DefrostResponse {
    food: String,
    thickness: String,
    #[serde(rename = "weightGrams")]
    weight_grams: f64,
    seconds: u64,
}

#[derive(Debug, Serialize)]
struct PowerLevelView {
    label: String,
    percent: u8,
}

/// Power as sent by a panel: a percentage or a label such as `"Low (30%)"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PowerField {
    Percent(i64),
    Label(String),
}

impl PowerField {
    fn to_level(&self) -> Result<PowerLevel, ParseError> {
        match self {
            Self::Percent(percent) => percent.to_string().parse(),
            Self::Label(label) => label.parse(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StartCommand {
    duration: i64,
    #[serde(default)]
    power: Option<PowerField>,
    #[serde(default)]
    stage: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StartRequest {
    duration_secs: u32,
    power: PowerLevel,
    stage: CookingStage,
}

impl StartCommand {
    fn into_request(self) -> Result<StartRequest, ParseError> {
        let power = match self.power {
            Some(field) => field.to_level()?,
            None => PowerLevel::High,
        };
        let stage = match self.stage.as_deref() {
            Some(raw) => raw.parse()?,
            None => CookingStage::Cook,
        };

        Ok(StartRequest {
            duration_secs: duration_from_raw(self.duration),
            power,
            stage,
        })
    }
}

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    runtime.sanitize();

    let ledger = store.load_history().await.unwrap_or_else(|err| {
        warn!("failed to load cooking history from store: {err:#}");
        HistoryLedger::new()
    });
    info!("loaded {} cooking history records", ledger.len());

    let controller = Arc::new(SessionController::new(&runtime, ledger));

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or(runtime.network.mqtt_host.clone());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.mqtt_port);

    let mut mqtt_options = MqttOptions::new("microwave-controller-rust", mqtt_host, mqtt_port);
    let mqtt_user = std::env::var("MQTT_USER").unwrap_or(runtime.network.mqtt_user.clone());
    let mqtt_pass = std::env::var("MQTT_PASS").unwrap_or(runtime.network.mqtt_pass.clone());
    if !mqtt_user.is_empty() {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }
    mqtt_options.set_last_will(rumqttc::LastWill::new(
        TOPIC_CONTROLLER_STATUS,
        "offline",
        QoS::AtLeastOnce,
        true,
    ));

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let app_state = AppState {
        controller,
        mqtt,
        store,
    };

    subscribe_topics(&app_state.mqtt).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_state_publish_loop(
        app_state.clone(),
        Duration::from_millis(runtime.oven.status_publish_interval_ms),
    );

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/start", post(handle_start))
        .route("/api/pause", post(handle_pause))
        .route("/api/resume", post(handle_resume))
        .route("/api/stop", post(handle_stop))
        .route("/api/defrost", get(handle_get_defrost))
        .route("/api/history", get(handle_get_history))
        .route("/api/power-levels", get(handle_get_power_levels))
        .with_state(app_state.clone());

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.controller.stop().await;
    info!("controller stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    let topics = [TOPIC_CMD_START, TOPIC_CMD_PAUSE, TOPIC_CMD_RESUME, TOPIC_CMD_STOP];

    for topic in topics {
        mqtt.subscribe(topic, QoS::AtMostOnce).await?;
    }
    mqtt.publish(TOPIC_CONTROLLER_STATUS, QoS::AtLeastOnce, true, "online")
        .await
        .context("failed to publish controller online status")?;
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, message.topic, message.payload.to_vec())
                            .await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

fn spawn_state_publish_loop(app_state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;

            match serde_json::to_vec(&app_state.controller.status()) {
                Ok(body) => {
                    if let Err(err) = app_state
                        .mqtt
                        .publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
                        .await
                    {
                        warn!("controller state publish failed: {err}");
                    }
                }
                Err(err) => warn!("controller state serialization failed: {err}"),
            }
        }
    });
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: String,
    payload: Vec<u8>,
) -> anyhow::Result<()> {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    match topic.as_str() {
        TOPIC_CMD_START => {
            let command: StartCommand =
                serde_json::from_slice(&payload).context("invalid start command payload")?;
            let request = command.into_request()?;
            start_session(app_state, request).await?;
        }
        TOPIC_CMD_PAUSE => app_state.controller.pause().await,
        TOPIC_CMD_RESUME => app_state.controller.resume().await,
        TOPIC_CMD_STOP => app_state.controller.stop().await,
        _ => {}
    }

    Ok(())
}

/// Starts or resumes a session and snapshots the ledger when a new record
/// was appended.
async fn start_session(
    app_state: &AppState,
    request: StartRequest,
) -> Result<StartOutcome, SessionError> {
    let outcome = app_state
        .controller
        .start(request.duration_secs, request.power, request.stage)
        .await?;

    if matches!(outcome, StartOutcome::Started(_)) {
        let ledger = app_state.controller.ledger_snapshot();
        if let Err(err) = app_state.store.save_history(&ledger).await {
            warn!("failed to persist cooking history: {err:#}");
        }
    }

    Ok(outcome)
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.controller.status())
}

async fn handle_start(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let request = match parse_start_params(&params) {
        Ok(request) => request,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    if let Err(err) = start_session(&state, request).await {
        return session_error_response(err);
    }

    handle_get_status(State(state)).await.into_response()
}

async fn handle_pause(State(state): State<AppState>) -> impl IntoResponse {
    state.controller.pause().await;
    handle_get_status(State(state)).await.into_response()
}

async fn handle_resume(State(state): State<AppState>) -> impl IntoResponse {
    state.controller.resume().await;
    handle_get_status(State(state)).await.into_response()
}

async fn handle_stop(State(state): State<AppState>) -> impl IntoResponse {
    state.controller.stop().await;
    handle_get_status(State(state)).await.into_response()
}

async fn handle_get_defrost(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let food = params.get("food").cloned().unwrap_or_default();
    let thickness = params.get("thickness").cloned().unwrap_or_default();
    let Some(weight) = params.get("weight") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'weight' parameter");
    };
    let Ok(weight_grams) = weight.parse::<f64>() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid weight value");
    };

    let seconds = state
        .controller
        .defrost_seconds(&food, &thickness, weight_grams);
    Json(DefrostResponse {
        food,
        thickness,
        weight_grams,
        seconds,
    })
    .into_response()
}

async fn handle_get_history(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let oldest_first = params
        .get("order")
        .is_some_and(|order| order.eq_ignore_ascii_case("oldest"));

    let records: Vec<HistoryRecord> = if oldest_first {
        state.controller.history()
    } else {
        state.controller.history_newest_first()
    };
    Json(records)
}

async fn handle_get_power_levels() -> impl IntoResponse {
    let levels: Vec<PowerLevelView> = PowerLevel::PRESETS
        .into_iter()
        .map(|level| PowerLevelView {
            label: level.label(),
            percent: level.percent(),
        })
        .collect();
    Json(levels)
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("MICROWAVE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.microwave"));

        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
            history_path: Arc::new(data_dir.join("history.json")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_history(&self) -> anyhow::Result<HistoryLedger> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.history_path.as_ref()).await {
            Ok(raw) => {
                let records = serde_json::from_slice::<Vec<HistoryRecord>>(&raw)?;
                Ok(HistoryLedger::from_records(records))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HistoryLedger::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_history(&self, ledger: &HistoryLedger) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.history_path.as_ref().clone();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(ledger)?;
        tokio::fs::write(path, payload).await?;
        Ok(())
    }
}

fn parse_start_params(params: &HashMap<String, String>) -> Result<StartRequest, String> {
    let Some(duration) = params.get("duration") else {
        return Err("Missing 'duration' parameter".to_string());
    };
    let Ok(duration) = duration.trim().parse::<i64>() else {
        return Err("Invalid duration value".to_string());
    };

    let command = StartCommand {
        duration,
        power: params.get("power").cloned().map(PowerField::Label),
        stage: params.get("stage").cloned(),
    };
    command.into_request().map_err(|err| err.to_string())
}

/// Negative or oversized durations collapse to zero so the controller
/// reports them as invalid.
fn duration_from_raw(raw: i64) -> u32 {
    u32::try_from(raw).unwrap_or(0)
}

fn session_error_response(err: SessionError) -> axum::response::Response {
    let status = match err {
        SessionError::AlreadyRunning => StatusCode::CONFLICT,
        SessionError::InvalidDuration => StatusCode::BAD_REQUEST,
        SessionError::NoActiveSession => StatusCode::CONFLICT,
        SessionError::TickFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
