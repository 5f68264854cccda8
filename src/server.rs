use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::{broadcast, Mutex};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

use crate::{DeclineConfig, DeclineError, NarrativeGenerator, TrendAnalysis, TrendOrchestrator};

use crate::api::{
    ApiAnalysisRequest, ApiAnalysisResponse, ApiEarlyWarningResponse, ApiFailure,
    ApiNarrativeResponse, ApiScenariosResponse, ApiSimulationRequest, ApiSimulationResponse,
};

#[derive(Clone)]
struct AppState {
    orchestrator: Arc<TrendOrchestrator>,
    narrative: NarrativeGenerator,
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<StreamEvent>>>>,
    channel_ttl: Duration,
}

#[derive(Clone, Serialize)]
struct StreamEvent {
    event: String,
    message: String,
    timestamp_ms: u128,
}

#[derive(serde::Deserialize)]
struct StreamQuery {
    request_id: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    ai_narrative: bool,
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

const CHANNEL_TTL: Duration = Duration::from_secs(10);

/// Builds the API router. Requests that miss every API route fall through to
/// static files under `web_root`.
pub fn router(config: &DeclineConfig, web_root: &str) -> Result<Router, DeclineError> {
    let orchestrator = TrendOrchestrator::from_config(config)?;
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        narrative: NarrativeGenerator::from_config(&config.narrative),
        channels: Arc::new(Mutex::new(HashMap::new())),
        channel_ttl: CHANNEL_TTL,
    };

    let index_path = format!("{}/index.html", web_root.trim_end_matches('/'));
    let static_service = ServeDir::new(web_root).not_found_service(ServeFile::new(index_path));

    Ok(Router::new()
        .route("/api/health", get(health))
        .route("/api/trend-analysis", post(analysis_handler))
        .route("/api/early-warning", post(early_warning_handler))
        .route("/api/trend-narrative", post(narrative_handler))
        .route("/api/trend-narrative/stream", get(stream_handler))
        .route("/api/simulate-recovery", post(simulate_handler))
        .route("/api/scenarios", post(scenarios_handler))
        .nest_service("/", static_service)
        .with_state(state))
}

pub async fn serve(host: &str, port: u16, web_root: &str, config: DeclineConfig) -> Result<(), String> {
    let app = router(&config, web_root).map_err(|err| err.to_string())?;

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;

    info!(%addr, "serving decline API");
    axum::serve(tokio::net::TcpListener::bind(addr).await.map_err(|err| {
        format!("failed to bind server: {}", err)
    })?, app)
    .await
    .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "trend-decline",
        ai_narrative: state.narrative.is_ai_enabled(),
    })
}

async fn analysis_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiAnalysisRequest>,
) -> Response {
    let request_id = request_id(&request.request_id);
    match run_analysis(&state, request) {
        Ok(analysis) => Json(ApiAnalysisResponse::from_analysis(analysis, request_id)).into_response(),
        Err(err) => failure(err, request_id),
    }
}

async fn early_warning_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiAnalysisRequest>,
) -> Response {
    let request_id = request_id(&request.request_id);
    match run_analysis(&state, request) {
        Ok(analysis) => {
            Json(ApiEarlyWarningResponse::from_analysis(analysis, request_id)).into_response()
        }
        Err(err) => failure(err, request_id),
    }
}

async fn narrative_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiAnalysisRequest>,
) -> Response {
    let request_id = request_id(&request.request_id);
    let sender = get_or_create_channel(&state, &request_id).await;
    send_event(&sender, "start", "Running trend analysis");

    let analysis = match run_analysis(&state, request) {
        Ok(analysis) => analysis,
        Err(err) => {
            send_event(&sender, "error", "Trend analysis failed");
            schedule_cleanup(&state, request_id.clone());
            return failure(err, request_id);
        }
    };

    if state.narrative.is_ai_enabled() {
        send_event(&sender, "calling", "Calling narrative model");
    } else {
        send_event(&sender, "template", "Narrative model not configured, using template");
    }
    let narrative = state.narrative.explain(&analysis.decline_prediction).await;
    send_event(&sender, "done", "Narrative complete");
    schedule_cleanup(&state, request_id.clone());

    Json(ApiNarrativeResponse::new(analysis, narrative, request_id)).into_response()
}

async fn simulate_handler(
    State(state): State<AppState>,
    Json(mut request): Json<ApiSimulationRequest>,
) -> Response {
    let request_id = request_id(&request.request_id);
    let scenario_name = request.scenario_name();
    let changes = request.parameter_changes.clone();

    let result = run_analysis(&state, request.analysis_request()).and_then(|analysis| {
        let simulation = state.orchestrator.simulate(&analysis, &changes, &scenario_name)?;
        Ok((analysis.trend_name, simulation))
    });
    match result {
        Ok((trend_name, simulation)) => {
            Json(ApiSimulationResponse::from_result(trend_name, simulation, request_id)).into_response()
        }
        Err(err) => failure(err, request_id),
    }
}

async fn scenarios_handler(
    State(state): State<AppState>,
    Json(request): Json<ApiAnalysisRequest>,
) -> Response {
    let request_id = request_id(&request.request_id);
    let result = run_analysis(&state, request).and_then(|analysis| {
        let comparison = state.orchestrator.run_scenarios(&analysis)?;
        Ok((analysis.trend_name, comparison))
    });
    match result {
        Ok((trend_name, comparison)) => Json(ApiScenariosResponse::from_comparison(
            trend_name, comparison, request_id,
        ))
        .into_response(),
        Err(err) => failure(err, request_id),
    }
}

async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>, StatusCode>
{
    let sender = get_or_create_channel(&state, &query.request_id).await;
    let receiver = sender.subscribe();
    // A stream with no matching narrative request must not pin its channel.
    schedule_cleanup(&state, query.request_id.clone());
    let stream = BroadcastStream::new(receiver).filter_map(|event| {
        match event {
            Ok(event) => {
                let data = serde_json::to_string(&event).unwrap_or_default();
                Some(Ok(Event::default().data(data)))
            }
            Err(_) => None,
        }
    });

    send_event(&sender, "connected", "Streaming narrative status");
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(8))))
}

fn run_analysis(state: &AppState, request: ApiAnalysisRequest) -> Result<TrendAnalysis, DeclineError> {
    let (input, trend_name) = request.into_input()?;
    state.orchestrator.analyze(&input, trend_name.as_deref())
}

fn failure(err: DeclineError, request_id: String) -> Response {
    let (status, label) = match &err {
        DeclineError::NoSignalsAvailable => (StatusCode::OK, "failed"),
        err if err.is_input_error() => (StatusCode::BAD_REQUEST, "error"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "error"),
    };
    warn!(request_id = %request_id, error = %err, "request failed");
    let body = ApiFailure {
        request_id,
        status: label,
        error: err.to_string(),
    };
    (status, Json(body)).into_response()
}

async fn get_or_create_channel(
    state: &AppState,
    request_id: &str,
) -> broadcast::Sender<StreamEvent> {
    let mut guard = state.channels.lock().await;
    if let Some(sender) = guard.get(request_id) {
        return sender.clone();
    }
    let (sender, _) = broadcast::channel(32);
    guard.insert(request_id.to_string(), sender.clone());
    sender
}

fn send_event(sender: &broadcast::Sender<StreamEvent>, event: &str, message: &str) {
    let _ = sender.send(StreamEvent {
        event: event.to_string(),
        message: message.to_string(),
        timestamp_ms: now_ms(),
    });
}

fn schedule_cleanup(state: &AppState, request_id: String) {
    let channels = state.channels.clone();
    let ttl = state.channel_ttl;
    tokio::spawn(async move {
        tokio::time::sleep(ttl).await;
        let mut guard = channels.lock().await;
        guard.remove(&request_id);
    });
}

fn request_id(supplied: &Option<String>) -> String {
    supplied
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(generate_request_id)
}

fn generate_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("req-{}-{}", now_ms(), counter)
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
