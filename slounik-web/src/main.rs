//! Axum service exposing the annotator over HTTP and WebSocket

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use slounik_core::{
    conllu,
    corpus::{demo_texts, sample_lexicon},
    AnnotatorConfig, Annotator, LexiconStore, OutputMode, PipelineEvent, SlounikError,
    SqliteLexicon,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

struct AppState {
    annotator: Annotator,
    /// Default for requests that do not say whether to run the extended rules
    extended: bool,
}

#[derive(Deserialize)]
struct AnnotateRequest {
    text: String,
    #[serde(default)]
    extended: Option<bool>,
}

#[derive(Deserialize)]
struct CompleteRequest {
    conllu: String,
    #[serde(default)]
    extended: Option<bool>,
}

/// WebSocket message sent by the client
#[derive(Deserialize)]
struct WsRequest {
    text: String,
    #[serde(default)]
    extended: Option<bool>,
    #[serde(default)]
    tabular: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match std::env::var("SLOUNIK_CONFIG") {
        Ok(path) => AnnotatorConfig::load(&path)?,
        Err(_) => AnnotatorConfig::default(),
    };

    let lexicon: Arc<dyn LexiconStore> = match &config.database {
        Some(path) => {
            info!(path = %path.display(), "opening lexicon database");
            Arc::new(SqliteLexicon::open(path)?)
        }
        None => {
            warn!("no database configured, serving the built-in sample lexicon");
            Arc::new(sample_lexicon())
        }
    };

    let annotator = Annotator::with_config(lexicon, &config)?;
    info!(stop_words = annotator.stop_words().len(), "annotator ready");
    let state = Arc::new(AppState {
        annotator,
        extended: config.extended,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/annotate", post(annotate_handler))
        .route("/conllu", post(conllu_handler))
        .route("/complete", post(complete_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .layer(cors)
        .with_state(state);

    let addr = std::env::var("SLOUNIK_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("annotator listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_handler() -> impl IntoResponse {
    Html(
        "<!doctype html><meta charset=\"utf-8\"><title>slounik</title>\
         <p>POST /annotate, POST /conllu, POST /complete, GET /ws, GET /demo-texts</p>",
    )
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

impl AppState {
    fn extended(&self, requested: Option<bool>) -> bool {
        requested.unwrap_or(self.extended)
    }
}

/// Runs a blocking annotation pass off the async runtime.
async fn run_blocking<T, F>(state: &Arc<AppState>, job: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&Annotator) -> Result<T, SlounikError> + Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || job(&state.annotator)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err @ SlounikError::LexiconUnavailable(_))) => {
            Err(error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()))
        }
        Ok(Err(err)) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
        Err(err) => Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}

/// Tree-mode annotation
async fn annotate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnnotateRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty text");
    }
    let extended = state.extended(req.extended);
    match run_blocking(&state, move |annotator| {
        annotator.annotate_text(&req.text, OutputMode::Tree, extended)
    })
    .await
    {
        Ok(document) => Json(document).into_response(),
        Err(response) => response,
    }
}

/// Tabular annotation, returned as CoNLL-U text
async fn conllu_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnnotateRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty text");
    }
    let extended = state.extended(req.extended);
    match run_blocking(&state, move |annotator| {
        annotator
            .annotate_text(&req.text, OutputMode::Tabular, extended)
            .map(|document| conllu::encode(&document))
    })
    .await
    {
        Ok(text) => plain_text(text),
        Err(response) => response,
    }
}

/// Fills the unknown rows of an existing CoNLL-U document
async fn complete_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompleteRequest>,
) -> Response {
    if req.conllu.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty document");
    }
    let extended = state.extended(req.extended);
    match run_blocking(&state, move |annotator| {
        Ok(conllu::complete(annotator, &req.conllu, extended))
    })
    .await
    {
        Ok(text) => plain_text(text),
        Err(response) => response,
    }
}

fn plain_text(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(title, text)| {
            serde_json::json!({
                "title": title,
                "text": text
            })
        })
        .collect();
    Json(texts)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Receives texts and answers each one with the pipeline event stream.
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("websocket connected");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // JSON {text, extended, tabular}, or the raw text itself
                let (text, extended, mode) = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(req) => {
                        let mode = if req.tabular {
                            OutputMode::Tabular
                        } else {
                            OutputMode::Tree
                        };
                        (req.text.trim().to_string(), state.extended(req.extended), mode)
                    }
                    Err(_) => (text.trim().to_string(), state.extended, OutputMode::Tree),
                };

                if text.is_empty() {
                    continue;
                }

                info!(chars = text.chars().count(), ?mode, extended, "annotating via websocket");

                let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                let worker = Arc::clone(&state);
                let handle = tokio::task::spawn_blocking(move || {
                    worker.annotator.annotate_streaming(&text, mode, extended, tx);
                });
                if let Err(err) = handle.await {
                    warn!(%err, "annotation task failed");
                    continue;
                }

                let events: Vec<PipelineEvent> = rx.try_iter().collect();
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return;
                        }
                        tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
                    }
                }
            }
            Message::Close(_) => {
                info!("websocket disconnected");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}
