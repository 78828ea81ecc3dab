#![cfg(feature = "web-api")]

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;

use deck_core::catalog::{self, Template};
use deck_core::script::{NewScript, Script, ScriptExport, ScriptPatch};
use deck_core::stats::{recently_run, Stats};
use crate::deck::SharedDeck;
use crate::module::{Module, ModuleCtx};

#[derive(Clone)]
struct AppState {
    deck: SharedDeck,
    started: Instant,
}

#[derive(Serialize)]
struct Status {
    scripts: usize,
    running: usize,
    pending_steps: usize,
    uptime_ms: u64,
}

#[derive(Serialize)]
struct Dashboard<'a> {
    #[serde(flatten)]
    stats: Stats,
    recent: Vec<&'a Script>,
}

pub struct WebServer {
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(addr: SocketAddr) -> Self { Self { addr } }
}

impl Module for WebServer {
    fn name(&self) -> &'static str {
        "web"
    }

    fn spawn(self: Box<Self>, ctx: ModuleCtx) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            let app = router(ctx.deck.clone());
            let listener = tokio::net::TcpListener::bind(self.addr).await?;
            info!("web http listening on http://{}", self.addr);

            let mut shutdown = ctx.shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.changed().await;
                })
                .await?;
            Ok(())
        })
    }
}

pub fn router(deck: SharedDeck) -> Router {
    let state = AppState { deck, started: Instant::now() };
    Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/scripts", get(scripts_list).post(scripts_add).delete(scripts_reset))
        .route("/scripts/import", post(scripts_import))
        .route("/scripts/:id", get(scripts_get).patch(scripts_update).delete(scripts_delete))
        .route("/scripts/:id/run", post(scripts_run))
        .route("/scripts/:id/logs", get(logs_get).delete(logs_clear))
        .route("/scripts/:id/export", get(scripts_export))
        .route("/templates", get(templates_list))
        .route("/templates/:id", post(templates_use))
        .with_state(state)
}

fn not_found(id: &str) -> axum::response::Response {
    let body = Json(json!({"error": format!("script {id} not found")}));
    (StatusCode::NOT_FOUND, body).into_response()
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let deck = state.deck.lock().await;
    let stats = Stats::collect(deck.store.list(), Utc::now());
    Json(Status {
        scripts: stats.total,
        running: stats.running,
        pending_steps: deck.sim.pending(),
        uptime_ms: state.started.elapsed().as_millis() as u64,
    })
}

async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let deck = state.deck.lock().await;
    let scripts = deck.store.list();
    let body = json!(Dashboard {
        stats: Stats::collect(scripts, Utc::now()),
        recent: recently_run(scripts),
    });
    Json(body)
}

async fn scripts_list(State(state): State<AppState>) -> impl IntoResponse {
    let deck = state.deck.lock().await;
    Json(deck.store.list().to_vec())
}

async fn scripts_add(
    State(state): State<AppState>,
    Json(body): Json<NewScript>,
) -> impl IntoResponse {
    let mut deck = state.deck.lock().await;
    let script = deck.store.add(body);
    deck.report_persist_error();
    (StatusCode::CREATED, Json(script))
}

async fn scripts_import(
    State(state): State<AppState>,
    Json(doc): Json<ScriptExport>,
) -> impl IntoResponse {
    let mut deck = state.deck.lock().await;
    let script = deck.store.import(doc);
    deck.report_persist_error();
    (StatusCode::CREATED, Json(script))
}

async fn scripts_get(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    let deck = state.deck.lock().await;
    match deck.store.get(&id) {
        Some(s) => Json(s.clone()).into_response(),
        None => not_found(&id),
    }
}

async fn scripts_update(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(patch): Json<ScriptPatch>,
) -> impl IntoResponse {
    let mut deck = state.deck.lock().await;
    if !deck.store.update(&id, patch) {
        return not_found(&id);
    }
    deck.report_persist_error();
    match deck.store.get(&id) {
        Some(s) => Json(s.clone()).into_response(),
        None => not_found(&id),
    }
}

async fn scripts_delete(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let mut deck = state.deck.lock().await;
    if !deck.store.delete(&id) {
        return not_found(&id);
    }
    deck.report_persist_error();
    Json(json!({ "deleted": true })).into_response()
}

async fn scripts_reset(State(state): State<AppState>) -> impl IntoResponse {
    let mut deck = state.deck.lock().await;
    deck.reset();
    info!(scripts = deck.store.len(), "store reset");
    Json(deck.store.list().to_vec())
}

async fn scripts_run(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    match state.deck.run(&id).await {
        Some(s) => (StatusCode::ACCEPTED, Json(s)).into_response(),
        None => not_found(&id),
    }
}

async fn logs_get(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    let deck = state.deck.lock().await;
    if deck.store.get(&id).is_none() {
        return not_found(&id);
    }
    Json(deck.store.logs(&id).to_vec()).into_response()
}

async fn logs_clear(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    let mut deck = state.deck.lock().await;
    if deck.store.get(&id).is_none() {
        return not_found(&id);
    }
    deck.store.clear_logs(&id);
    deck.report_persist_error();
    Json(json!({ "ok": true })).into_response()
}

async fn scripts_export(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let doc = match state.deck.lock().await.store.export(&id) {
        Ok(doc) => doc,
        Err(_) => return not_found(&id),
    };
    let body = match doc.to_json() {
        Ok(body) => body,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };
    let disposition = format!("attachment; filename=\"{}\"", doc.file_name());
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

async fn templates_list() -> impl IntoResponse {
    Json(catalog::TEMPLATES.to_vec())
}

async fn templates_use(Path(id): Path<String>, State(state): State<AppState>) -> impl IntoResponse {
    let Some(template) = catalog::template(&id) else {
        let body = Json(json!({"error": format!("template {id} not found")}));
        return (StatusCode::NOT_FOUND, body).into_response();
    };
    let mut deck = state.deck.lock().await;
    let script = deck.store.add(Template::instantiate(template));
    deck.report_persist_error();
    (StatusCode::CREATED, Json(script)).into_response()
}
