pub mod templates;

use crate::commands::{self, Render, Services};
use crate::doc_processor::UploadedDocument;
use crate::error::AppError;
use crate::session::SessionContext;
use axum::{
    extract::{DefaultBodyLimit, Form, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use templates::{Notice, PageView};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// The session context is shared by every request. Holding the lock for a
/// whole interaction keeps interactions strictly serial.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<Mutex<SessionContext>>,
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            context: Arc::new(Mutex::new(SessionContext::new())),
            services: Arc::new(services),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/process", post(process_handler))
        .route("/ask", post(ask_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr, max_upload_bytes: usize) -> anyhow::Result<()> {
    let app = router(state, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("pdf-chat listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

fn page(status: StatusCode, render: &Render, notice: Option<Notice>, ready: bool) -> Response {
    let view = PageView {
        history: &render.history,
        notice,
        ready,
    };
    (status, Html(templates::render_page(&view))).into_response()
}

/// Re-render the current state with the error banner; the process carries on.
fn error_page(ctx: &SessionContext, err: &AppError) -> Response {
    let status = err.status_code();
    if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
        tracing::error!("{}", err);
    } else {
        tracing::warn!("{}", err);
    }
    page(
        status,
        &Render::from_context(ctx),
        Some(Notice::error(err.to_string())),
        ctx.is_ready(),
    )
}

async fn index_handler(State(state): State<AppState>) -> Response {
    let ctx = state.context.lock().await;
    page(StatusCode::OK, &Render::from_context(&ctx), None, ctx.is_ready())
}

async fn process_handler(State(state): State<AppState>, multipart: Multipart) -> Response {
    let mut ctx = state.context.lock().await;

    let documents = match read_documents(multipart).await {
        Ok(documents) => documents,
        Err(e) => return error_page(&ctx, &e),
    };

    match commands::process_documents(&mut ctx, &state.services, documents).await {
        Ok(render) => {
            let notice = render.status.clone().map(Notice::info);
            page(StatusCode::OK, &render, notice, ctx.is_ready())
        }
        Err(e) => error_page(&ctx, &e),
    }
}

/// Collect every uploaded file from the `documents` field. Browsers send an
/// empty part when nothing was selected; those are skipped.
async fn read_documents(mut multipart: Multipart) -> Result<Vec<UploadedDocument>, AppError> {
    let mut documents = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("documents") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if filename.is_empty() && bytes.is_empty() {
            continue;
        }
        documents.push(UploadedDocument::new(filename, bytes.to_vec()));
    }
    Ok(documents)
}

async fn ask_handler(State(state): State<AppState>, Form(form): Form<AskForm>) -> Response {
    let mut ctx = state.context.lock().await;
    match commands::ask_question(&mut ctx, &form.question).await {
        Ok(render) => page(StatusCode::OK, &render, None, ctx.is_ready()),
        Err(e) => error_page(&ctx, &e),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ctx = state.context.lock().await;
    let turns = ctx.session().map(|s| s.history().len()).unwrap_or(0);
    let chunks = ctx.session().map(|s| s.index().len()).unwrap_or(0);
    Json(json!({
        "status": "ok",
        "ready": ctx.is_ready(),
        "turns": turns,
        "chunks": chunks,
    }))
}
