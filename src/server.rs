use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{
        Html,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::WatchStream;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::AppState;
use crate::backend::HttpChatBackend;
use crate::chat::{Message, ViewOptions, ViewStore};
use crate::config::AppConfig;
use crate::ui::{render_message_list, render_page};

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let backend = HttpChatBackend::with_connect_timeout(
        &config.backend.endpoint,
        config.backend.connect_timeout(),
    )?
    .session_header(config.backend.session_header.clone());

    info!(
        name: "backend.config.loaded",
        endpoint = %backend.endpoint(),
        session_header = %config.backend.session_header,
        "Chat backend configured"
    );

    let options = ViewOptions {
        attach_grace: config.server.attach_grace(),
        ..ViewOptions::from(&config.ui)
    };
    let state = AppState {
        views: ViewStore::new(Arc::new(backend), options),
        ui: Arc::new(config.ui.clone()),
    };

    let app = router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.views))
        .await?;
    Ok(())
}

/// Build the router for the chat page and its view routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/views/{id}/send", post(send_handler))
        .route("/views/{id}/cancel", post(cancel_handler))
        .route("/views/{id}/events", get(events_handler))
        .route("/views/{id}/messages", get(messages_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wait for Ctrl+C, then tear down every view so open event streams end.
async fn shutdown_signal(views: ViewStore) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    let closed = views.close_all();
    info!(name: "server.shutdown", views = closed, "Shutting down");
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - open a new chat view and render its page.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let view = state.views.create();
    debug!(view = %view.id(), "Chat view opened");
    // Pages that never open their event stream must not keep the view.
    drop(state.views.expire_if_unattached(view.id()));
    Html(render_page(view.id(), &view.snapshot(), &state.ui))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Form body for a send.
#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    draft: String,
}

/// POST /views/{id}/send - submit the draft.
///
/// `202` when a stream was started, `204` when the draft was blank.
async fn send_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SendForm>,
) -> StatusCode {
    let Some(view) = state.views.get(&id) else {
        return StatusCode::NOT_FOUND;
    };

    match view.submit_draft(form.draft) {
        Some(_cycle) => {
            debug!(view = %id, "Draft accepted");
            StatusCode::ACCEPTED
        }
        None => StatusCode::NO_CONTENT,
    }
}

/// POST /views/{id}/cancel - stop the active stream.
async fn cancel_handler(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.views.get(&id) {
        Some(view) => {
            if view.cancel_active() {
                debug!(view = %id, "Active stream cancelled by user");
            }
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Conversation snapshot for API responses.
#[derive(Debug, Serialize)]
struct ConversationDto {
    session_id: Option<String>,
    streaming: bool,
    messages: Vec<Message>,
}

/// GET /views/{id}/messages
async fn messages_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationDto>, StatusCode> {
    let view = state.views.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(ConversationDto {
        session_id: view.session_id(),
        streaming: view.is_streaming(),
        messages: view.snapshot().to_vec(),
    }))
}

/// Closes the view when the page's event stream goes away.
struct ViewGuard {
    views: ViewStore,
    id: String,
}

impl Drop for ViewGuard {
    fn drop(&mut self) {
        if self.views.close(&self.id).is_some() {
            debug!(view = %self.id, "Chat view closed");
        }
    }
}

/// GET /views/{id}/events - rendered message list on connect and on every
/// change, plus the streaming status.
async fn events_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, StatusCode> {
    let view = state.views.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let mut updates = WatchStream::new(view.subscribe());
    let guard = ViewGuard {
        views: state.views.clone(),
        id,
    };

    let stream = async_stream::stream! {
        let _guard = guard;
        let closed = view.closed();
        tokio::pin!(closed);
        loop {
            let conversation = tokio::select! {
                next = updates.next() => match next {
                    Some(conversation) => conversation,
                    None => break,
                },
                () = &mut closed => break,
            };
            let streaming = view.is_streaming();
            let html = render_message_list(&conversation);

            // SSE cannot carry carriage returns.
            yield Ok(Event::default().event("messages").data(html.replace('\r', "")));
            yield Ok(Event::default()
                .event("status")
                .data(if streaming { "streaming" } else { "idle" }));
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
