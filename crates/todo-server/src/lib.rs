//! Todo Server - Document store API
//!
//! HTTP service holding every user's todo items, the admin listing and the
//! per-session whole-list boards.

pub mod auth;
pub mod board;
pub mod error;
pub mod http;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use todo_core::InMemoryStore;

use crate::board::Boards;

/// Shared application state
pub struct AppState {
    pub store: Arc<InMemoryStore>,
    pub boards: Boards,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    /// Create around an existing store
    pub fn with_store(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            boards: Boards::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Per-item document endpoints
        .route(
            "/api/todos",
            get(http::list_todos).post(http::create_todo),
        )
        .route("/api/todos/revision", get(http::get_revision))
        .route(
            "/api/todos/{id}",
            get(http::get_todo)
                .patch(http::update_todo)
                .delete(http::delete_todo),
        )
        // Admin endpoints
        .route("/api/admin/todos", get(http::list_all_todos))
        // Whole-list fallback endpoints
        .route(
            "/api/todo",
            get(http::get_board).post(http::replace_board),
        )
        .route("/api/todo/last-updated", get(http::get_board_last_updated))
        // System endpoints
        .route("/status", get(http::get_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Todo server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
