//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use todo_core::{
    AdminView, Category, NewTodo, Schedule, SortOrder, TodoId, TodoItem, TodoPatch, TodoQuery,
    TodoStore, ValidationError,
};

use crate::auth::{CurrentUser, SessionKey};
use crate::error::ApiError;
use crate::AppState;

/// Query string of the listing endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub order: Option<SortOrder>,
}

/// Body of `POST /api/todos`. The owner is always the caller; an `ownerId`
/// naming someone else is refused.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    pub text: String,
    pub category: Category,
    pub schedule: Schedule,
    #[serde(default)]
    pub completed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub owner_id: Option<String>,
}

impl CreateTodoRequest {
    fn check_owner(&self, caller: &str) -> Result<(), ApiError> {
        match self.owner_id.as_deref() {
            Some(owner) if owner != caller => Err(ApiError::Forbidden(format!(
                "{caller} cannot create items for {owner}"
            ))),
            _ => Ok(()),
        }
    }

    fn check(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::EmptyText);
        }
        if self.category.label().trim().is_empty() {
            return Err(ValidationError::EmptyCategory);
        }
        if let Schedule::TimeRange {
            start_time,
            end_time,
        } = &self.schedule
        {
            if start_time >= end_time {
                return Err(ValidationError::InvertedTimeRange);
            }
        }
        Ok(())
    }
}

/// Body of `POST /api/todo`
#[derive(Debug, Deserialize)]
pub struct ReplaceBoardRequest {
    pub todo: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct RevisionResponse {
    pub revision: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdatedResponse {
    /// Milliseconds since the Unix epoch
    pub last_updated: i64,
}

async fn owned_item(state: &AppState, user: &CurrentUser, id: TodoId) -> Result<TodoItem, ApiError> {
    match state.store.get(&id).await? {
        Some(item) if item.owner_id == user.0.id => Ok(item),
        _ => Err(ApiError::NotFound(id)),
    }
}

/// List the caller's items
pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let mut query = TodoQuery::owned_by(user.0.id.as_str());
    query.order = params.order.unwrap_or_default();
    Ok(Json(state.store.query(&query).await?))
}

/// Create an item owned by the caller
pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Json(request): Json<CreateTodoRequest>,
) -> Result<(StatusCode, Json<TodoItem>), ApiError> {
    request.check_owner(&user.0.id)?;
    request
        .check()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let CurrentUser(identity) = user;
    let todo = NewTodo {
        text: request.text.trim().to_string(),
        category: request.category,
        schedule: request.schedule,
        completed: request.completed,
        owner_id: identity.id,
        owner_name: identity.name,
        created_at: request.created_at.unwrap_or_else(Utc::now),
    };

    let item = state.store.create(todo).await?;
    tracing::debug!("created {} for {}", item.id, item.owner_id);
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_todo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<TodoItem>, ApiError> {
    Ok(Json(owned_item(&state, &user, TodoId::from(id)).await?))
}

/// Apply a patch and return the updated item
pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(patch): Json<TodoPatch>,
) -> Result<Json<TodoItem>, ApiError> {
    let mut item = owned_item(&state, &user, TodoId::from(id)).await?;
    state.store.update(&item.id, patch.clone()).await?;
    patch.apply(&mut item);
    Ok(Json(item))
}

pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let item = owned_item(&state, &user, TodoId::from(id)).await?;
    state.store.delete(&item.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change token of the caller's items, for cheap polling
pub async fn get_revision(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<RevisionResponse>, ApiError> {
    let revision = state.store.revision(&user.0.id).await?.unwrap_or_default();
    Ok(Json(RevisionResponse { revision }))
}

/// Every owner's items by owner name; administrators only
pub async fn list_all_todos(
    State(state): State<Arc<AppState>>,
    CurrentUser(identity): CurrentUser,
) -> Result<Json<Vec<TodoItem>>, ApiError> {
    let view = AdminView::load(state.store.as_ref(), &identity).await?;
    Ok(Json(view.items))
}

/// Read the caller's board
pub async fn get_board(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
) -> Json<Vec<serde_json::Value>> {
    Json(state.boards.get(&key).await)
}

/// Replace the caller's board
pub async fn replace_board(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
    Json(request): Json<ReplaceBoardRequest>,
) -> Json<serde_json::Value> {
    let count = request.todo.len();
    state.boards.replace(&key, request.todo).await;
    tracing::debug!("board {} replaced with {} items", key, count);
    Json(serde_json::json!({ "message": "Todo list saved" }))
}

pub async fn get_board_last_updated(
    State(state): State<Arc<AppState>>,
    SessionKey(key): SessionKey,
) -> Json<LastUpdatedResponse> {
    let last_updated = state.boards.last_updated(&key).await.timestamp_millis();
    Json(LastUpdatedResponse { last_updated })
}

/// Liveness and counts
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let revision = state.store.latest_revision().await;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "todos": state.store.len().await,
        "boards": state.boards.len().await,
        "revision": revision
    })))
}
