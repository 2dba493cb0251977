//! HTTP client for the `todo-server` document API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::{Filter, StoreError, TodoPatch, TodoQuery, TodoStore};
use crate::identity::Identity;
use crate::item::{NewTodo, TodoId, TodoItem};

/// Header carrying the caller's user id
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the caller's display name
pub const USER_NAME_HEADER: &str = "x-user-name";
/// Header carrying the caller's comma-separated role claims
pub const USER_ROLES_HEADER: &str = "x-user-roles";
/// Optional header scoping the whole-list fallback board
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// Error body returned by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct RevisionBody {
    revision: u64,
}

/// Store backed by a remote `todo-server`.
///
/// Requests are sent as whoever the identity watch currently reports, so a
/// sign-in switch takes effect on the next call.
pub struct HttpStore {
    client: Client,
    base_url: String,
    identity: watch::Receiver<Option<Identity>>,
}

impl HttpStore {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        identity: watch::Receiver<Option<Identity>>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Refuse to act for `owner_id` unless they are the signed-in caller.
    /// Headers are built from the identity at send time, so a request
    /// prepared for one user must not go out after a switch to another.
    fn require_caller(&self, owner_id: &str) -> Result<(), StoreError> {
        let caller = self.identity.borrow().as_ref().map(|i| i.id.clone());
        match caller {
            Some(caller) if caller == owner_id => Ok(()),
            Some(caller) => Err(StoreError::Forbidden(format!(
                "{caller} cannot act for {owner_id}"
            ))),
            None => Err(StoreError::Unauthorized),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let identity = self.identity.borrow().clone();
        let identity = identity.ok_or(StoreError::Unauthorized)?;
        let roles = identity
            .roles
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(",");

        Ok(request
            .header(USER_ID_HEADER, identity.id)
            .header(USER_NAME_HEADER, identity.name)
            .header(USER_ROLES_HEADER, roles))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorize(request)?.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);

        Err(match status {
            StatusCode::UNAUTHORIZED => StoreError::Unauthorized,
            StatusCode::FORBIDDEN => StoreError::Forbidden(message),
            _ => StoreError::Rejected {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn not_found_as(id: &TodoId, err: StoreError) -> StoreError {
    match err {
        StoreError::Rejected { status: 404, .. } => StoreError::NotFound(id.clone()),
        other => other,
    }
}

#[async_trait]
impl TodoStore for HttpStore {
    async fn create(&self, todo: NewTodo) -> Result<TodoItem, StoreError> {
        self.require_caller(&todo.owner_id)?;
        let request = self.client.post(self.url("/api/todos")).json(&todo);
        Ok(self.send(request).await?.json().await?)
    }

    async fn get(&self, id: &TodoId) -> Result<Option<TodoItem>, StoreError> {
        let request = self.client.get(self.url(&format!("/api/todos/{id}")));
        match self.send(request).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(StoreError::Rejected { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update(&self, id: &TodoId, patch: TodoPatch) -> Result<(), StoreError> {
        let request = self
            .client
            .patch(self.url(&format!("/api/todos/{id}")))
            .json(&patch);
        self.send(request)
            .await
            .map(|_| ())
            .map_err(|e| not_found_as(id, e))
    }

    async fn delete(&self, id: &TodoId) -> Result<(), StoreError> {
        let request = self.client.delete(self.url(&format!("/api/todos/{id}")));
        match self.send(request).await {
            Ok(_) | Err(StoreError::Rejected { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn query(&self, query: &TodoQuery) -> Result<Vec<TodoItem>, StoreError> {
        let path = match &query.filter {
            Filter::Owner(owner) => {
                self.require_caller(owner)?;
                "/api/todos"
            }
            Filter::All => "/api/admin/todos",
        };

        let request = self
            .client
            .get(self.url(path))
            .query(&[("order", query.order.as_str())]);
        Ok(self.send(request).await?.json().await?)
    }

    async fn revision(&self, owner_id: &str) -> Result<Option<u64>, StoreError> {
        self.require_caller(owner_id)?;
        let request = self.client.get(self.url("/api/todos/revision"));
        let body: RevisionBody = self.send(request).await?.json().await?;
        Ok(Some(body.revision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityWatch;

    #[test]
    fn base_url_drops_trailing_slash() {
        let watch = IdentityWatch::new();
        let store =
            HttpStore::new("http://127.0.0.1:9/", Duration::from_secs(1), watch.subscribe())
                .unwrap();
        assert_eq!(store.base_url(), "http://127.0.0.1:9");
        assert_eq!(store.url("/api/todos"), "http://127.0.0.1:9/api/todos");
    }

    #[tokio::test]
    async fn signed_out_requests_are_unauthorized() {
        let watch = IdentityWatch::new();
        let store =
            HttpStore::new("http://127.0.0.1:9", Duration::from_secs(1), watch.subscribe())
                .unwrap();
        let err = store.revision("u1").await.unwrap_err();
        assert_eq!(err, StoreError::Unauthorized);
    }

    #[tokio::test]
    async fn listing_someone_else_is_refused_locally() {
        let watch = IdentityWatch::new();
        watch.sign_in(Identity::new("u1", "Ada"));
        let store =
            HttpStore::new("http://127.0.0.1:9", Duration::from_secs(1), watch.subscribe())
                .unwrap();
        let err = store.query(&TodoQuery::owned_by("u2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
        let err = store.revision("u2").await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn create_for_someone_else_is_never_sent() {
        let watch = IdentityWatch::new();
        watch.sign_in(Identity::new("u-bob", "Bob"));
        // nothing listens on port 9; a sent request would fail as Unavailable
        let store =
            HttpStore::new("http://127.0.0.1:9", Duration::from_secs(1), watch.subscribe())
                .unwrap();

        let fields = crate::validation::Draft::time_range("Ada's secret", "Work", "09:00", "10:00")
            .validate(chrono::Utc::now())
            .unwrap();
        let todo = NewTodo::from_fields(fields, "u-ada", "Ada", chrono::Utc::now());

        let err = store.create(todo).await.unwrap_err();
        assert!(matches!(err, StoreError::Forbidden(_)));
    }
}
