//! Handlers for the two event routes.
//!
//! The router decides which route an envelope takes; an [`EventProcessor`]
//! does the work. Implementations are injected through the application state
//! so tests can swap them out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::models::{UrlVerification, UserChangeRequest};
use crate::store::UserStore;
use crate::web::error::ApiError;
use crate::Config;

/// Work performed for a routed event. Both methods receive the raw body and
/// decode the payload shape they need.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// Answer a handshake, returning the challenge to echo back.
    async fn url_verification(&self, body: &[u8]) -> Result<String, ApiError>;

    /// Store the user carried by a `user_change` or `team_join` event.
    async fn user_change(&self, body: &[u8]) -> Result<(), ApiError>;
}

/// Processor that writes to the user directory.
pub struct DirectoryProcessor {
    config: Arc<Config>,
    store: Arc<dyn UserStore>,
}

impl DirectoryProcessor {
    pub fn new(config: Arc<Config>, store: Arc<dyn UserStore>) -> Self {
        Self { config, store }
    }
}

#[async_trait]
impl EventProcessor for DirectoryProcessor {
    async fn url_verification(&self, body: &[u8]) -> Result<String, ApiError> {
        let verification: UrlVerification = serde_json::from_slice(body).map_err(|e| {
            warn!(error = %e, "url_verification_decode_failed");
            ApiError::MalformedBody
        })?;

        // The router has checked the envelope token already; this payload is
        // checked on its own.
        if verification.token != self.config.verification_token {
            warn!(token = %verification.token, "url_verification_invalid_token");
            return Err(ApiError::InvalidToken);
        }

        info!(challenge_length = verification.challenge.len(), "url_verification_answered");
        Ok(verification.challenge)
    }

    async fn user_change(&self, body: &[u8]) -> Result<(), ApiError> {
        let request: UserChangeRequest = serde_json::from_slice(body).map_err(|e| {
            warn!(error = %e, "user_change_decode_failed");
            ApiError::MalformedBody
        })?;

        let user = request.event.user;
        if let Err(e) = self.store.upsert(&user).await {
            error!(user_id = %user.id, error = %e, "user_upsert_failed");
            return Err(ApiError::UpdateUser(e));
        }

        info!(user_id = %user.id, user_name = %user.name, "user_upserted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::store::{MockUserStore, StoreError};
    use mockall::predicate::eq;
    use serde_json::json;

    fn processor(store: MockUserStore) -> DirectoryProcessor {
        DirectoryProcessor::new(Arc::new(Config::for_tests()), Arc::new(store))
    }

    #[tokio::test]
    async fn test_url_verification_echoes_challenge() {
        let body = json!({
            "token": "test-token",
            "type": "url_verification",
            "challenge": "abc123"
        })
        .to_string();

        let challenge = processor(MockUserStore::new())
            .url_verification(body.as_bytes())
            .await
            .unwrap();
        assert_eq!(challenge, "abc123");
    }

    #[tokio::test]
    async fn test_url_verification_rechecks_token() {
        let body = json!({ "token": "wrong", "challenge": "abc123" }).to_string();

        let result = processor(MockUserStore::new())
            .url_verification(body.as_bytes())
            .await;
        assert!(matches!(result, Err(ApiError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_url_verification_missing_challenge_echoes_empty() {
        let body = json!({ "token": "test-token", "type": "url_verification" }).to_string();

        let challenge = processor(MockUserStore::new())
            .url_verification(body.as_bytes())
            .await
            .unwrap();
        assert_eq!(challenge, "");
    }

    #[tokio::test]
    async fn test_url_verification_malformed_json() {
        let result = processor(MockUserStore::new())
            .url_verification(b"{\"token\":")
            .await;
        assert!(matches!(result, Err(ApiError::MalformedBody)));
    }

    #[tokio::test]
    async fn test_user_change_upserts_once() {
        let mut store = MockUserStore::new();
        store
            .expect_upsert()
            .with(eq(User::new("U1", "alice")))
            .times(1)
            .returning(|_| Ok(()));

        let body = json!({
            "token": "test-token",
            "type": "event_callback",
            "event": { "type": "team_join", "user": { "id": "U1", "name": "alice" } }
        })
        .to_string();

        processor(store).user_change(body.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn test_user_change_without_user_is_malformed() {
        let mut store = MockUserStore::new();
        store.expect_upsert().never();

        let body = json!({
            "token": "test-token",
            "type": "event_callback",
            "event": { "type": "user_change" }
        })
        .to_string();

        let result = processor(store).user_change(body.as_bytes()).await;
        assert!(matches!(result, Err(ApiError::MalformedBody)));
    }

    #[tokio::test]
    async fn test_user_change_store_failure() {
        let mut store = MockUserStore::new();
        store
            .expect_upsert()
            .times(1)
            .returning(|_| Err(StoreError::Database(sqlx::Error::PoolTimedOut)));

        let body = json!({
            "token": "test-token",
            "type": "event_callback",
            "event": { "type": "user_change", "user": { "id": "U1", "name": "alice" } }
        })
        .to_string();

        let result = processor(store).user_change(body.as_bytes()).await;
        assert!(matches!(result, Err(ApiError::UpdateUser(_))));
    }
}
