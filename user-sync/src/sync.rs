//! Initial directory sync from Slack's `users.list` API.
//!
//! Events only tell us about members that change after the service is up, so
//! on startup the whole member list is paged through and upserted.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::models::User;
use crate::store::{StoreError, UserStore};

/// Members requested per `users.list` page.
const PAGE_LIMIT: u32 = 200;

/// Errors that abort a sync.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid slack api url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("slack request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Slack answered with `ok: false`.
    #[error("slack api error: {0}")]
    Api(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One page of a `users.list` response.
#[derive(Debug, Deserialize)]
struct UsersListPage {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    members: Vec<User>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

/// Client for the Slack Web API endpoints used by the sync.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    api_url: String,
    bot_token: String,
}

impl SlackClient {
    /// Create a client for `api_url` (e.g. `https://slack.com/api`).
    pub fn new(api_url: impl Into<String>, bot_token: impl Into<String>) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            bot_token: bot_token.into(),
        })
    }

    fn users_list_url(&self, cursor: Option<&str>) -> Result<Url, SyncError> {
        let mut url = Url::parse(&format!("{}/users.list", self.api_url.trim_end_matches('/')))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &PAGE_LIMIT.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }
        Ok(url)
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<UsersListPage, SyncError> {
        let url = self.users_list_url(cursor)?;

        let page: UsersListPage = self
            .client
            .get(url)
            .bearer_auth(&self.bot_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !page.ok {
            return Err(SyncError::Api(
                page.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        Ok(page)
    }

    /// Fetch every workspace member, following pagination cursors.
    pub async fn list_users(&self) -> Result<Vec<User>, SyncError> {
        let mut users = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.fetch_page(cursor.as_deref()).await?;
            info!(
                page_members = page.members.len(),
                has_cursor = cursor.is_some(),
                "slack_users_page_fetched"
            );
            users.extend(page.members);

            match page.response_metadata.map(|m| m.next_cursor) {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(users)
    }
}

/// Upsert every Slack member into the store. Returns the number of users written.
pub async fn sync_users(client: &SlackClient, store: &dyn UserStore) -> Result<usize, SyncError> {
    let users = client.list_users().await?;

    for user in &users {
        if let Err(e) = store.upsert(user).await {
            warn!(user_id = %user.id, error = %e, "user_sync_upsert_failed");
            return Err(e.into());
        }
    }

    info!(users_synced = users.len(), "user_sync_complete");
    Ok(users.len())
}
