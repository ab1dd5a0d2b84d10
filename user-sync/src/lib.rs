//! Slack user directory sync.
//!
//! Receives Slack Events API callbacks and keeps a Postgres user directory up
//! to date, serving the directory back over an API-key protected endpoint.
//!
//! ## Architecture
//!
//! ```text
//! Slack → POST /events → EventProcessor → UserStore (Postgres)
//! Client → GET /users  ─────────────────→ UserStore
//! Startup: users.list sync ─────────────→ UserStore
//! ```

pub mod config;
pub mod models;
pub mod store;
pub mod sync;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use models::User;
pub use store::{PgUserStore, StoreError, UserStore};
pub use sync::{sync_users, SlackClient, SyncError};
pub use web::{router, AppState};
