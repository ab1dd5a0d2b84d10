//! Slack Events API payload types.
//!
//! Inbound bodies are decoded in two steps: first into a minimal
//! [`EventEnvelope`] carrying only the token and the discriminant fields, then,
//! once the route is known, into the payload type that route needs
//! ([`UrlVerification`] or [`UserChangeRequest`]).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Envelope type for the Events API handshake.
pub const URL_VERIFICATION: &str = "url_verification";

/// Inner event type sent when a member's profile changes.
pub const USER_CHANGE: &str = "user_change";

/// Inner event type sent when a new member joins the workspace.
pub const TEAM_JOIN: &str = "team_join";

// =============================================================================
// User
// =============================================================================

/// A workspace member as stored in the local directory.
///
/// Only `id` and `name` are interpreted. Every other field Slack sends is kept
/// in `fields` and written back out flattened, so the listing endpoint returns
/// the profile as Slack delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Map::new(),
        }
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// Outer object of every Events API request.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default)]
    pub event: Option<EventHeader>,
}

/// Discriminant of the nested event; the payload is decoded later.
#[derive(Debug, Clone, Deserialize)]
pub struct EventHeader {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
}

/// Where an envelope should be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRoute {
    /// Handshake challenge
    UrlVerification,
    /// `user_change` or `team_join`
    UserChange,
    /// Anything else, carrying the inner event type for logging
    Unsupported(String),
}

impl EventEnvelope {
    /// Decide the route. The envelope type wins over the inner event type.
    pub fn route(&self) -> EventRoute {
        if self.kind == URL_VERIFICATION {
            return EventRoute::UrlVerification;
        }

        let inner = self.event_type();
        match inner {
            USER_CHANGE | TEAM_JOIN => EventRoute::UserChange,
            _ => EventRoute::Unsupported(inner.to_string()),
        }
    }

    /// Inner event type, empty when the envelope has no event.
    pub fn event_type(&self) -> &str {
        self.event.as_ref().map(|e| e.kind.as_str()).unwrap_or("")
    }
}

// =============================================================================
// Route payloads
// =============================================================================

/// Handshake payload sent when the request URL is registered.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlVerification {
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenge: String,
}

/// `event_callback` payload for `user_change` and `team_join`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserChangeRequest {
    pub event: UserChangeEvent,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserChangeEvent {
    pub user: User,
}

/// Decode `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_url_verification_ignores_inner_event() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "token": "t",
            "type": "url_verification",
            "event": { "type": "user_change" }
        }))
        .unwrap();

        assert_eq!(envelope.route(), EventRoute::UrlVerification);
    }

    #[test]
    fn test_route_user_events() {
        for kind in [USER_CHANGE, TEAM_JOIN] {
            let envelope: EventEnvelope = serde_json::from_value(json!({
                "token": "t",
                "type": "event_callback",
                "event": { "type": kind, "user": { "id": "U1" } }
            }))
            .unwrap();

            assert_eq!(envelope.route(), EventRoute::UserChange);
        }
    }

    #[test]
    fn test_route_unsupported_keeps_type() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "token": "t",
            "type": "event_callback",
            "event": { "type": "channel_created" }
        }))
        .unwrap();

        assert_eq!(
            envelope.route(),
            EventRoute::Unsupported("channel_created".to_string())
        );
    }

    #[test]
    fn test_route_missing_event() {
        let envelope: EventEnvelope =
            serde_json::from_str(r#"{"token":"t","type":"event_callback"}"#).unwrap();

        assert_eq!(envelope.event_type(), "");
        assert_eq!(envelope.route(), EventRoute::Unsupported(String::new()));
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let envelope: EventEnvelope = serde_json::from_value(json!({
            "token": null,
            "type": null,
            "event": { "type": null }
        }))
        .unwrap();

        assert_eq!(envelope.token, "");
        assert_eq!(envelope.route(), EventRoute::Unsupported(String::new()));

        let verification: UrlVerification =
            serde_json::from_value(json!({ "token": null, "challenge": null })).unwrap();
        assert_eq!(verification.token, "");
        assert_eq!(verification.challenge, "");
    }

    #[test]
    fn test_url_verification_without_challenge() {
        let verification: UrlVerification =
            serde_json::from_str(r#"{"token":"t","type":"url_verification"}"#).unwrap();
        assert_eq!(verification.challenge, "");
    }

    #[test]
    fn test_user_keeps_profile_fields() {
        let raw = json!({
            "id": "U1",
            "name": "alice",
            "real_name": "Alice Liddell",
            "profile": { "email": "alice@example.com" }
        });

        let user: User = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.id, "U1");
        assert_eq!(user.name, "alice");
        assert_eq!(user.fields["real_name"], "Alice Liddell");

        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn test_plain_user_serializes_without_extras() {
        let json = serde_json::to_string(&User::new("U1", "Alice")).unwrap();
        assert_eq!(json, r#"{"id":"U1","name":"Alice"}"#);
    }

    #[test]
    fn test_user_change_request_requires_user_id() {
        let result: Result<UserChangeRequest, _> =
            serde_json::from_str(r#"{"event":{"type":"user_change","user":{"name":"x"}}}"#);
        assert!(result.is_err());
    }
}
