//! Handler error type and its HTTP mapping.
//!
//! Every variant renders as a status code plus a short plain-text body. The
//! underlying cause, when there is one, is logged where the error is raised
//! and never sent to the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid apikey")]
    InvalidApiKey,

    #[error("invalid token")]
    InvalidToken,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("can't read body")]
    MalformedBody,

    #[error("Invalid event")]
    UnsupportedEvent,

    #[error("problem accessing database")]
    FetchUsers(#[source] StoreError),

    #[error("error updating database")]
    UpdateUser(#[source] StoreError),

    #[error("problem marshalling data")]
    Serialization(#[source] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidApiKey | Self::InvalidToken | Self::InvalidSignature => {
                StatusCode::FORBIDDEN
            }
            Self::MalformedBody | Self::UnsupportedEvent => StatusCode::BAD_REQUEST,
            Self::FetchUsers(_) | Self::UpdateUser(_) | Self::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
