//! Errors surfaced at the HTTP boundary.
//!
//! - `Issuance`: the retry budget ran out. Always a 500; the kind of the
//!   underlying failure only shows up in the message.
//! - `InvalidLimit`: the `limit` query parameter was missing a usable value.
//!   A 400.
//!
//! Both render as `{"error": "<message>"}` in the encoding the path asked for.

use crate::server::service::encoding::{Encoding, ErrorBody};
use axum::{http::StatusCode, response::Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("ID generation error: {0}")]
    Issuance(#[from] snowmint::Error),

    #[error("Invalid request: {reason}")]
    InvalidLimit { reason: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Issuance(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidLimit { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn into_response(self, encoding: Encoding) -> Response {
        encoding.respond(
            self.status(),
            &ErrorBody {
                error: self.to_string(),
            },
        )
    }
}
