//! Response bodies and suffix-based content negotiation.
//!
//! The wire encoding is picked from the request path alone: a path ending in
//! `.msgpack` answers with MessagePack, anything else with JSON. `Accept`
//! headers are ignored. IDs are always sent as decimal strings.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use snowmint::SnowflakeId;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const MSGPACK_CONTENT_TYPE: &str = "application/x-msgpack; charset=UTF-8";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdBody {
    #[serde(with = "snowmint::serde::as_decimal_string")]
    pub id: SnowflakeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdsBody {
    #[serde(with = "snowmint::serde::as_decimal_strings")]
    pub ids: Vec<SnowflakeId>,
}

/// The single error envelope used by every failing response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encoding failed: {0}")]
    MsgPack(#[from] rmp_serde::encode::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MsgPack,
}

impl Encoding {
    pub const MSGPACK_SUFFIX: &'static str = ".msgpack";

    pub fn from_path(path: &str) -> Self {
        if path.ends_with(Self::MSGPACK_SUFFIX) {
            Self::MsgPack
        } else {
            Self::Json
        }
    }

    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => JSON_CONTENT_TYPE,
            Self::MsgPack => MSGPACK_CONTENT_TYPE,
        }
    }

    /// Serializes `body`. MessagePack structs are written as maps with named
    /// keys so both encodings carry the same shape.
    pub fn encode<T: Serialize>(self, body: &T) -> Result<Vec<u8>, EncodeError> {
        match self {
            Self::Json => Ok(serde_json::to_vec(body)?),
            Self::MsgPack => Ok(rmp_serde::to_vec_named(body)?),
        }
    }

    /// Builds a response with the matching content type.
    ///
    /// If `body` cannot be encoded, falls back to a 500 carrying the error
    /// envelope in the same encoding.
    pub fn respond<T: Serialize>(self, status: StatusCode, body: &T) -> Response {
        match self.encode(body) {
            Ok(bytes) => self.with_content_type(status, bytes),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response body");
                let fallback = ErrorBody {
                    error: e.to_string(),
                };
                match self.encode(&fallback) {
                    Ok(bytes) => self.with_content_type(StatusCode::INTERNAL_SERVER_ERROR, bytes),
                    Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
                }
            }
        }
    }

    fn with_content_type(self, status: StatusCode, bytes: Vec<u8>) -> Response {
        (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(self.content_type()),
            )],
            bytes,
        )
            .into_response()
    }
}
