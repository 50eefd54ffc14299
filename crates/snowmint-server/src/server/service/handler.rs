//! HTTP routing for ID issuance.
//!
//! | route | body |
//! |---|---|
//! | `GET /id`, `GET /id.msgpack` | `{"id": "<decimal>"}` |
//! | `GET /ids`, `GET /ids.msgpack` | `{"ids": ["<decimal>", ...]}` (`?limit=N`, default 10) |
//! | anything else | 404, empty body |
//!
//! The request's `User-Agent` is handed to the worker as an opaque audit tag.

use crate::server::{
    config::ServerConfig,
    service::{
        encoding::{Encoding, IdBody, IdsBody},
        error::ApiError,
    },
    telemetry::{
        increment_issuance_errors, increment_requests, record_ids_issued,
        record_request_duration,
    },
};
use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, StatusCode, Uri, header},
    response::Response,
    routing::get,
};
use core::num::NonZeroUsize;
use serde::Deserialize;
use snowmint::{DEFAULT_BATCH_SIZE, IdWorker, Issuer, Mint, SystemClock};
use std::{sync::Arc, time::Instant};
use tower_http::trace::TraceLayer;

/// Any generator the service can issue from.
pub type SharedMint = Arc<dyn Mint + Send + Sync>;

/// Shared, cheaply cloneable request state.
#[derive(Clone)]
pub struct AppState {
    issuer: Arc<Issuer<SharedMint>>,
    max_batch: NonZeroUsize,
}

impl AppState {
    pub fn new(issuer: Issuer<SharedMint>, max_batch: NonZeroUsize) -> Self {
        Self {
            issuer: Arc::new(issuer),
            max_batch,
        }
    }

    /// Builds the process-wide worker from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the identity or epoch is rejected by the worker.
    pub fn from_config(config: &ServerConfig) -> snowmint::Result<Self> {
        let worker = IdWorker::new(
            config.datacenter_id,
            config.worker_id,
            config.epoch,
            SystemClock,
        )?;
        let generator: SharedMint = Arc::new(worker);
        Ok(Self::new(Issuer::new(generator, config.retry), config.max_batch))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/id", get(issue_one))
        .route("/id.msgpack", get(issue_one))
        .route("/ids", get(issue_batch))
        .route("/ids.msgpack", get(issue_batch))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    limit: Option<String>,
}

async fn issue_one(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> Response {
    let encoding = Encoding::from_path(uri.path());
    let start = Instant::now();
    increment_requests();

    let result = state.issuer.issue_one(user_agent(&headers));
    record_request_duration(start.elapsed().as_secs_f64() * 1_000.0);

    match result {
        Ok(id) => {
            record_ids_issued(1);
            encoding.respond(StatusCode::OK, &IdBody { id })
        }
        Err(e) => issuance_failed(e, encoding),
    }
}

async fn issue_batch(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<IdsQuery>, QueryRejection>,
) -> Response {
    let encoding = Encoding::from_path(uri.path());
    let start = Instant::now();
    increment_requests();

    let limit = match query {
        Ok(Query(q)) => parse_limit(q.limit.as_deref(), state.max_batch),
        Err(rejection) => Err(ApiError::InvalidLimit {
            reason: rejection.body_text(),
        }),
    };
    let count = match limit {
        Ok(count) => count,
        Err(e) => {
            tracing::debug!(error = %e, "rejecting batch request");
            return e.into_response(encoding);
        }
    };

    let result = state.issuer.issue_batch(count, user_agent(&headers));
    record_request_duration(start.elapsed().as_secs_f64() * 1_000.0);

    match result {
        Ok(ids) => {
            record_ids_issued(ids.len());
            encoding.respond(StatusCode::OK, &IdsBody { ids })
        }
        Err(e) => issuance_failed(e, encoding),
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

fn issuance_failed(e: snowmint::Error, encoding: Encoding) -> Response {
    tracing::warn!(error = %e, "retry budget exhausted");
    increment_issuance_errors();
    ApiError::from(e).into_response(encoding)
}

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
}

/// Validates the `limit` query parameter. An absent or empty value means the
/// default batch size, capped at `max`.
fn parse_limit(raw: Option<&str>, max: NonZeroUsize) -> Result<NonZeroUsize, ApiError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => {
            return Ok(NonZeroUsize::new(DEFAULT_BATCH_SIZE.min(max.get())).unwrap_or(max));
        }
        Some(raw) => raw,
    };

    let invalid = |reason: String| ApiError::InvalidLimit { reason };

    let n: i128 = raw
        .parse()
        .map_err(|_| invalid(format!("limit must be an integer, got {raw:?}")))?;
    if n <= 0 {
        return Err(invalid(format!("limit must be greater than 0, got {n}")));
    }
    if n > max.get() as i128 {
        return Err(invalid(format!(
            "limit {n} exceeds maximum allowed ({max})"
        )));
    }
    // In range of `1..=max`, so both conversions hold.
    usize::try_from(n)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| invalid(format!("limit {n} is out of range")))
}
