//! Acceptor wire API.
//!
//! ```text
//! POST /prepare/{key}
//!     Prepare request for the given key.
//!     Expects and returns the `X-Caspaxos-Ballot: counter/id` header.
//!     200 with the current accepted value, 412 on protocol conflict.
//!
//! POST /accept/{key}/{value}
//! POST /accept/{key}
//!     Accept request for the given key and (possibly empty) value.
//!     Expects the `X-Caspaxos-Ballot` header.
//!     200 `OK`, 406 on protocol conflict.
//! ```
//!
//! Path segments are URL-path-escaped.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use caspaxos::{Acceptor, AcceptorError, MemoryAcceptor, Value};

use crate::BALLOT_HEADER;

/// Routes for one in-process acceptor.
pub fn router(acceptor: Arc<MemoryAcceptor>) -> Router {
    Router::new()
        .route("/prepare/{key}", post(prepare))
        .route("/accept/{key}/{value}", post(accept_value))
        .route("/accept/{key}", post(accept_empty))
        .with_state(acceptor)
}

async fn prepare(
    State(acceptor): State<Arc<MemoryAcceptor>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let ballot = match ballot_or_bad_request(&headers) {
        Ok(ballot) => ballot,
        Err(response) => return response,
    };

    match acceptor.prepare(&key, ballot).await {
        Ok(prepared) => (
            [
                (BALLOT_HEADER, prepared.accepted.to_string()),
                (header::CONTENT_TYPE.as_str(), "text/plain".to_owned()),
            ],
            prepared.value,
        )
            .into_response(),
        Err(AcceptorError::PrepareConflict { current }) => (
            StatusCode::PRECONDITION_FAILED,
            [(BALLOT_HEADER, current.to_string())],
            format!("prepare conflict: ballot {ballot} does not dominate {current}\n"),
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn accept_value(
    State(acceptor): State<Arc<MemoryAcceptor>>,
    Path((key, value)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    accept(&acceptor, &key, Value::from(value), &headers).await
}

async fn accept_empty(
    State(acceptor): State<Arc<MemoryAcceptor>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    accept(&acceptor, &key, Value::new(), &headers).await
}

async fn accept(acceptor: &MemoryAcceptor, key: &str, value: Value, headers: &HeaderMap) -> Response {
    let ballot = match ballot_or_bad_request(headers) {
        Ok(ballot) => ballot,
        Err(response) => return response,
    };

    match acceptor.accept(key, ballot, value).await {
        Ok(()) => (
            [(header::CONTENT_TYPE, "text/plain")],
            "OK\n",
        )
            .into_response(),
        Err(AcceptorError::AcceptConflict { .. }) => (
            StatusCode::NOT_ACCEPTABLE,
            format!("accept conflict: ballot {ballot} was overtaken\n"),
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn ballot_or_bad_request(headers: &HeaderMap) -> Result<caspaxos::Ballot, Response> {
    crate::ballot_from_headers(headers)
        .map_err(|reason| (StatusCode::BAD_REQUEST, reason).into_response())
}
