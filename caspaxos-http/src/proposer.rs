//! Client-facing register API, a thin adaptor over `Proposer::propose`.
//!
//! ```text
//! GET /{key}
//!     Linearizable read. 404 when the key holds no value.
//!
//! POST /{key}?current=...&next=...
//!     Compare-and-swap. `next` is required, `current` defaults to empty.
//!     200 with the new value on success, 412 when the precondition failed.
//!
//! DELETE /{key}
//!     Reserved. 501.
//! ```
//!
//! Failures surface directly: the proposer never retries, so conflicts and
//! quorum problems come back as errors the client can retry against its own
//! view of the register.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use caspaxos::{Proposer, ProposeError, Value, change};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::HttpAcceptor;

#[derive(Clone)]
struct ApiState {
    proposer: Arc<Proposer<HttpAcceptor>>,
    propose_timeout: Duration,
}

/// Routes for one proposer. `propose_timeout` is the per-request deadline
/// wired into the proposal's cancellation token.
pub fn router(proposer: Arc<Proposer<HttpAcceptor>>, propose_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/{key}",
            get(get_value).post(cas_value).delete(delete_value),
        )
        .with_state(ApiState {
            proposer,
            propose_timeout,
        })
}

impl ApiState {
    async fn propose<F>(&self, key: &str, change: F) -> Result<Value, ProposeError>
    where
        F: FnOnce(Value) -> Value,
    {
        let cancel = CancellationToken::new();
        let deadline = {
            let cancel = cancel.clone();
            let timeout = self.propose_timeout;
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                cancel.cancel();
            })
        };
        let result = self.proposer.propose(key, change, &cancel).await;
        deadline.abort();
        result
    }
}

async fn get_value(State(state): State<ApiState>, Path(key): Path<String>) -> Response {
    match state.propose(&key, change::read()).await {
        Ok(value) if value.is_empty() => (StatusCode::NOT_FOUND, "not found\n").into_response(),
        Ok(value) => ([(header::CONTENT_TYPE, "text/plain")], value).into_response(),
        Err(err) => propose_failure(&key, &err),
    }
}

#[derive(Debug, Deserialize)]
struct CasParams {
    #[serde(default)]
    current: String,
    next: Option<String>,
}

async fn cas_value(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    Query(params): Query<CasParams>,
) -> Response {
    let Some(next) = params.next else {
        return (StatusCode::BAD_REQUEST, "next not provided\n").into_response();
    };
    let next = Value::from(next);
    let current = Value::from(params.current);

    match state
        .propose(&key, change::cas(current, next.clone()))
        .await
    {
        Ok(value) if value == next => {
            ([(header::CONTENT_TYPE, "text/plain")], value).into_response()
        }
        Ok(_) => (StatusCode::PRECONDITION_FAILED, "cas precondition failed\n").into_response(),
        Err(err) => propose_failure(&key, &err),
    }
}

async fn delete_value(Path(_key): Path<String>) -> Response {
    (StatusCode::NOT_IMPLEMENTED, "not implemented\n").into_response()
}

fn propose_failure(key: &str, err: &ProposeError) -> Response {
    debug!(%key, error = %err, "proposal failed");
    let status = match err {
        ProposeError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("{err}\n")).into_response()
}
