// src/transport/mod.rs
//! Wire clients for the two protocols a game server can be polled with.

pub mod query;
pub mod rcon;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("rcon authentication rejected")]
    AuthFailed,
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("could not resolve address {0}")]
    Resolve(String),
    #[error("not connected")]
    NotConnected,
    #[error("{0} requests are not supported by this backend")]
    Unsupported(&'static str),
}

/// Runs `operation`, failing with [`QueryError::Timeout`] once `limit` has passed.
pub(crate) async fn with_timeout<T, F>(limit: Duration, operation: F) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, QueryError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(QueryError::Timeout(limit)),
    }
}
