// src/utils.rs
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Failed to extract client IP")]
    MissingPeerIP,
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
    #[error("Failed to reload config: {0}")]
    ReloadFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::MissingPeerIP => HttpResponse::BadRequest().body(self.to_string()),
            Self::RateLimitExceeded => HttpResponse::TooManyRequests().body(self.to_string()),
            Self::ReloadFailed(_) | Self::Internal(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

/// The exporter is scraped directly, so the peer address is the client.
pub fn client_ip(req: &HttpRequest) -> Result<IpAddr, RequestError> {
    req.peer_addr()
        .map(|addr| addr.ip())
        .ok_or(RequestError::MissingPeerIP)
}
