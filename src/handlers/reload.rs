// src/handlers/reload.rs
use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info};
use tokio::runtime::Handle;
use crate::config::CurrentConfig;
use crate::connector::Connector;
use crate::utils::{client_ip, RequestError};
use super::IpRateLimiter;

pub async fn handle_reload(
    req: HttpRequest,
    config: web::Data<CurrentConfig>,
    connector: web::Data<Connector>,
    runtime: web::Data<Handle>,
    rate_limiter: web::Data<IpRateLimiter>,
) -> Result<HttpResponse, RequestError> {
    let peer_ip = client_ip(&req)?;

    if rate_limiter.check_key(&peer_ip).is_err() {
        error!("Rate limit exceeded for config reload for ip: {}", peer_ip);
        return Err(RequestError::RateLimitExceeded);
    }

    info!("Config reload requested by {}", peer_ip);
    let (config, connector) = (config.into_inner(), connector.into_inner());
    runtime
        .spawn(async move { config.reload(&connector).await })
        .await
        .map_err(|e| RequestError::Internal(e.to_string()))?
        .map_err(|e| {
            error!("Config reload failed: {}", e);
            RequestError::ReloadFailed(e.to_string())
        })?;

    Ok(HttpResponse::Ok().body("Config reloaded\n"))
}
