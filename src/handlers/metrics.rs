// src/handlers/metrics.rs
use actix_web::{web, HttpResponse};
use log::{debug, error};
use tokio::runtime::Handle;
use crate::collector::Exporter;
use crate::metrics::{render, CONTENT_TYPE};
use crate::utils::RequestError;

/// Runs one scrape on the runtime that owns the connections.
pub async fn handle_metrics(
    exporter: web::Data<Exporter>,
    runtime: web::Data<Handle>,
) -> Result<HttpResponse, RequestError> {
    let exporter = exporter.into_inner();
    let samples = runtime
        .spawn(async move { exporter.scrape().await })
        .await
        .map_err(|e| {
            error!("Scrape task failed: {}", e);
            RequestError::Internal(e.to_string())
        })?;

    debug!("Scrape produced {} samples", samples.len());
    Ok(HttpResponse::Ok().content_type(CONTENT_TYPE).body(render(&samples)))
}
