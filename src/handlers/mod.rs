// src/handlers/mod.rs
pub mod index;
pub mod metrics;
pub mod reload;

use actix_web::web;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::RateLimiter;
use std::net::IpAddr;

pub type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

pub const RELOAD_PATH: &str = "/-/reload";

/// Where the landing page points scrapers.
#[derive(Debug, Clone)]
pub struct TelemetryPath(pub String);

pub fn routes(cfg: &mut web::ServiceConfig, telemetry_path: &str) {
    cfg.route("/", web::get().to(index::index))
        .route(telemetry_path, web::get().to(metrics::handle_metrics))
        // a resource answers other methods with 405
        .service(web::resource(RELOAD_PATH).route(web::post().to(reload::handle_reload)));
}
