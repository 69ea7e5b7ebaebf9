// src/main.rs
mod collector;
mod config;
mod connector;
mod handlers;
mod metrics;
mod models;
mod parser;
mod transport;
mod utils;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::sync::Arc;
use tokio::runtime::Handle;
use crate::collector::Exporter;
use crate::config::{Cli, CurrentConfig};
use crate::connector::Connector;
use crate::handlers::{IpRateLimiter, TelemetryPath};

fn print_collectors(enabled: &[String]) {
    println!("Available collectors:");
    for name in collector::available() {
        let marker = if enabled.iter().any(|e| e.trim() == name) { " (enabled)" } else { "" };
        println!(" - {}{}", name, marker);
    }
}

#[cfg(unix)]
fn reload_on_hangup(config: Arc<CurrentConfig>, connector: Arc<Connector>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading config");
            if let Err(e) = config.reload(&connector).await {
                error!("Config reload failed: {}", e);
            }
        }
    });
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    env_logger::init_from_env(Env::default().default_filter_or(default_filter));

    if cli.print_collectors {
        print_collectors(&cli.collectors);
        return Ok(());
    }

    let connector = Arc::new(Connector::new());
    let exporter = Exporter::new(connector.clone(), &cli.collectors).map_err(|e| {
        error!("{}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    info!("Enabled collectors: {}", exporter.collector_names().join(", "));

    let current_config = Arc::new(CurrentConfig::new(cli.config_file.clone()));
    if let Err(e) = current_config.reload(&connector).await {
        error!("Failed to load config file {}: {}", cli.config_file.display(), e);
        return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
    info!("Connected to {} of {} servers", connector.len(), current_config.snapshot().servers.len());

    #[cfg(unix)]
    reload_on_hangup(current_config.clone(), connector.clone())?;

    let exporter = web::Data::new(exporter);
    let connector_data = web::Data::from(connector.clone());
    let config_data = web::Data::from(current_config.clone());
    let runtime = web::Data::new(Handle::current());
    let telemetry_path = web::Data::new(TelemetryPath(cli.telemetry_path.clone()));
    let reload_rate_limiter: web::Data<IpRateLimiter> = web::Data::new(IpRateLimiter::keyed(cli.reload_quota()));

    info!("Listening on {}, metrics at {}", cli.listen_address, cli.telemetry_path);
    let path = cli.telemetry_path.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(exporter.clone())
            .app_data(connector_data.clone())
            .app_data(config_data.clone())
            .app_data(runtime.clone())
            .app_data(telemetry_path.clone())
            .app_data(reload_rate_limiter.clone())
            .configure(|cfg| handlers::routes(cfg, &path))
    })
    .bind(&cli.listen_address)?
    .run()
    .await?;

    info!("Shutting down, closing connections");
    connector.close_all().await;
    Ok(())
}
