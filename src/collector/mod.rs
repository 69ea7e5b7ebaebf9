// src/collector/mod.rs
pub mod info;
pub mod map;
pub mod playercount;
pub mod players;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, error};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use crate::connector::connection::Connection;
use crate::connector::{Connector, ConnectorError};
use crate::metrics::{fq_name, Sample};

/// Turns what a connection reports into samples.
#[async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Appends this collector's samples for one server. On error the caller
    /// discards whatever was appended.
    async fn update(&self, connection: &dyn Connection, samples: &mut Vec<Sample>) -> Result<(), ConnectorError>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectorError {
    #[error("unknown collector {name:?}, available: {}", available().join(", "), name = .0)]
    Unknown(String),
}

/// Names of all built-in collectors, sorted.
pub fn available() -> Vec<&'static str> {
    vec!["info", "map", "playercount", "players"]
}

pub fn build(name: &str) -> Result<Arc<dyn Collector>, CollectorError> {
    match name {
        "info" => Ok(Arc::new(info::InfoCollector)),
        "map" => Ok(Arc::new(map::MapCollector)),
        "playercount" => Ok(Arc::new(playercount::PlayerCountCollector)),
        "players" => Ok(Arc::new(players::PlayersCollector)),
        other => Err(CollectorError::Unknown(other.to_string())),
    }
}

/// Runs the enabled collectors against every connection on each scrape.
pub struct Exporter {
    connector: Arc<Connector>,
    collectors: Vec<Arc<dyn Collector>>,
}

impl Exporter {
    pub fn new(connector: Arc<Connector>, enabled: &[String]) -> Result<Self, CollectorError> {
        let mut collectors: Vec<Arc<dyn Collector>> = Vec::new();
        for name in enabled {
            let name = name.trim();
            if name.is_empty() || collectors.iter().any(|c| c.name() == name) {
                continue;
            }
            collectors.push(build(name)?);
        }
        Ok(Self { connector, collectors })
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Collects every (collector, connection) pair concurrently and returns
    /// the combined samples plus per-pair scrape metrics.
    pub async fn scrape(&self) -> Vec<Sample> {
        let connections = self.connector.get_connections();
        let mut tasks = Vec::with_capacity(self.collectors.len() * connections.len());
        for collector in &self.collectors {
            for connection in &connections {
                tasks.push(execute(collector.as_ref(), connection.as_ref()));
            }
        }

        join_all(tasks).await.into_iter().flatten().collect()
    }
}

async fn execute(collector: &dyn Collector, connection: &dyn Connection) -> Vec<Sample> {
    let start = Instant::now();
    let mut samples = Vec::new();
    let result = collector.update(connection, &mut samples).await;
    let elapsed = start.elapsed();

    let success = match result {
        Ok(()) => {
            debug!(
                "Collector {} succeeded for {} in {:?}",
                collector.name(),
                connection.name(),
                elapsed
            );
            1.0
        }
        Err(e) => {
            error!(
                "Collector {} failed for {} after {:?}: {}",
                collector.name(),
                connection.name(),
                elapsed,
                e
            );
            samples.clear();
            0.0
        }
    };

    samples.push(
        Sample::gauge(
            fq_name("scrape", "collector_duration_seconds"),
            "Duration of a collector scrape.",
            elapsed.as_secs_f64(),
        )
        .label("collector", collector.name())
        .label("server", connection.name()),
    );
    samples.push(
        Sample::gauge(
            fq_name("scrape", "collector_success"),
            "Whether a collector succeeded.",
            success,
        )
        .label("collector", collector.name())
        .label("server", connection.name()),
    );
    samples
}
