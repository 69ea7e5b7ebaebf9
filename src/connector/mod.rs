// src/connector/mod.rs
pub mod backend;
pub mod cache;
pub mod connection;
pub mod rcon;
pub mod serverquery;

use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, error, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use crate::config::{Config, ConnectionOptions, QueryMode};
use crate::parser::ParseError;
use crate::transport::QueryError;
use self::backend::QueryBackend;
use self::connection::{CachedConnection, Connection};
use self::rcon::RconBackend;
use self::serverquery::ServerQueryBackend;

/// Attempts per server before a (re)load gives up on it.
pub const CONNECT_ATTEMPTS: usize = 5;

/// Pause between two attempts for the same server.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

type Slot = Arc<OnceCell<Arc<dyn Connection>>>;

/// All configured server connections, keyed by address.
///
/// Entries are only ever added; a reload never replaces a live connection.
/// Each address owns a slot that is filled at most once, so concurrent adds
/// for one address open a single connection between them.
#[derive(Default)]
pub struct Connector {
    connections: DashMap<String, Slot>,
}

async fn open<B: QueryBackend>(
    name: &str,
    options: &ConnectionOptions,
    mut backend: B,
) -> Result<Arc<dyn Connection>, ConnectorError> {
    backend.reconnect().await?;
    Ok(Arc::new(CachedConnection::new(name, options, backend)))
}

impl Connector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection unless one for the same address already exists.
    pub async fn new_connection(&self, name: &str, options: &ConnectionOptions) -> Result<(), ConnectorError> {
        self.add_connection(&options.address, || async {
            match options.mode {
                QueryMode::Rcon => open(name, options, RconBackend::new(options)).await,
                QueryMode::ServerQuery => open(name, options, ServerQueryBackend::new(options)).await,
            }
        })
        .await
    }

    /// Runs `build` unless `address` is connected already. Callers racing on
    /// the same address wait for the first build; after a failed build the
    /// next caller tries again.
    pub(crate) async fn add_connection<F, Fut>(&self, address: &str, build: F) -> Result<(), ConnectorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Connection>, ConnectorError>>,
    {
        let slot = self.connections.entry(address.to_string()).or_default().clone();
        slot.get_or_try_init(build).await?;
        Ok(())
    }

    pub fn is_connected(&self, address: &str) -> bool {
        self.connections
            .get(address)
            .map_or(false, |slot| slot.initialized())
    }

    /// Opens connections for every server in `config` that is not connected
    /// yet, all servers at once. A server that keeps failing is logged and
    /// skipped.
    pub async fn load(&self, config: &Config) {
        let pending = config
            .servers
            .iter()
            .filter(|(_, server)| !self.is_connected(&server.address))
            .map(|(name, server)| self.connect_with_retries(name, config.connection_options(server)));
        join_all(pending).await;
    }

    async fn connect_with_retries(&self, name: &str, options: ConnectionOptions) {
        let mut last_error = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(RETRY_DELAY).await;
            }
            match self.new_connection(name, &options).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    debug!("Attempt {} to connect to {} failed: {}", attempt, options.address, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => error!("Error connecting to server {} ({}): {}", name, options.address, e),
            None => info!("Connected to server {} ({})", name, options.address),
        }
    }

    pub fn get_connections(&self) -> Vec<Arc<dyn Connection>> {
        self.connections
            .iter()
            .filter_map(|r| r.value().get().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.iter().filter(|r| r.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes every connection. Only meant for shutdown.
    pub async fn close_all(&self) {
        let connections = self.get_connections();
        self.connections.clear();
        for connection in connections {
            connection.close().await;
        }
    }
}
