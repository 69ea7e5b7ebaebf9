// src/connector/rcon.rs
use async_trait::async_trait;
use log::{debug, warn};
use std::time::Duration;
use tokio::time::Instant;
use crate::config::ConnectionOptions;
use crate::transport::rcon::RconClient;
use crate::transport::QueryError;
use super::backend::{QueryBackend, QueryKind};

/// Sessions older than this are replaced before the next command.
pub const STALE_AFTER: Duration = Duration::from_secs(5);

pub struct RconBackend {
    address: String,
    password: String,
    timeout: Duration,
    stale_after: Duration,
    client: Option<RconClient>,
    connected_at: Option<Instant>,
}

impl RconBackend {
    pub fn new(options: &ConnectionOptions) -> Self {
        Self {
            address: options.address.clone(),
            password: options.rcon_password.clone(),
            timeout: options.connect_timeout,
            stale_after: STALE_AFTER,
            client: None,
            connected_at: None,
        }
    }

    #[cfg(test)]
    fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    fn is_stale(&self) -> bool {
        match (&self.client, self.connected_at) {
            (Some(_), Some(connected_at)) => connected_at.elapsed() > self.stale_after,
            _ => true,
        }
    }
}

#[async_trait]
impl QueryBackend for RconBackend {
    type Reply = String;

    const KIND: QueryKind = QueryKind::Status;

    async fn reconnect(&mut self) -> Result<(), QueryError> {
        if let Some(client) = self.client.take() {
            client.close();
        }
        self.connected_at = None;

        debug!("Connecting rcon session to {}", self.address);
        let client = RconClient::connect(&self.address, &self.password, self.timeout).await?;
        self.client = Some(client);
        self.connected_at = Some(Instant::now());
        Ok(())
    }

    async fn query(&mut self, kind: QueryKind) -> Result<String, QueryError> {
        if kind != QueryKind::Status {
            return Err(QueryError::Unsupported(kind.as_str()));
        }
        if self.is_stale() {
            self.reconnect().await?;
        }

        let client = self.client.as_mut().ok_or(QueryError::NotConnected)?;
        match client.exec(kind.as_str()).await {
            Ok(output) => Ok(output),
            Err(e) => {
                warn!("rcon command {} on {} failed: {}", kind.as_str(), self.address, e);
                // force a fresh session on the next call
                self.connected_at = None;
                Err(e)
            }
        }
    }

    async fn close(&mut self) {
        if let Some(client) = self.client.take() {
            client.close();
        }
        self.connected_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryMode;
    use crate::transport::rcon::fake;
    use std::sync::atomic::Ordering;

    const STATUS: &str = "hostname: Fake\nmap     : cs_office\nplayers : 0 (12 max)\n";

    fn options(address: &str, password: &str) -> ConnectionOptions {
        ConnectionOptions {
            address: address.to_string(),
            mode: QueryMode::Rcon,
            rcon_password: password.to_string(),
            connect_timeout: Duration::from_secs(2),
            cache_expiration: Duration::from_secs(10),
            cache_cleanup_interval: Duration::from_secs(11),
        }
    }

    #[tokio::test]
    async fn first_query_connects() {
        let server = fake::spawn("secret", STATUS).await;
        let mut backend = RconBackend::new(&options(&server.address, "secret"));

        assert_eq!(backend.query(QueryKind::Status).await.unwrap(), STATUS);
        assert_eq!(backend.query(QueryKind::Status).await.unwrap(), STATUS);
        assert_eq!(server.connections.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_session_is_replaced() {
        let server = fake::spawn("secret", STATUS).await;
        let mut backend =
            RconBackend::new(&options(&server.address, "secret")).with_stale_after(Duration::from_millis(50));

        backend.query(QueryKind::Status).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        backend.query(QueryKind::Status).await.unwrap();
        assert_eq!(server.connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dropped_session_is_replaced_on_next_query() {
        let server = fake::spawn_flaky("secret", STATUS).await;
        let mut backend = RconBackend::new(&options(&server.address, "secret"));

        assert!(backend.query(QueryKind::Status).await.is_err());
        assert!(backend.is_stale());
        assert_eq!(backend.query(QueryKind::Status).await.unwrap(), STATUS);
        assert_eq!(server.connections.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn info_is_unsupported() {
        let mut backend = RconBackend::new(&options("127.0.0.1:1", "secret"));
        assert!(matches!(
            backend.query(QueryKind::Info).await,
            Err(QueryError::Unsupported("data"))
        ));
    }

    #[tokio::test]
    async fn bad_password_surfaces() {
        let server = fake::spawn("secret", STATUS).await;
        let mut backend = RconBackend::new(&options(&server.address, "wrong"));
        assert!(matches!(backend.reconnect().await, Err(QueryError::AuthFailed)));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let server = fake::spawn("secret", STATUS).await;
        let mut backend = RconBackend::new(&options(&server.address, "secret"));
        backend.close().await;
        backend.reconnect().await.unwrap();
        backend.close().await;
        backend.close().await;
        assert!(backend.is_stale());
    }
}
