// src/connector/serverquery.rs
use async_trait::async_trait;
use log::{debug, error};
use std::time::Duration;
use crate::config::ConnectionOptions;
use crate::models::server::ServerInfo;
use crate::transport::query::QueryClient;
use crate::transport::QueryError;
use super::backend::{QueryBackend, QueryKind};

/// Polls a server over A2S. There is no session to go stale; a failed request
/// resolves the address again straight away instead.
pub struct ServerQueryBackend {
    address: String,
    timeout: Duration,
    client: Option<QueryClient>,
}

impl ServerQueryBackend {
    pub fn new(options: &ConnectionOptions) -> Self {
        Self {
            address: options.address.clone(),
            timeout: options.connect_timeout,
            client: None,
        }
    }
}

#[async_trait]
impl QueryBackend for ServerQueryBackend {
    type Reply = ServerInfo;

    const KIND: QueryKind = QueryKind::Info;

    async fn reconnect(&mut self) -> Result<(), QueryError> {
        self.client = None;
        debug!("Resolving server query address {}", self.address);
        self.client = Some(QueryClient::connect(&self.address, self.timeout).await?);
        Ok(())
    }

    async fn query(&mut self, kind: QueryKind) -> Result<ServerInfo, QueryError> {
        if kind != QueryKind::Info {
            return Err(QueryError::Unsupported(kind.as_str()));
        }
        if self.client.is_none() {
            self.reconnect().await?;
        }

        let client = self.client.as_ref().ok_or(QueryError::NotConnected)?;
        match client.info().await {
            Ok(info) => Ok(info),
            Err(e) => {
                error!("Server query to {} failed, reconnecting: {}", self.address, e);
                if let Err(reconnect_error) = self.reconnect().await {
                    debug!("Reconnecting to {} failed: {}", self.address, reconnect_error);
                }
                Err(e)
            }
        }
    }

    async fn close(&mut self) {
        self.client = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryMode;
    use crate::transport::query::tests::{sample_info, spawn_challenging_server, spawn_fake_server};

    fn options(address: &str, timeout: Duration) -> ConnectionOptions {
        ConnectionOptions {
            address: address.to_string(),
            mode: QueryMode::ServerQuery,
            rcon_password: String::new(),
            connect_timeout: timeout,
            cache_expiration: Duration::from_secs(10),
            cache_cleanup_interval: Duration::from_secs(11),
        }
    }

    #[tokio::test]
    async fn queries_info() {
        let address = spawn_challenging_server(sample_info()).await;
        let mut backend = ServerQueryBackend::new(&options(&address, Duration::from_secs(2)));
        assert_eq!(
            backend.query(QueryKind::Info).await.unwrap(),
            ServerInfo::from(sample_info())
        );
    }

    #[tokio::test]
    async fn malformed_reply_is_an_error_and_backend_recovers() {
        let encoded = sample_info().to_bytes();
        let mut first = true;
        let address = spawn_fake_server(move |_| {
            let reply = if first {
                // truncated S2A_INFO
                vec![0xFF, 0xFF, 0xFF, 0xFF, 0x49, 17, b'x']
            } else {
                encoded.clone()
            };
            first = false;
            Some(reply)
        })
        .await;

        let mut backend = ServerQueryBackend::new(&options(&address, Duration::from_secs(2)));
        assert!(matches!(
            backend.query(QueryKind::Info).await,
            Err(QueryError::Malformed(_))
        ));
        assert_eq!(
            backend.query(QueryKind::Info).await.unwrap(),
            ServerInfo::from(sample_info())
        );
    }

    #[tokio::test]
    async fn runt_reply_does_not_take_the_backend_down() {
        let encoded = sample_info().to_bytes();
        let mut first = true;
        let address = spawn_fake_server(move |_| {
            let reply = if first { vec![0x49] } else { encoded.clone() };
            first = false;
            Some(reply)
        })
        .await;

        let mut backend = ServerQueryBackend::new(&options(&address, Duration::from_secs(2)));
        assert!(backend.query(QueryKind::Info).await.is_err());
        assert_eq!(backend.query(QueryKind::Info).await.unwrap().name, "Ünïcode Server");
    }

    #[tokio::test]
    async fn status_is_unsupported() {
        let mut backend = ServerQueryBackend::new(&options("127.0.0.1:1", Duration::from_secs(1)));
        assert!(matches!(
            backend.query(QueryKind::Status).await,
            Err(QueryError::Unsupported("status"))
        ));
        backend.close().await;
    }
}
