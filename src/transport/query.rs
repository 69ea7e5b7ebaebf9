// src/transport/query.rs
//! A2S_INFO client for the connectionless Source server query protocol,
//! backed by the `a2s` crate.

use a2s::errors::Error as A2SError;
use a2s::info::Info;
use a2s::A2SClient;
use log::trace;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::lookup_host;
use crate::models::server::ServerInfo;
use super::{with_timeout, QueryError};

impl From<Info> for ServerInfo {
    fn from(info: Info) -> Self {
        Self {
            protocol: info.protocol,
            name: info.name,
            map: info.map,
            folder: info.folder,
            game: info.game,
            app_id: info.app_id,
            players: info.players,
            max_players: info.max_players,
            bots: info.bots,
            server_type: info.server_type as u8,
            environment: info.server_os as u8,
            visibility: info.visibility,
            vac: info.vac,
            version: info.version,
        }
    }
}

fn query_error(e: A2SError, limit: Duration) -> QueryError {
    match e {
        A2SError::Io(e) if e.kind() == ErrorKind::UnexpectedEof => {
            QueryError::Malformed("truncated reply".to_string())
        }
        A2SError::Io(e) => QueryError::Io(e),
        A2SError::ErrTimeout => QueryError::Timeout(limit),
        other => QueryError::Malformed(other.to_string()),
    }
}

pub struct QueryClient {
    target: SocketAddr,
    timeout: Duration,
}

impl QueryClient {
    /// Resolves `address`. Nothing is sent yet.
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self, QueryError> {
        let mut candidates = with_timeout(timeout, async {
            lookup_host(address).await.map_err(QueryError::from)
        })
        .await?;

        // a2s sends from an IPv4 wildcard socket
        let target = candidates
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| QueryError::Resolve(address.to_string()))?;

        Ok(Self { target, timeout })
    }

    pub async fn info(&self) -> Result<ServerInfo, QueryError> {
        let target = self.target;
        let limit = self.timeout;

        // a2s indexes into short datagrams without checking their length, so
        // the request runs on its own task where a panic stays contained.
        let request = tokio::spawn(async move {
            let client = A2SClient::new().await?;
            let info = client.info(target).await?;
            Ok::<Info, A2SError>(info)
        });
        let abort = request.abort_handle();

        let result = with_timeout(limit, async {
            match request.await {
                Ok(reply) => reply.map_err(|e| query_error(e, limit)),
                Err(e) if e.is_panic() => {
                    trace!("Server query task for {} panicked", target);
                    Err(QueryError::Malformed("reply could not be decoded".to_string()))
                }
                Err(e) => Err(QueryError::Malformed(e.to_string())),
            }
        })
        .await;

        abort.abort();
        result.map(ServerInfo::from)
    }
}
