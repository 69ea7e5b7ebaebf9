// src/connector/backend.rs
use async_trait::async_trait;
use crate::models::server::{PlayerCount, Players, ServerInfo};
use crate::parser::{self, ParseError};
use crate::transport::QueryError;

/// Everything a connection can ask a server for. Doubles as the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Output of the `status` console command.
    Status,
    /// Structured A2S_INFO reply.
    Info,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Info => "data",
        }
    }
}

/// One protocol-specific link to one server.
///
/// Backends do not retry and do not cache; both are up to the caller.
#[async_trait]
pub trait QueryBackend: Send + 'static {
    type Reply: Snapshot + Clone + Send + Sync + 'static;

    /// The query that produces everything the accessors need.
    const KIND: QueryKind;

    async fn reconnect(&mut self) -> Result<(), QueryError>;

    async fn query(&mut self, kind: QueryKind) -> Result<Self::Reply, QueryError>;

    /// Must be safe to call on a backend that is closed or never connected.
    async fn close(&mut self);
}

/// Typed views over a backend reply.
pub trait Snapshot {
    fn hostname(&self) -> String;
    fn version(&self) -> String;
    fn map(&self) -> String;
    fn player_count(&self) -> Result<PlayerCount, ParseError>;
    /// `None` when the protocol cannot list players at all.
    fn players(&self) -> Result<Option<Players>, ParseError>;
}

impl Snapshot for String {
    fn hostname(&self) -> String {
        parser::parse_hostname(self)
    }

    fn version(&self) -> String {
        parser::parse_version(self)
    }

    fn map(&self) -> String {
        parser::parse_map(self)
    }

    fn player_count(&self) -> Result<PlayerCount, ParseError> {
        parser::parse_player_count(self)
    }

    fn players(&self) -> Result<Option<Players>, ParseError> {
        parser::parse_players(self).map(Some)
    }
}

impl Snapshot for ServerInfo {
    fn hostname(&self) -> String {
        self.name.clone()
    }

    fn version(&self) -> String {
        self.version.clone()
    }

    fn map(&self) -> String {
        self.map.clone()
    }

    fn player_count(&self) -> Result<PlayerCount, ParseError> {
        Ok(PlayerCount::from(self))
    }

    fn players(&self) -> Result<Option<Players>, ParseError> {
        Ok(None)
    }
}
