// src/transport/rcon.rs
//! Source RCON sessions on top of the `rcon` crate.
//!
//! Long command output arrives split over several packets. The session sends
//! an empty command after each real one and reads until that echo comes back.

use log::{debug, trace};
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;
use super::{with_timeout, QueryError};

impl From<rcon::Error> for QueryError {
    fn from(e: rcon::Error) -> Self {
        match e {
            rcon::Error::Auth => QueryError::AuthFailed,
            rcon::Error::Io(e) if e.kind() == ErrorKind::InvalidData => {
                QueryError::Malformed("reply body is not valid UTF-8".to_string())
            }
            rcon::Error::Io(e) => QueryError::Io(e),
            rcon::Error::CommandTooLong => QueryError::Malformed("command is too long".to_string()),
        }
    }
}

/// An authenticated RCON session. Every exchange is bounded by the timeout
/// given to [`RconClient::connect`].
pub struct RconClient {
    session: rcon::Connection<TcpStream>,
    timeout: Duration,
}

impl RconClient {
    pub async fn connect(address: &str, password: &str, timeout: Duration) -> Result<Self, QueryError> {
        // The plain constructor turns on Minecraft quirks; Source needs none.
        let session = with_timeout(timeout, async {
            rcon::Connection::<TcpStream>::builder()
                .connect(address, password)
                .await
                .map_err(QueryError::from)
        })
        .await?;

        debug!("Authenticated rcon session with {}", address);
        Ok(Self { session, timeout })
    }

    /// Runs `command` and returns its complete output.
    pub async fn exec(&mut self, command: &str) -> Result<String, QueryError> {
        let session = &mut self.session;
        with_timeout(self.timeout, async { session.cmd(command).await.map_err(QueryError::from) }).await
    }

    pub fn close(self) {
        trace!("Dropping rcon session");
    }
}
