// src/models/server.rs
use std::collections::HashMap;
use crate::parser::{self, ParseError};

/// Players on a server keyed by their Steam identity token.
pub type Players = HashMap<String, Player>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Player {
    pub username: String,
    pub user_id: i64,
    pub steam_id: String,
    pub state: String,
    pub ping: u32,
    pub loss: u32,
    /// Empty while the player is still connecting or when the server redacts it.
    pub ip: String,
    /// 0 when no address was reported.
    pub conn_port: u16,
}

/// Player counts of a server. `humans` and `bots` are -1 when the server
/// only reports a total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerCount {
    pub current: u32,
    pub max: u32,
    pub humans: i64,
    pub bots: i64,
}

impl PlayerCount {
    pub const UNKNOWN: i64 = -1;

    /// Count from a dialect that only reports the total.
    pub fn from_total(current: u32, max: u32) -> Self {
        Self {
            current,
            max,
            humans: Self::UNKNOWN,
            bots: Self::UNKNOWN,
        }
    }

    /// Count from a dialect with a humans/bots breakdown. The total is always
    /// recomputed, whatever the server claims.
    pub fn from_breakdown(humans: u32, bots: u32, max: u32) -> Self {
        Self {
            current: humans.saturating_add(bots),
            max,
            humans: i64::from(humans),
            bots: i64::from(bots),
        }
    }
}

impl From<&ServerInfo> for PlayerCount {
    fn from(info: &ServerInfo) -> Self {
        // A2S reports bots as part of the player total.
        let humans = info.players.saturating_sub(info.bots);
        Self {
            current: u32::from(info.players),
            max: u32::from(info.max_players),
            humans: i64::from(humans),
            bots: i64::from(info.bots),
        }
    }
}

/// Everything one `status` command reveals about a server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub hostname: String,
    pub version: String,
    pub map: String,
    pub player_count: PlayerCount,
    pub players: Players,
}

impl ServerStatus {
    pub fn from_status_text(text: &str) -> Result<Self, ParseError> {
        let player_count = parser::parse_player_count(text)?;
        let players = match parser::parse_players(text) {
            Ok(players) => players,
            Err(ParseError::NoPlayers) => Players::new(),
            Err(e) => return Err(e),
        };

        Ok(Self {
            hostname: parser::parse_hostname(text),
            version: parser::parse_version(text),
            map: parser::parse_map(text),
            player_count,
            players,
        })
    }
}

/// Decoded A2S_INFO reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: u16,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    /// `b'd'`, `b'i'` or `b'p'`.
    pub server_type: u8,
    /// `b'l'`, `b'w'` or `b'm'`.
    pub environment: u8,
    /// Whether a password is required.
    pub visibility: bool,
    pub vac: bool,
    pub version: String,
}
