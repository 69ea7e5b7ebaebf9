// src/parser.rs
//! Parsing of the text a server answers to the `status` console command.
//!
//! Engine builds disagree on the exact layout, so every field accepts the
//! union of the known dialects. Nothing in here panics on odd input: a field
//! that cannot be found comes back empty, or as a [`ParseError`] for the
//! fields callers cannot do without.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use thiserror::Error;
use crate::models::server::{Player, PlayerCount, Players};

lazy_static! {
    static ref HOSTNAME_RE: Regex = Regex::new(r"^hostname[ \t]*:[ \t]*(.*)$").unwrap();
    static ref VERSION_RE: Regex = Regex::new(r"^version[ \t]*:[ \t]*(.*)$").unwrap();
    static ref MAP_RE: Regex = Regex::new(r"^map[ \t]*:[ \t]*([A-Za-z0-9_-]+)").unwrap();
    static ref PLAYER_TOTAL_RE: Regex =
        Regex::new(r"^players[ \t]*:[ \t]*(\d+)[ \t]*\((\d+)[ \t]*max\)").unwrap();
    static ref PLAYER_BREAKDOWN_RE: Regex = Regex::new(
        r"^players[ \t]*:[ \t]*(?:\d+[ \t]+)?(\d+) humans,[ \t]*(\d+) bots[ \t]*\((\d+)(?:/\d+)?[ \t]*max\)"
    ).unwrap();
    static ref PLAYER_RE: Regex = Regex::new(concat!(
        r"^#\s*(?P<userid>\d+)(?:\s+\d+)?",
        r#"\s+"(?P<username>.*)""#,
        r"\s+(?P<steamid>\S+)",
        r"\s+[0-9:]+",
        r"\s+(?P<ping>\d+)\s+(?P<loss>\d+)\s+(?P<state>[a-z]+)(?:\s+\d+)?",
        r"(?:\s+(?P<ip>\d{1,3}(?:\.\d{1,3}){3}):(?P<port>\d+))?\s*$",
    )).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no player count found in input")]
    NoPlayerCount,
    #[error("no players found in input")]
    NoPlayers,
}

fn first_capture(re: &Regex, input: &str) -> String {
    input
        .lines()
        .find_map(|line| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

pub fn parse_hostname(input: &str) -> String {
    first_capture(&HOSTNAME_RE, input)
}

pub fn parse_version(input: &str) -> String {
    first_capture(&VERSION_RE, input)
}

/// Map identifier only; trailing data such as spawn coordinates is dropped.
pub fn parse_map(input: &str) -> String {
    first_capture(&MAP_RE, input)
}

fn number<T: std::str::FromStr>(caps: &Captures, index: usize) -> Option<T> {
    caps.get(index)?.as_str().parse().ok()
}

fn player_count_from_line(line: &str) -> Option<PlayerCount> {
    if let Some(caps) = PLAYER_BREAKDOWN_RE.captures(line) {
        return Some(PlayerCount::from_breakdown(
            number(&caps, 1)?,
            number(&caps, 2)?,
            number(&caps, 3)?,
        ));
    }
    let caps = PLAYER_TOTAL_RE.captures(line)?;
    Some(PlayerCount::from_total(number(&caps, 1)?, number(&caps, 2)?))
}

pub fn parse_player_count(input: &str) -> Result<PlayerCount, ParseError> {
    input
        .lines()
        .find_map(player_count_from_line)
        .ok_or(ParseError::NoPlayerCount)
}

fn named<'a>(caps: &Captures<'a>, name: &str) -> &'a str {
    caps.name(name).map(|m| m.as_str()).unwrap_or_default()
}

fn player_from_line(line: &str) -> Option<Player> {
    let caps = PLAYER_RE.captures(line)?;

    let conn_port = match caps.name("port") {
        Some(port) => port.as_str().parse().ok()?,
        None => 0,
    };

    Some(Player {
        username: named(&caps, "username").to_string(),
        user_id: named(&caps, "userid").parse().ok()?,
        steam_id: named(&caps, "steamid").to_string(),
        state: named(&caps, "state").to_string(),
        ping: named(&caps, "ping").parse().ok()?,
        loss: named(&caps, "loss").parse().ok()?,
        ip: named(&caps, "ip").to_string(),
        conn_port,
    })
}

/// Lines that look like a player entry but do not parse are skipped. Only a
/// listing without a single usable entry is an error.
pub fn parse_players(input: &str) -> Result<Players, ParseError> {
    let input = input.replace('\0', "");

    let players: Players = input
        .lines()
        .filter_map(player_from_line)
        .map(|player| (player.steam_id.clone(), player))
        .collect();

    if players.is_empty() {
        return Err(ParseError::NoPlayers);
    }
    Ok(players)
}
