// src/collector/players.rs
use async_trait::async_trait;
use crate::connector::connection::Connection;
use crate::connector::ConnectorError;
use crate::metrics::{fq_name, Sample};
use super::Collector;

/// Per-player gauges labelled by steam id. Servers polled over the query
/// protocol cannot list players and report nothing here.
pub struct PlayersCollector;

#[async_trait]
impl Collector for PlayersCollector {
    fn name(&self) -> &'static str {
        "players"
    }

    async fn update(&self, connection: &dyn Connection, samples: &mut Vec<Sample>) -> Result<(), ConnectorError> {
        let Some(players) = connection.get_players().await? else {
            return Ok(());
        };

        let mut players: Vec<_> = players.into_values().collect();
        players.sort_by(|a, b| a.steam_id.cmp(&b.steam_id));

        let server = connection.name();
        for player in players {
            samples.push(
                Sample::gauge(fq_name("players", "online"), "The current players on the server.", 1.0)
                    .label("server", server)
                    .label("steamid", player.steam_id.as_str()),
            );
            samples.push(
                Sample::gauge(
                    fq_name("players", "ping"),
                    "The current players ping on the server.",
                    player.ping as f64,
                )
                .label("server", server)
                .label("steamid", player.steam_id.as_str()),
            );
            samples.push(
                Sample::gauge(
                    fq_name("players", "loss"),
                    "The current players loss on the server.",
                    player.loss as f64,
                )
                .label("server", server)
                .label("steamid", player.steam_id),
            );
        }
        Ok(())
    }
}
