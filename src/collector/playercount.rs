// src/collector/playercount.rs
use async_trait::async_trait;
use crate::connector::connection::Connection;
use crate::connector::ConnectorError;
use crate::metrics::{fq_name, Sample};
use crate::models::server::PlayerCount;
use super::Collector;

pub struct PlayerCountCollector;

#[async_trait]
impl Collector for PlayerCountCollector {
    fn name(&self) -> &'static str {
        "playercount"
    }

    async fn update(&self, connection: &dyn Connection, samples: &mut Vec<Sample>) -> Result<(), ConnectorError> {
        let count = connection.get_player_count().await?;
        let server = connection.name();

        samples.push(
            Sample::gauge(
                fq_name("playercount", "current"),
                "The current count of players on the server.",
                count.current as f64,
            )
            .label("server", server),
        );
        samples.push(
            Sample::gauge(
                fq_name("playercount", "limit"),
                "The limit of players on the server.",
                count.max as f64,
            )
            .label("server", server),
        );
        if count.humans != PlayerCount::UNKNOWN {
            samples.push(
                Sample::gauge(
                    fq_name("playercount", "humans"),
                    "The current count of human players on the server.",
                    count.humans as f64,
                )
                .label("server", server),
            );
        }
        if count.bots != PlayerCount::UNKNOWN {
            samples.push(
                Sample::gauge(
                    fq_name("playercount", "bots"),
                    "The current count of bot players on the server.",
                    count.bots as f64,
                )
                .label("server", server),
            );
        }
        Ok(())
    }
}
