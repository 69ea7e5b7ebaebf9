// src/collector/map.rs
use async_trait::async_trait;
use crate::connector::connection::Connection;
use crate::connector::ConnectorError;
use crate::metrics::{fq_name, Sample};
use super::Collector;

/// `srcds_map{server,map} 1`
pub struct MapCollector;

#[async_trait]
impl Collector for MapCollector {
    fn name(&self) -> &'static str {
        "map"
    }

    async fn update(&self, connection: &dyn Connection, samples: &mut Vec<Sample>) -> Result<(), ConnectorError> {
        let map = connection.get_map().await?;
        samples.push(
            Sample::gauge(fq_name("map", ""), "The current map on the server.", 1.0)
                .label("server", connection.name())
                .label("map", map),
        );
        Ok(())
    }
}
