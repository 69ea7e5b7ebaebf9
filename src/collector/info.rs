// src/collector/info.rs
use async_trait::async_trait;
use crate::connector::connection::Connection;
use crate::connector::ConnectorError;
use crate::metrics::{fq_name, Sample};
use super::Collector;

pub struct InfoCollector;

#[async_trait]
impl Collector for InfoCollector {
    fn name(&self) -> &'static str {
        "info"
    }

    async fn update(&self, connection: &dyn Connection, samples: &mut Vec<Sample>) -> Result<(), ConnectorError> {
        let hostname = connection.get_hostname().await?;
        let version = connection.get_version().await?;
        samples.push(
            Sample::gauge(fq_name("info", ""), "Hostname and version of the server.", 1.0)
                .label("server", connection.name())
                .label("hostname", hostname)
                .label("version", version),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::tests::stub_connection;

    #[tokio::test]
    async fn labels_hostname_and_version() {
        let status = "hostname: My \"Best\" Server\nversion : 1.38.7.9/13879 1293/8853 secure\n";
        let connection = stub_connection("alpha", "192.0.2.1:27015", status);
        let mut samples = Vec::new();
        InfoCollector.update(&connection, &mut samples).await.unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].labels[1], ("hostname", "My \"Best\" Server".to_string()));
        assert!(samples[0].labels[2].1.starts_with("1.38.7.9/13879"));
    }
}
