// src/connector/connection.rs
use async_trait::async_trait;
use log::{debug, trace};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use crate::config::ConnectionOptions;
use crate::models::server::{PlayerCount, Players};
use crate::transport::QueryError;
use super::backend::{QueryBackend, QueryKind, Snapshot};
use super::cache::TtlCache;
use super::ConnectorError;

/// What the collectors can ask of a configured server.
#[async_trait]
pub trait Connection: Send + Sync {
    fn name(&self) -> &str;

    fn address(&self) -> &str;

    async fn get_hostname(&self) -> Result<String, ConnectorError>;

    async fn get_version(&self) -> Result<String, ConnectorError>;

    async fn get_map(&self) -> Result<String, ConnectorError>;

    async fn get_player_count(&self) -> Result<PlayerCount, ConnectorError>;

    /// `Ok(None)` when the protocol cannot list players.
    async fn get_players(&self) -> Result<Option<Players>, ConnectorError>;

    async fn close(&self);
}

/// A backend plus a per-query reply cache.
///
/// The backend lock is held for the whole lookup, so concurrent callers for
/// the same query wait for the first one and then read its cached reply.
/// Closing takes the backend out for good; later lookups fail with
/// [`QueryError::NotConnected`].
pub struct CachedConnection<B: QueryBackend> {
    name: String,
    address: String,
    backend: tokio::sync::Mutex<Option<B>>,
    cache: Arc<Mutex<TtlCache<QueryKind, B::Reply>>>,
    sweeper: JoinHandle<()>,
}

impl<B: QueryBackend> CachedConnection<B> {
    /// Must be called from within a tokio runtime; the expiry sweeper is
    /// spawned onto it.
    pub fn new(name: &str, options: &ConnectionOptions, backend: B) -> Self {
        let cache = Arc::new(Mutex::new(TtlCache::new(options.cache_expiration)));
        let sweeper = tokio::spawn(sweep(
            name.to_string(),
            Arc::downgrade(&cache),
            options.cache_cleanup_interval,
        ));

        Self {
            name: name.to_string(),
            address: options.address.clone(),
            backend: tokio::sync::Mutex::new(Some(backend)),
            cache,
            sweeper,
        }
    }

    pub async fn get(&self, key: QueryKind) -> Result<B::Reply, QueryError> {
        let mut guard = self.backend.lock().await;
        let backend = guard.as_mut().ok_or(QueryError::NotConnected)?;
        let cached = self.cache.lock().get(&key);
        if let Some(reply) = cached {
            trace!("Cache hit for {} on {}", key.as_str(), self.name);
            return Ok(reply);
        }

        let reply = backend.query(key).await?;
        self.cache.lock().insert(key, reply.clone());
        Ok(reply)
    }

    async fn snapshot(&self) -> Result<B::Reply, ConnectorError> {
        Ok(self.get(B::KIND).await?)
    }

    #[cfg(test)]
    pub(crate) fn cached_entries(&self) -> usize {
        self.cache.lock().len()
    }
}

async fn sweep<K, V>(name: String, cache: Weak<Mutex<TtlCache<K, V>>>, every: Duration)
where
    K: Eq + std::hash::Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    let mut interval = tokio::time::interval(every.max(Duration::from_millis(1)));
    loop {
        interval.tick().await;
        let Some(entries) = cache.upgrade() else {
            break;
        };
        let removed = entries.lock().purge_expired();
        if removed > 0 {
            trace!("Swept {} expired cache entries for {}", removed, name);
        }
    }
}

impl<B: QueryBackend> Drop for CachedConnection<B> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

#[async_trait]
impl<B: QueryBackend> Connection for CachedConnection<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn get_hostname(&self) -> Result<String, ConnectorError> {
        Ok(self.snapshot().await?.hostname())
    }

    async fn get_version(&self) -> Result<String, ConnectorError> {
        Ok(self.snapshot().await?.version())
    }

    async fn get_map(&self) -> Result<String, ConnectorError> {
        Ok(self.snapshot().await?.map())
    }

    async fn get_player_count(&self) -> Result<PlayerCount, ConnectorError> {
        Ok(self.snapshot().await?.player_count()?)
    }

    async fn get_players(&self) -> Result<Option<Players>, ConnectorError> {
        Ok(self.snapshot().await?.players()?)
    }

    async fn close(&self) {
        self.sweeper.abort();
        let mut guard = self.backend.lock().await;
        if let Some(mut backend) = guard.take() {
            backend.close().await;
        }
        self.cache.lock().clear();
        debug!("Closed connection {} ({})", self.name, self.address);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::QueryMode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const STATUS: &str = "hostname: Stub\n\
        map     : de_train\n\
        players : 1 humans, 1 bots (10 max)\n\
        #  2 \"Stub\" STEAM_0:0:1 00:10 20 0 active 10.0.0.1:27005\n";

    /// Backend that answers from memory and counts its round trips.
    pub(crate) struct StubBackend {
        pub calls: Arc<AtomicUsize>,
        pub reply: String,
        pub latency: Duration,
        pub failures: usize,
    }

    impl StubBackend {
        pub(crate) fn new(reply: &str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let backend = Self {
                calls: calls.clone(),
                reply: reply.to_string(),
                latency: Duration::ZERO,
                failures: 0,
            };
            (backend, calls)
        }
    }

    #[async_trait]
    impl QueryBackend for StubBackend {
        type Reply = String;

        const KIND: QueryKind = QueryKind::Status;

        async fn reconnect(&mut self) -> Result<(), QueryError> {
            Ok(())
        }

        async fn query(&mut self, _kind: QueryKind) -> Result<String, QueryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.failures > 0 {
                self.failures -= 1;
                return Err(QueryError::Timeout(Duration::from_secs(1)));
            }
            Ok(self.reply.clone())
        }

        async fn close(&mut self) {}
    }

    pub(crate) fn options(address: &str) -> ConnectionOptions {
        ConnectionOptions {
            address: address.to_string(),
            mode: QueryMode::Rcon,
            rcon_password: "secret".to_string(),
            connect_timeout: Duration::from_secs(1),
            cache_expiration: Duration::from_secs(10),
            cache_cleanup_interval: Duration::from_secs(11),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cache_hit_skips_backend() {
        let (backend, calls) = StubBackend::new(STATUS);
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        assert_eq!(connection.get_map().await.unwrap(), "de_train");
        assert_eq!(connection.get_map().await.unwrap(), "de_train");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // every accessor reads the same cached status
        assert_eq!(connection.get_player_count().await.unwrap().current, 2);
        assert_eq!(connection.get_players().await.unwrap().unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_refetches() {
        let (backend, calls) = StubBackend::new(STATUS);
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        connection.get_map().await.unwrap();
        connection.get_map().await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        connection.get_map().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_not_cached() {
        let (mut backend, calls) = StubBackend::new(STATUS);
        backend.failures = 1;
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        assert!(matches!(
            connection.get_map().await,
            Err(ConnectorError::Query(QueryError::Timeout(_)))
        ));
        assert_eq!(connection.get_map().await.unwrap(), "de_train");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn parse_errors_reach_the_caller() {
        let (backend, _) = StubBackend::new("hostname: broken");
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        assert_eq!(connection.get_map().await.unwrap(), "");
        assert!(matches!(connection.get_player_count().await, Err(ConnectorError::Parse(_))));
        assert!(matches!(connection.get_players().await, Err(ConnectorError::Parse(_))));
        assert_eq!(connection.get_hostname().await.unwrap(), "broken");
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_request() {
        let (mut backend, calls) = StubBackend::new(STATUS);
        backend.latency = Duration::from_millis(500);
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        let (map, count, players) = tokio::join!(
            connection.get_map(),
            connection.get_player_count(),
            connection.get_players()
        );
        assert!(map.is_ok() && count.is_ok() && players.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_reaps_without_reads() {
        let (backend, _) = StubBackend::new(STATUS);
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        connection.get_map().await.unwrap();
        assert_eq!(connection.cached_entries(), 1);

        tokio::time::sleep(Duration::from_secs(23)).await;
        assert_eq!(connection.cached_entries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn close_drops_cache() {
        let (backend, calls) = StubBackend::new(STATUS);
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        connection.get_map().await.unwrap();
        connection.close().await;
        connection.close().await;
        assert_eq!(connection.cached_entries(), 0);

        assert!(matches!(
            connection.get_map().await,
            Err(ConnectorError::Query(QueryError::NotConnected))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_waits_for_the_request_in_flight() {
        let (mut backend, calls) = StubBackend::new(STATUS);
        backend.latency = Duration::from_millis(500);
        let connection = CachedConnection::new("stub", &options("192.0.2.1:27015"), backend);

        let (map, ()) = tokio::join!(connection.get_map(), async {
            tokio::task::yield_now().await;
            connection.close().await;
        });
        assert_eq!(map.unwrap(), "de_train");
        assert!(connection.get_hostname().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(connection.cached_entries(), 0);
    }
}
