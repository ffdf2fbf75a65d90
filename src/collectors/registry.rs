//! Collector orchestration: owns the prometheus registry, the enabled
//! collectors and the scrape lifecycle for one `/metrics` request.

use crate::collectors::config::CollectorConfig;
use crate::collectors::exporter::ScraperCollector;
use crate::collectors::samples::SampleBuffer;
use crate::collectors::{COLLECTOR_NAMES, Collector, CollectorType, all_factories, util};
use anyhow::Result;
use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, instrument, warn};
use tracing_futures::Instrument as _;

/// Upper bound for one collector pass. A scrape that exceeds it is aborted
/// (the row cursor is dropped with the cancelled future) and recorded as a
/// scrape error.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CollectorRegistry {
    registry: Registry,
    collectors: Vec<CollectorType>,
    scraper: Option<Arc<ScraperCollector>>,
    up: IntGauge,
}

impl CollectorRegistry {
    /// Build the registry from the enabled-collector configuration.
    ///
    /// Collectors are instantiated in declaration order so the exposition is
    /// deterministic. A collector whose metrics fail to register is left out
    /// rather than taking the exporter down.
    #[must_use]
    #[allow(clippy::expect_used)]
    ///
    /// # Panics
    ///
    /// Panics if the `mysql_up` metric cannot be created (static name).
    pub fn new(config: &CollectorConfig) -> Self {
        let registry = Registry::new();

        let up = IntGauge::new("mysql_up", "Whether the MySQL server is reachable (1/0)")
            .expect("valid mysql_up metric");
        if let Err(e) = registry.register(Box::new(up.clone())) {
            warn!(error = %e, "failed to register mysql_up");
        }

        let factories = all_factories();
        let mut collectors = Vec::new();
        let mut scraper = None;

        for name in COLLECTOR_NAMES {
            if !config.is_enabled(name) {
                continue;
            }
            let Some(factory) = factories.get(name) else {
                continue;
            };
            let collector = factory();

            if let Err(e) = collector.register_metrics(&registry) {
                warn!(collector = name, error = %e, "failed to register metrics; collector disabled");
                continue;
            }
            if let Some(s) = collector.get_scraper() {
                scraper = Some(s);
            }

            debug!(collector = name, help = collector.help(), "collector enabled");
            collectors.push(collector);
        }

        Self {
            registry,
            collectors,
            scraper,
            up,
        }
    }

    /// Names of the collectors that made it into this registry.
    #[must_use]
    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(Collector::name).collect()
    }

    /// Run every enabled collector once and return the encoded metrics
    /// exposition text.
    ///
    /// Collectors run sequentially, each under a scrape timeout. A failing
    /// collector is recorded in the scrape error metrics and the remaining
    /// collectors still run; samples a collector emitted before failing stay
    /// in the output.
    ///
    /// # Errors
    ///
    /// Returns an error only if the gathered families cannot be encoded.
    #[instrument(skip(self, pool), level = "info")]
    pub async fn collect_all(&self, pool: &MySqlPool) -> Result<String> {
        if let Some(scraper) = &self.scraper {
            scraper.increment_scrapes();
        }

        let mut buffer = SampleBuffer::new();

        if self.ping(pool).await {
            self.up.set(1);
            self.run_collectors(pool, &mut buffer).await;
        } else {
            self.up.set(0);
        }

        let mut families = self.registry.gather();
        families.extend(buffer.into_families());

        if let Some(scraper) = &self.scraper {
            let count = families.iter().map(|f| f.get_metric().len()).sum::<usize>();
            scraper.update_metrics_count(i64::try_from(count).unwrap_or(i64::MAX));
        }

        let encoder = TextEncoder::new();
        let mut output = Vec::new();
        encoder.encode(&families, &mut output)?;
        Ok(String::from_utf8(output)?)
    }

    async fn ping(&self, pool: &MySqlPool) -> bool {
        let span = info_span!(
            "db.query",
            db.system = "mysql",
            db.operation = "SELECT",
            db.statement = "SELECT 1",
            otel.kind = "client"
        );

        match sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(pool)
            .instrument(span)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "server unreachable; skipping collectors");
                false
            }
        }
    }

    async fn run_collectors(&self, pool: &MySqlPool, buffer: &mut SampleBuffer) {
        let server_version = util::get_server_version();

        for collector in &self.collectors {
            if server_version > 0 && collector.min_server_version() > server_version {
                debug!(
                    collector = collector.name(),
                    min_version = collector.min_server_version(),
                    server_version,
                    "server version below collector minimum; skipping"
                );
                continue;
            }

            let timer = self
                .scraper
                .as_ref()
                .map(|s| s.start_scrape(collector.name()));

            match tokio::time::timeout(SCRAPE_TIMEOUT, collector.collect(pool, &mut *buffer)).await {
                Ok(Ok(())) => {
                    if let Some(timer) = timer {
                        timer.success();
                    }
                }
                Ok(Err(e)) => {
                    warn!(collector = collector.name(), error = %e, "scrape failed");
                    if let Some(timer) = timer {
                        timer.error();
                    }
                }
                Err(_) => {
                    warn!(
                        collector = collector.name(),
                        timeout_secs = SCRAPE_TIMEOUT.as_secs(),
                        "scrape timed out"
                    );
                    if let Some(timer) = timer {
                        timer.error();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use sqlx::mysql::MySqlPoolOptions;

    fn unreachable_pool() -> MySqlPool {
        MySqlPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy("mysql://root@127.0.0.1:1/mysql")
            .expect("valid lazy pool")
    }

    fn all_enabled() -> CollectorConfig {
        CollectorConfig::all()
    }

    #[test]
    fn test_new_respects_enabled_set() {
        let config = CollectorConfig::new().with_enabled(&["global_status".to_string()]);
        let registry = CollectorRegistry::new(&config);
        assert_eq!(registry.collector_names(), vec!["global_status"]);
        assert!(registry.scraper.is_none());
    }

    #[test]
    fn test_new_with_exporter_exposes_scraper() {
        let registry = CollectorRegistry::new(&all_enabled());
        assert!(registry.scraper.is_some());
        assert_eq!(
            registry.collector_names(),
            vec!["global_status", "version", "exporter"]
        );
    }

    #[tokio::test]
    async fn test_collect_all_without_database_reports_down() {
        let registry = CollectorRegistry::new(&all_enabled());
        let pool = unreachable_pool();

        let text = registry.collect_all(&pool).await.expect("encoded output");

        assert!(text.contains("mysql_up 0"));
        // Self metrics are exposed even when the server is down.
        assert!(text.contains("mysql_exporter_scrapes_total 1"));
        // No collector ran, so no status samples appear.
        assert!(!text.contains("mysql_global_status_"));
    }

    #[tokio::test]
    async fn test_collect_all_counts_scrapes() {
        let registry = CollectorRegistry::new(&all_enabled());
        let pool = unreachable_pool();

        registry.collect_all(&pool).await.expect("first scrape");
        let text = registry.collect_all(&pool).await.expect("second scrape");

        assert!(text.contains("mysql_exporter_scrapes_total 2"));
    }
}
