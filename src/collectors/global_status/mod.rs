use crate::collectors::Collector;
use crate::collectors::samples::{MetricSample, MetricSink};
use anyhow::Result;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use prometheus::Registry;
use sqlx::{MySqlPool, Row};
use tracing::{info_span, instrument};
use tracing_futures::Instrument as _;

pub mod classify;

use classify::{Decision, classify, normalize_name, parse_status_value};

const GLOBAL_STATUS_QUERY: &str = "SHOW GLOBAL STATUS";

/// Scrapes `SHOW GLOBAL STATUS` and emits one sample per exported status
/// variable.
///
/// Rows are consumed in the order the server returns them (that order is
/// server-dependent and carries no meaning); samples are emitted in the same
/// order. The whole pass is a single cursor over one query: a query failure
/// or a row that does not decode into its two text columns aborts the pass,
/// while samples already handed to the sink stay delivered.
#[derive(Clone, Copy, Default)]
pub struct GlobalStatusCollector;

impl GlobalStatusCollector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn process_row(name: &str, raw_value: &str, sink: &mut dyn MetricSink) {
        // Unparsable values are skipped silently, not errors.
        let Some(value) = parse_status_value(raw_value) else {
            return;
        };

        let name = normalize_name(name);
        match classify(&name) {
            Decision::Emit { desc, label_values } => {
                sink.emit(MetricSample::new(desc, value, label_values));
            }
            Decision::Suppress => {}
        }
    }
}

impl Collector for GlobalStatusCollector {
    fn name(&self) -> &'static str {
        "global_status"
    }

    fn help(&self) -> &'static str {
        "Collect from SHOW GLOBAL STATUS"
    }

    fn min_server_version(&self) -> i32 {
        50_100
    }

    fn register_metrics(&self, _registry: &Registry) -> Result<()> {
        // Samples are emitted per scrape; there are no live metrics to
        // pre-register.
        Ok(())
    }

    #[instrument(skip(self, pool, sink), level = "info", err, fields(collector = "global_status", otel.kind = "internal"))]
    fn collect<'a>(
        &'a self,
        pool: &'a MySqlPool,
        sink: &'a mut (dyn MetricSink + Send),
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let span = info_span!(
                "db.query",
                db.system = "mysql",
                db.operation = "SHOW",
                db.statement = GLOBAL_STATUS_QUERY,
                otel.kind = "client"
            );

            async move {
                let mut rows = sqlx::query(GLOBAL_STATUS_QUERY).fetch(pool);

                while let Some(row) = rows.try_next().await? {
                    let name: String = row.try_get("Variable_name")?;
                    let raw_value: String = row.try_get("Value")?;
                    Self::process_row(&name, &raw_value, sink);
                }

                Ok(())
            }
            .instrument(span)
            .await
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
