use anyhow::Result;
use futures::future::BoxFuture;
use prometheus::Registry;
use sqlx::MySqlPool;
use std::collections::HashMap;

#[macro_use]
mod register_macro;

pub mod samples;

use samples::MetricSink;

pub trait Collector {
    /// Stable unique name, also used for the CLI enable/disable flags.
    fn name(&self) -> &'static str;

    /// Human-readable description of what the collector scrapes.
    fn help(&self) -> &'static str;

    /// Minimum server version the collector supports, formatted as
    /// `major * 10000 + minor * 100 + patch`. 0 means any version; the
    /// orchestrator skips collectors whose minimum exceeds the connected
    /// server's version.
    fn min_server_version(&self) -> i32 {
        0
    }

    /// Register live metrics with the prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if any metric fails to register.
    fn register_metrics(&self, registry: &Registry) -> Result<()>;

    fn collect<'a>(
        &'a self,
        pool: &'a MySqlPool,
        sink: &'a mut (dyn MetricSink + Send),
    ) -> BoxFuture<'a, Result<()>>;

    fn enabled_by_default(&self) -> bool {
        false
    }
}

pub mod util;

register_collectors! {
    global_status => GlobalStatusCollector,
    version => VersionCollector,
    exporter => ExporterCollector,
}

pub mod config;
pub mod registry;
