use super::super::common;
use anyhow::Result;
use mysql_exporter::collectors::Collector;
use mysql_exporter::collectors::samples::SampleBuffer;
use mysql_exporter::collectors::version::VersionCollector;
use prometheus::Registry;

#[tokio::test]
async fn test_version_collector_registers_without_error() -> Result<()> {
    let collector = VersionCollector::new();
    let registry = Registry::new();

    collector.register_metrics(&registry)?;

    Ok(())
}

#[tokio::test]
async fn test_version_collector_sets_version_metrics() -> Result<()> {
    let Some(pool) = common::try_create_test_pool().await else {
        return Ok(());
    };

    let collector = VersionCollector::new();
    let registry = Registry::new();
    collector.register_metrics(&registry)?;

    let mut buffer = SampleBuffer::new();
    collector.collect(&pool, &mut buffer).await?;

    let metric_families = registry.gather();

    let info = metric_families
        .iter()
        .find(|m| m.name() == "mysql_version_info")
        .expect("mysql_version_info should exist");
    assert!(!info.get_metric().is_empty());

    let num = metric_families
        .iter()
        .find(|m| m.name() == "mysql_version_num")
        .expect("mysql_version_num should exist");
    let value = num.get_metric()[0].get_gauge().value.unwrap_or(0.0);
    assert!(value > 0.0, "version number should be positive, got {value}");

    pool.close().await;
    Ok(())
}
