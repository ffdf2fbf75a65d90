use super::super::common;
use anyhow::Result;
use mysql_exporter::collectors::Collector;
use mysql_exporter::collectors::global_status::GlobalStatusCollector;
use mysql_exporter::collectors::samples::{MetricKind, SampleBuffer};
use prometheus::{Encoder, TextEncoder};

#[tokio::test]
async fn test_global_status_collector_emits_samples() -> Result<()> {
    let Some(pool) = common::try_create_test_pool().await else {
        return Ok(());
    };

    let collector = GlobalStatusCollector::new();
    let mut buffer = SampleBuffer::new();

    collector.collect(&pool, &mut buffer).await?;

    assert!(
        !buffer.is_empty(),
        "SHOW GLOBAL STATUS should yield at least one exportable variable"
    );

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_global_status_label_arity_invariant() -> Result<()> {
    let Some(pool) = common::try_create_test_pool().await else {
        return Ok(());
    };

    let collector = GlobalStatusCollector::new();
    let mut buffer = SampleBuffer::new();
    collector.collect(&pool, &mut buffer).await?;

    for sample in buffer.samples() {
        assert_eq!(
            sample.desc().label_names().len(),
            sample.label_values().len(),
            "label arity mismatch in {}",
            sample.desc().fq_name()
        );
    }

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_global_status_known_families() -> Result<()> {
    let Some(pool) = common::try_create_test_pool().await else {
        return Ok(());
    };

    let collector = GlobalStatusCollector::new();
    let mut buffer = SampleBuffer::new();
    collector.collect(&pool, &mut buffer).await?;

    // Uptime is always reported and takes the generic fallback path.
    let uptime = buffer
        .samples()
        .iter()
        .find(|s| s.desc().fq_name() == "mysql_global_status_uptime")
        .expect("uptime sample should exist");
    assert_eq!(uptime.desc().kind(), MetricKind::Untyped);
    assert!(uptime.value() > 0.0);

    // Handlers are always reported and share one labeled counter family.
    assert!(
        buffer
            .samples()
            .iter()
            .any(|s| s.desc().fq_name() == "mysql_global_status_handlers_total"),
        "handler samples should exist"
    );

    // Reserved families are suppressed.
    assert!(
        !buffer
            .samples()
            .iter()
            .any(|s| s.desc().fq_name().starts_with("mysql_global_status_ssl_")),
        "ssl variables should be suppressed"
    );

    // Only allow-listed commands appear in the commands family.
    let allowed = [
        "begin",
        "commit",
        "rollback",
        "create_trigger",
        "create_view",
        "group_replication_start",
        "group_replication_stop",
    ];
    for sample in buffer
        .samples()
        .iter()
        .filter(|s| s.desc().fq_name() == "mysql_global_status_commands_total")
    {
        let label = sample.label_values().first().expect("command label");
        assert!(
            allowed.contains(&label.as_str()),
            "unexpected command label {label}"
        );
    }

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn test_global_status_samples_encode() -> Result<()> {
    let Some(pool) = common::try_create_test_pool().await else {
        return Ok(());
    };

    let collector = GlobalStatusCollector::new();
    let mut buffer = SampleBuffer::new();
    collector.collect(&pool, &mut buffer).await?;

    let families = buffer.into_families();
    let mut output = Vec::new();
    TextEncoder::new().encode(&families, &mut output)?;
    let text = String::from_utf8(output)?;

    assert!(text.contains("mysql_global_status_uptime"));
    assert!(text.contains("# TYPE mysql_global_status_handlers_total counter"));

    pool.close().await;
    Ok(())
}
