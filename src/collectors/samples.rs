//! Sample-based metric emission.
//!
//! Collectors that report per-scrape snapshot values (absolute counters,
//! untyped generics) cannot go through pre-registered live metrics, so they
//! emit [`MetricSample`]s into a [`MetricSink`] instead. A [`SampleBuffer`]
//! groups the emitted samples into `prometheus` metric families that are
//! merged with the registry output at encoding time.

use prometheus::proto;
use std::collections::HashMap;
use std::sync::Arc;

/// Metric namespace prefix shared by all exported families.
pub const NAMESPACE: &str = "mysql";

/// Exposition kind of a metric family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Untyped,
}

/// Immutable descriptor for one metric family.
///
/// Family descriptors are constructed once (statically for the fixed
/// families, per name for generic fallbacks) and shared via [`Arc`]; they
/// never change after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricDesc {
    fq_name: String,
    help: String,
    kind: MetricKind,
    label_names: &'static [&'static str],
}

impl MetricDesc {
    /// Build a descriptor with a fully qualified `namespace_subsystem_name`
    /// metric name.
    #[must_use]
    pub fn new(
        subsystem: &str,
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            fq_name: format!("{NAMESPACE}_{subsystem}_{name}"),
            help: help.to_string(),
            kind,
            label_names,
        }
    }

    #[must_use]
    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    #[must_use]
    pub fn help(&self) -> &str {
        &self.help
    }

    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        self.kind
    }

    #[must_use]
    pub const fn label_names(&self) -> &'static [&'static str] {
        self.label_names
    }
}

/// One emitted value: a descriptor, a float value and the label values
/// matching the descriptor's label names, in order.
#[derive(Clone, Debug)]
pub struct MetricSample {
    desc: Arc<MetricDesc>,
    value: f64,
    label_values: Vec<String>,
}

impl MetricSample {
    #[must_use]
    pub fn new(desc: Arc<MetricDesc>, value: f64, label_values: Vec<String>) -> Self {
        Self {
            desc,
            value,
            label_values,
        }
    }

    #[must_use]
    pub fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }
}

/// Receiving end of the emission pipeline.
pub trait MetricSink {
    fn emit(&mut self, sample: MetricSample);
}

/// Sink that collects samples in arrival order and converts them into
/// `prometheus` metric families for text encoding.
#[derive(Default)]
pub struct SampleBuffer {
    samples: Vec<MetricSample>,
}

impl MetricSink for SampleBuffer {
    fn emit(&mut self, sample: MetricSample) {
        self.samples.push(sample);
    }
}

impl SampleBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Group the buffered samples by family, preserving first-seen family
    /// order and per-family sample order.
    #[must_use]
    pub fn into_families(self) -> Vec<proto::MetricFamily> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, proto::MetricFamily> = HashMap::new();

        for sample in self.samples {
            let fq_name = sample.desc.fq_name().to_string();
            let family = groups.entry(fq_name.clone()).or_insert_with(|| {
                order.push(fq_name);
                let mut family = proto::MetricFamily::default();
                family.set_name(sample.desc.fq_name().to_string());
                family.set_help(sample.desc.help().to_string());
                family.set_field_type(proto_kind(sample.desc.kind()));
                family
            });
            family.mut_metric().push(to_proto_metric(&sample));
        }

        order
            .into_iter()
            .filter_map(|fq_name| groups.remove(&fq_name))
            .collect()
    }
}

const fn proto_kind(kind: MetricKind) -> proto::MetricType {
    match kind {
        MetricKind::Counter => proto::MetricType::COUNTER,
        MetricKind::Gauge => proto::MetricType::GAUGE,
        MetricKind::Untyped => proto::MetricType::UNTYPED,
    }
}

fn to_proto_metric(sample: &MetricSample) -> proto::Metric {
    let mut metric = proto::Metric::default();

    for (name, value) in sample
        .desc
        .label_names()
        .iter()
        .zip(sample.label_values())
    {
        let mut pair = proto::LabelPair::default();
        pair.set_name((*name).to_string());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }

    match sample.desc.kind() {
        MetricKind::Counter => {
            let mut counter = proto::Counter::default();
            counter.set_value(sample.value());
            metric.set_counter(counter);
        }
        MetricKind::Gauge => {
            let mut gauge = proto::Gauge::default();
            gauge.set_value(sample.value());
            metric.set_gauge(gauge);
        }
        MetricKind::Untyped => {
            let mut untyped = proto::Untyped::default();
            untyped.set_value(sample.value());
            metric.set_untyped(untyped);
        }
    }

    metric
}
