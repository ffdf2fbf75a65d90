//! Classification of `SHOW GLOBAL STATUS` variables.
//!
//! Every status variable name is normalized to a metric-safe form and then
//! matched against an ordered table of family prefixes. A matched family is
//! dispatched to a fixed decision: emit into a shared labeled family, emit
//! into a dedicated family, or suppress. Names outside the table become
//! generic untyped metrics keyed by the full normalized name.
//!
//! The decision is a pure function of the name: it never depends on the
//! value or on row order, and it never fails.

use crate::collectors::samples::{MetricDesc, MetricKind};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

const SUBSYSTEM: &str = "global_status";

static COMMANDS_DESC: Lazy<Arc<MetricDesc>> = Lazy::new(|| {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        "commands_total",
        "Total number of executed MySQL commands.",
        MetricKind::Counter,
        &["command"],
    ))
});

static HANDLERS_DESC: Lazy<Arc<MetricDesc>> = Lazy::new(|| {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        "handlers_total",
        "Total number of executed MySQL handlers.",
        MetricKind::Counter,
        &["handler"],
    ))
});

static CONNECTION_ERRORS_DESC: Lazy<Arc<MetricDesc>> = Lazy::new(|| {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        "connection_errors_total",
        "Total number of MySQL connection errors.",
        MetricKind::Counter,
        &["error"],
    ))
});

static BUFFER_POOL_PAGES_DESC: Lazy<Arc<MetricDesc>> = Lazy::new(|| {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        "buffer_pool_pages",
        "Innodb buffer pool pages by state.",
        MetricKind::Gauge,
        &["state"],
    ))
});

static BUFFER_POOL_DIRTY_PAGES_DESC: Lazy<Arc<MetricDesc>> = Lazy::new(|| {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        "buffer_pool_dirty_pages",
        "Innodb buffer pool dirty pages.",
        MetricKind::Gauge,
        &[],
    ))
});

static BUFFER_POOL_PAGE_CHANGES_DESC: Lazy<Arc<MetricDesc>> = Lazy::new(|| {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        "buffer_pool_page_changes_total",
        "Innodb buffer pool page state changes.",
        MetricKind::Counter,
        &["operation"],
    ))
});

static INNODB_ROW_OPS_DESC: Lazy<Arc<MetricDesc>> = Lazy::new(|| {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        "innodb_row_ops_total",
        "Total number of MySQL InnoDB row operations.",
        MetricKind::Counter,
        &["operation"],
    ))
});

static NON_METRIC_CHARS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new("[^a-zA-Z0-9_]+").expect("valid metric name pattern")
});

/// Recognized status-variable families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Com,
    Handler,
    ConnectionErrors,
    InnodbBufferPoolPages,
    InnodbSystemRows,
    InnodbSampled,
    PerformanceSchema,
    CurrentTls,
    Ssl,
    Mysqlx,
    BinlogStmtCache,
    /// Dispatched by exact prefix on the full name inside [`dispatch`], not
    /// via the anchored prefix table.
    InnodbRows,
}

/// Anchored family prefixes, tested in order; the first match wins. Each
/// prefix must be followed by `_`, and the remainder is the family suffix.
const ANCHORED_FAMILIES: &[(&str, Family)] = &[
    ("com_", Family::Com),
    ("handler_", Family::Handler),
    ("connection_errors_", Family::ConnectionErrors),
    ("innodb_buffer_pool_pages_", Family::InnodbBufferPoolPages),
    ("innodb_system_rows_", Family::InnodbSystemRows),
    ("innodb_sampled_", Family::InnodbSampled),
    ("performance_schema_", Family::PerformanceSchema),
    ("current_tls_", Family::CurrentTls),
    ("ssl_", Family::Ssl),
    ("mysqlx_", Family::Mysqlx),
    ("binlog_stmt_cache_", Family::BinlogStmtCache),
];

/// `Com_*` suffixes that are exported; everything else under `com_` is
/// suppressed on purpose.
const COMMANDS_ALLOW_LIST: &[&str] = &[
    "begin",
    "commit",
    "rollback",
    "create_trigger",
    "create_view",
    "group_replication_start",
    "group_replication_stop",
];

/// Outcome of classifying one normalized status-variable name.
#[derive(Clone, Debug)]
pub enum Decision {
    /// Emit one sample into the described family with the given label values.
    Emit {
        desc: Arc<MetricDesc>,
        label_values: Vec<String>,
    },
    /// Drop the variable without emitting anything.
    Suppress,
}

impl Decision {
    fn emit(desc: &Lazy<Arc<MetricDesc>>, label_values: Vec<String>) -> Self {
        Self::Emit {
            desc: Arc::clone(desc),
            label_values,
        }
    }
}

/// Normalize a raw status-variable name into a metric-safe identifier:
/// every run of characters outside `[A-Za-z0-9_]` collapses to a single
/// underscore and the result is lowercased. Idempotent.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    NON_METRIC_CHARS.replace_all(raw, "_").to_lowercase()
}

/// Parse a raw status value as a finite float. Anything else (text flags,
/// empty values, infinities, NaN) yields `None` and the row is skipped.
#[must_use]
pub fn parse_status_value(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Split a normalized name into its family and suffix using the anchored
/// prefix table. Names outside the table return `None` and take the generic
/// fallback path.
#[must_use]
pub fn match_family(name: &str) -> Option<(Family, &str)> {
    ANCHORED_FAMILIES.iter().find_map(|(prefix, family)| {
        name.strip_prefix(prefix).map(|suffix| (*family, suffix))
    })
}

/// Classify a normalized status-variable name.
#[must_use]
pub fn classify(name: &str) -> Decision {
    match match_family(name) {
        Some((family, suffix)) => dispatch(family, suffix),
        None => Decision::Emit {
            desc: generic_desc(name),
            label_values: Vec::new(),
        },
    }
}

/// Per-family decision for a matched name.
#[must_use]
pub fn dispatch(family: Family, suffix: &str) -> Decision {
    match family {
        Family::Com => {
            if COMMANDS_ALLOW_LIST.contains(&suffix) {
                Decision::emit(&COMMANDS_DESC, vec![suffix.to_string()])
            } else {
                Decision::Suppress
            }
        }
        Family::Handler => Decision::emit(&HANDLERS_DESC, vec![suffix.to_string()]),
        Family::ConnectionErrors => {
            Decision::emit(&CONNECTION_ERRORS_DESC, vec![suffix.to_string()])
        }
        Family::InnodbBufferPoolPages => match suffix {
            "data" | "free" | "misc" | "old" => {
                Decision::emit(&BUFFER_POOL_PAGES_DESC, vec![suffix.to_string()])
            }
            "dirty" => Decision::emit(&BUFFER_POOL_DIRTY_PAGES_DESC, Vec::new()),
            "total" => Decision::Suppress,
            // Remaining suffixes are page state-change operations.
            _ => Decision::emit(&BUFFER_POOL_PAGE_CHANGES_DESC, vec![suffix.to_string()]),
        },
        Family::InnodbRows => Decision::emit(&INNODB_ROW_OPS_DESC, vec![suffix.to_string()]),
        Family::Ssl
        | Family::Mysqlx
        | Family::PerformanceSchema
        | Family::CurrentTls
        | Family::InnodbSampled
        | Family::InnodbSystemRows
        | Family::BinlogStmtCache => Decision::Suppress,
    }
}

fn generic_desc(name: &str) -> Arc<MetricDesc> {
    Arc::new(MetricDesc::new(
        SUBSYSTEM,
        name,
        "Generic metric from SHOW GLOBAL STATUS.",
        MetricKind::Untyped,
        &[],
    ))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn expect_emit(decision: &Decision) -> (&MetricDesc, &[String]) {
        match decision {
            Decision::Emit { desc, label_values } => (desc, label_values),
            Decision::Suppress => panic!("expected an emit decision"),
        }
    }

    #[test]
    fn test_normalize_replaces_runs_with_single_underscore() {
        assert_eq!(normalize_name("Com_stmt/execute"), "com_stmt_execute");
        assert_eq!(normalize_name("Ssl.cipher list"), "ssl_cipher_list");
        assert_eq!(normalize_name("a--b"), "a_b");
    }

    #[test]
    fn test_normalize_lowercases() {
        assert_eq!(normalize_name("Innodb_Buffer_Pool_Pages_Data"), "innodb_buffer_pool_pages_data");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_name("Uptime since (flush) status");
        let twice = normalize_name(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_accepts_finite_floats() {
        assert_eq!(parse_status_value("120"), Some(120.0));
        assert_eq!(parse_status_value("12.5"), Some(12.5));
        assert_eq!(parse_status_value("-3"), Some(-3.0));
    }

    #[test]
    fn test_parse_rejects_non_numeric_and_non_finite() {
        assert_eq!(parse_status_value("N/A"), None);
        assert_eq!(parse_status_value(""), None);
        assert_eq!(parse_status_value("ON"), None);
        assert_eq!(parse_status_value("inf"), None);
        assert_eq!(parse_status_value("NaN"), None);
    }

    #[test]
    fn test_commands_allow_list_is_exact() {
        for suffix in [
            "begin",
            "commit",
            "rollback",
            "create_trigger",
            "create_view",
            "group_replication_start",
            "group_replication_stop",
        ] {
            let decision = classify(&format!("com_{suffix}"));
            let (desc, labels) = expect_emit(&decision);
            assert_eq!(desc.fq_name(), "mysql_global_status_commands_total");
            assert_eq!(desc.kind(), MetricKind::Counter);
            assert_eq!(labels, &[suffix.to_string()]);
        }

        assert!(matches!(classify("com_select"), Decision::Suppress));
        assert!(matches!(classify("com_foo"), Decision::Suppress));
    }

    #[test]
    fn test_every_handler_suffix_is_a_counter() {
        let decision = classify("handler_read_rnd_next");
        let (desc, labels) = expect_emit(&decision);
        assert_eq!(desc.fq_name(), "mysql_global_status_handlers_total");
        assert_eq!(desc.kind(), MetricKind::Counter);
        assert_eq!(labels, &["read_rnd_next".to_string()]);
    }

    #[test]
    fn test_every_connection_error_suffix_is_a_counter() {
        let decision = classify("connection_errors_max_connections");
        let (desc, labels) = expect_emit(&decision);
        assert_eq!(desc.fq_name(), "mysql_global_status_connection_errors_total");
        assert_eq!(labels, &["max_connections".to_string()]);
    }

    #[test]
    fn test_buffer_pool_page_states_are_gauges() {
        for state in ["data", "free", "misc", "old"] {
            let decision = classify(&format!("innodb_buffer_pool_pages_{state}"));
            let (desc, labels) = expect_emit(&decision);
            assert_eq!(desc.fq_name(), "mysql_global_status_buffer_pool_pages");
            assert_eq!(desc.kind(), MetricKind::Gauge);
            assert_eq!(labels, &[state.to_string()]);
        }
    }

    #[test]
    fn test_buffer_pool_dirty_pages_has_no_labels() {
        let decision = classify("innodb_buffer_pool_pages_dirty");
        let (desc, labels) = expect_emit(&decision);
        assert_eq!(desc.fq_name(), "mysql_global_status_buffer_pool_dirty_pages");
        assert_eq!(desc.kind(), MetricKind::Gauge);
        assert!(labels.is_empty());
    }

    #[test]
    fn test_buffer_pool_pages_total_is_suppressed() {
        assert!(matches!(
            classify("innodb_buffer_pool_pages_total"),
            Decision::Suppress
        ));
    }

    #[test]
    fn test_other_buffer_pool_suffixes_are_page_change_counters() {
        let decision = classify("innodb_buffer_pool_pages_made_young");
        let (desc, labels) = expect_emit(&decision);
        assert_eq!(
            desc.fq_name(),
            "mysql_global_status_buffer_pool_page_changes_total"
        );
        assert_eq!(desc.kind(), MetricKind::Counter);
        assert_eq!(labels, &["made_young".to_string()]);
    }

    #[test]
    fn test_reserved_families_are_suppressed() {
        for name in [
            "ssl_cipher",
            "mysqlx_connections_accepted",
            "performance_schema_accounts_lost",
            "innodb_sampled_pages_read",
            "innodb_system_rows_read",
            "binlog_stmt_cache_use",
            "current_tls_version",
        ] {
            assert!(
                matches!(classify(name), Decision::Suppress),
                "{name} should be suppressed"
            );
        }
    }

    #[test]
    fn test_unrecognized_names_fall_back_to_generic_untyped() {
        let decision = classify("uptime");
        let (desc, labels) = expect_emit(&decision);
        assert_eq!(desc.fq_name(), "mysql_global_status_uptime");
        assert_eq!(desc.kind(), MetricKind::Untyped);
        assert_eq!(desc.help(), "Generic metric from SHOW GLOBAL STATUS.");
        assert!(labels.is_empty());
    }

    #[test]
    fn test_innodb_rows_is_not_in_the_anchored_table() {
        // The anchored table does not know innodb_rows; those names take the
        // generic path.
        assert!(match_family("innodb_rows_read").is_none());
        let decision = classify("innodb_rows_read");
        let (desc, _) = expect_emit(&decision);
        assert_eq!(desc.fq_name(), "mysql_global_status_innodb_rows_read");
        assert_eq!(desc.kind(), MetricKind::Untyped);
    }

    #[test]
    fn test_innodb_rows_dispatch_arm() {
        let decision = dispatch(Family::InnodbRows, "inserted");
        let (desc, labels) = expect_emit(&decision);
        assert_eq!(desc.fq_name(), "mysql_global_status_innodb_row_ops_total");
        assert_eq!(desc.kind(), MetricKind::Counter);
        assert_eq!(labels, &["inserted".to_string()]);
    }

    #[test]
    fn test_classification_is_deterministic() {
        for name in ["com_begin", "handler_delete", "uptime", "ssl_accepts"] {
            let first = format!("{:?}", classify(name));
            let second = format!("{:?}", classify(name));
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_label_arity_matches_descriptor() {
        for name in [
            "com_begin",
            "handler_write",
            "connection_errors_internal",
            "innodb_buffer_pool_pages_data",
            "innodb_buffer_pool_pages_dirty",
            "innodb_buffer_pool_pages_lru_flushed",
            "threads_connected",
            "uptime",
        ] {
            if let Decision::Emit { desc, label_values } = classify(name) {
                assert_eq!(
                    desc.label_names().len(),
                    label_values.len(),
                    "label arity mismatch for {name}"
                );
            }
        }
    }

    #[test]
    fn test_anchor_requires_underscore_after_prefix() {
        // A bare family name without a suffix separator is not a family hit.
        let decision = classify("handler");
        let (desc, _) = expect_emit(&decision);
        assert_eq!(desc.fq_name(), "mysql_global_status_handler");

        // An empty suffix after the separator still matches the family.
        let (family, suffix) = match_family("ssl_").expect("ssl_ matches");
        assert_eq!(family, Family::Ssl);
        assert_eq!(suffix, "");
    }
}
