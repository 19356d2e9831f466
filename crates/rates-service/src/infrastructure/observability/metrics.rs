//! Process metrics in Prometheus text format
//!
//! Counters and histograms keyed by name and label set. Safe for concurrent
//! increment from every request task; rendering takes a consistent enough
//! snapshot for scraping.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::application::ports::{DbOperation, Observability, Outcome};

/// Prometheus client default buckets, in seconds
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricKind {
    Counter,
    Histogram,
}

impl MetricKind {
    fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
        }
    }
}

struct Descriptor {
    name: &'static str,
    help: &'static str,
    kind: MetricKind,
}

const DESCRIPTORS: &[Descriptor] = &[
    Descriptor {
        name: "http_requests_total",
        help: "Total number of HTTP requests to the upstream depth API",
        kind: MetricKind::Counter,
    },
    Descriptor {
        name: "get_rates_duration_seconds",
        help: "Duration of GetRates steps",
        kind: MetricKind::Histogram,
    },
    Descriptor {
        name: "db_operations_total",
        help: "Total number of database operations",
        kind: MetricKind::Counter,
    },
    Descriptor {
        name: "db_operation_duration_seconds",
        help: "Duration of database operations in seconds",
        kind: MetricKind::Histogram,
    },
    Descriptor {
        name: "get_rates_requests_total",
        help: "Total number of GetRates executions started",
        kind: MetricKind::Counter,
    },
    Descriptor {
        name: "get_rates_success_total",
        help: "Total number of GetRates executions that persisted both legs",
        kind: MetricKind::Counter,
    },
    Descriptor {
        name: "requests_total",
        help: "Total number of requests received by the service",
        kind: MetricKind::Counter,
    },
    Descriptor {
        name: "requests_processed_total",
        help: "Total number of successfully processed requests",
        kind: MetricKind::Counter,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct SeriesKey {
    name: &'static str,
    labels: Vec<(&'static str, String)>,
}

impl SeriesKey {
    fn new(name: &'static str, labels: &[(&'static str, &str)]) -> Self {
        Self {
            name,
            labels: labels.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        }
    }

    fn matches(&self, name: &str, labels: &[(&str, &str)]) -> bool {
        self.name == name
            && self.labels.len() == labels.len()
            && self
                .labels
                .iter()
                .zip(labels)
                .all(|((k, v), (lk, lv))| k == lk && v == lv)
    }
}

#[derive(Debug, Clone, Default)]
struct HistogramState {
    /// Non-cumulative per-bucket counts; rendering accumulates
    buckets: [u64; DEFAULT_BUCKETS.len()],
    count: u64,
    sum: f64,
}

impl HistogramState {
    fn observe(&mut self, value: f64) {
        if let Some(idx) = DEFAULT_BUCKETS.iter().position(|bound| value <= *bound) {
            self.buckets[idx] += 1;
        }
        self.count += 1;
        self.sum += value;
    }
}

/// Metrics registry implementing the observability port
#[derive(Default)]
pub struct MetricsRegistry {
    counters: DashMap<SeriesKey, AtomicU64>,
    histograms: DashMap<SeriesKey, Mutex<HistogramState>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, name: &'static str, labels: &[(&'static str, &str)]) {
        self.counters
            .entry(SeriesKey::new(name, labels))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe(&self, name: &'static str, labels: &[(&'static str, &str)], value: f64) {
        self.histograms
            .entry(SeriesKey::new(name, labels))
            .or_default()
            .lock()
            .observe(value);
    }

    /// Current value of a counter series, zero if never incremented
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.counters
            .iter()
            .find(|entry| entry.key().matches(name, labels))
            .map(|entry| entry.value().load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of observations in a histogram series
    pub fn histogram_count(&self, name: &str, labels: &[(&str, &str)]) -> u64 {
        self.histograms
            .iter()
            .find(|entry| entry.key().matches(name, labels))
            .map(|entry| entry.value().lock().count)
            .unwrap_or(0)
    }

    /// Render every known series in the text exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();

        for descriptor in DESCRIPTORS {
            let _ = writeln!(out, "# HELP {} {}", descriptor.name, descriptor.help);
            let _ = writeln!(out, "# TYPE {} {}", descriptor.name, descriptor.kind.as_str());

            match descriptor.kind {
                MetricKind::Counter => self.render_counters(&mut out, descriptor.name),
                MetricKind::Histogram => self.render_histograms(&mut out, descriptor.name),
            }
        }

        out
    }

    fn render_counters(&self, out: &mut String, name: &str) {
        let mut series: Vec<(SeriesKey, u64)> = self
            .counters
            .iter()
            .filter(|entry| entry.key().name == name)
            .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
            .collect();
        series.sort();

        for (key, value) in series {
            let _ = writeln!(out, "{}{} {}", name, format_labels(&key.labels, None), value);
        }
    }

    fn render_histograms(&self, out: &mut String, name: &str) {
        let mut series: Vec<(SeriesKey, HistogramState)> = self
            .histograms
            .iter()
            .filter(|entry| entry.key().name == name)
            .map(|entry| (entry.key().clone(), entry.value().lock().clone()))
            .collect();
        series.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, state) in series {
            let mut cumulative = 0;
            for (bound, count) in DEFAULT_BUCKETS.iter().zip(state.buckets.iter()) {
                cumulative += count;
                let le = bound.to_string();
                let _ = writeln!(
                    out,
                    "{}_bucket{} {}",
                    name,
                    format_labels(&key.labels, Some(&le)),
                    cumulative
                );
            }
            let _ = writeln!(
                out,
                "{}_bucket{} {}",
                name,
                format_labels(&key.labels, Some("+Inf")),
                state.count
            );
            let labels = format_labels(&key.labels, None);
            let _ = writeln!(out, "{}_sum{} {}", name, labels, state.sum);
            let _ = writeln!(out, "{}_count{} {}", name, labels, state.count);
        }
    }
}

fn format_labels(labels: &[(&'static str, String)], le: Option<&str>) -> String {
    let mut parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape(v)))
        .collect();
    if let Some(le) = le {
        parts.push(format!("le=\"{}\"", le));
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

impl Observability for MetricsRegistry {
    fn upstream_request(&self, outcome: Outcome) {
        self.increment("http_requests_total", &[("status", outcome.as_str())]);
    }

    fn observe_step(&self, step: &'static str, elapsed: Duration) {
        self.observe(
            "get_rates_duration_seconds",
            &[("step", step)],
            elapsed.as_secs_f64(),
        );
    }

    fn db_operation(&self, operation: DbOperation, outcome: Outcome) {
        self.increment(
            "db_operations_total",
            &[("operation", operation.as_str()), ("status", outcome.as_str())],
        );
    }

    fn observe_db(&self, operation: &'static str, elapsed: Duration) {
        self.observe(
            "db_operation_duration_seconds",
            &[("operation", operation)],
            elapsed.as_secs_f64(),
        );
    }

    fn rates_request_received(&self) {
        self.increment("get_rates_requests_total", &[]);
    }

    fn rates_request_succeeded(&self) {
        self.increment("get_rates_success_total", &[]);
    }

    fn rpc_request(&self) {
        self.increment("requests_total", &[]);
    }

    fn rpc_response(&self) {
        self.increment("requests_processed_total", &[]);
    }
}
