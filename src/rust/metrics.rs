//! Process-wide request, latency and prediction telemetry.
//!
//! The registry is created once at startup, shared by every in-flight request
//! through an `Arc`, and rendered on demand in the Prometheus text exposition
//! format (version 0.0.4). Nothing is ever reset.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Content type of [`MetricsRegistry::export`] output.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Default latency buckets in seconds, upper bounds inclusive.
pub const DEFAULT_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

const REQUEST_COUNT: &str = "app_request_count_total";
const REQUEST_LATENCY: &str = "app_request_latency_seconds";
const PREDICTION_COUNT: &str = "model_prediction_count_total";

#[derive(Debug)]
struct CounterVec {
    name: &'static str,
    help: &'static str,
    label_names: &'static [&'static str],
    series: RwLock<BTreeMap<Vec<String>, AtomicU64>>,
}

impl CounterVec {
    fn new(name: &'static str, help: &'static str, label_names: &'static [&'static str]) -> Self {
        Self {
            name,
            help,
            label_names,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    fn inc(&self, labels: &[&str]) {
        {
            let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(counter) = series.get(&owned(labels)) {
                counter.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        let mut series = self.series.write().unwrap_or_else(PoisonError::into_inner);
        series
            .entry(owned(labels))
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self, labels: &[&str]) -> u64 {
        let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
        series
            .get(&owned(labels))
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    fn total(&self) -> u64 {
        let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
        series.values().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    fn render(&self, out: &mut String) {
        header(out, self.name, self.help, "counter");
        let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
        for (values, counter) in series.iter() {
            let _ = writeln!(
                out,
                "{}{} {}",
                self.name,
                label_block(self.label_names, values, None),
                counter.load(Ordering::Relaxed)
            );
        }
    }
}

#[derive(Debug)]
struct HistogramSeries {
    buckets: Vec<AtomicU64>,
    count: AtomicU64,
    sum_bits: AtomicU64,
}

impl HistogramSeries {
    fn new(bucket_count: usize) -> Self {
        Self {
            buckets: (0..bucket_count).map(|_| AtomicU64::new(0)).collect(),
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    // `count` is bumped last, with Release: a reader that loads it with
    // Acquire sees at least that many bucket increments.
    fn observe(&self, bounds: &[f64], value: f64) {
        if let Some(idx) = bounds.iter().position(|&le| value <= le) {
            self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        }
        let _ = self
            .sum_bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
        self.count.fetch_add(1, Ordering::Release);
    }
}

#[derive(Debug)]
struct HistogramVec {
    name: &'static str,
    help: &'static str,
    label_names: &'static [&'static str],
    bounds: Vec<f64>,
    series: RwLock<BTreeMap<Vec<String>, Arc<HistogramSeries>>>,
}

impl HistogramVec {
    fn new(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
        bounds: Vec<f64>,
    ) -> Self {
        Self {
            name,
            help,
            label_names,
            bounds,
            series: RwLock::new(BTreeMap::new()),
        }
    }

    fn series(&self, labels: &[&str]) -> Arc<HistogramSeries> {
        {
            let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(s) = series.get(&owned(labels)) {
                return Arc::clone(s);
            }
        }
        let mut series = self.series.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            series
                .entry(owned(labels))
                .or_insert_with(|| Arc::new(HistogramSeries::new(self.bounds.len()))),
        )
    }

    fn observe(&self, labels: &[&str], value: f64) {
        self.series(labels).observe(&self.bounds, value);
    }

    fn count(&self, labels: &[&str]) -> u64 {
        let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
        series
            .get(&owned(labels))
            .map_or(0, |s| s.count.load(Ordering::Acquire))
    }

    fn render(&self, out: &mut String) {
        header(out, self.name, self.help, "histogram");
        let series = self.series.read().unwrap_or_else(PoisonError::into_inner);
        for (values, s) in series.iter() {
            // Observations landing mid-render may show up in buckets but not in
            // `count`; clamping keeps every bucket at or below `+Inf`.
            let count = s.count.load(Ordering::Acquire);
            let mut cumulative = 0u64;
            for (le, bucket) in self.bounds.iter().zip(&s.buckets) {
                cumulative += bucket.load(Ordering::Relaxed);
                let le = format_float(*le);
                let _ = writeln!(
                    out,
                    "{}_bucket{} {}",
                    self.name,
                    label_block(self.label_names, values, Some(&le)),
                    cumulative.min(count)
                );
            }
            let labels = label_block(self.label_names, values, None);
            let _ = writeln!(
                out,
                "{}_bucket{} {}",
                self.name,
                label_block(self.label_names, values, Some("+Inf")),
                count
            );
            let sum = f64::from_bits(s.sum_bits.load(Ordering::Relaxed));
            let _ = writeln!(out, "{}_sum{} {}", self.name, labels, format_float(sum));
            let _ = writeln!(out, "{}_count{} {}", self.name, labels, count);
        }
    }
}

/// Shared counting surface for every in-flight request.
///
/// Updates to a label combination that has been seen before take only a
/// shared read lock plus an atomic add; the first sample of a new combination
/// takes the write lock.
#[derive(Debug)]
pub struct MetricsRegistry {
    requests: CounterVec,
    latency: HistogramVec,
    predictions: CounterVec,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS.to_vec())
    }

    /// Creates a registry with custom latency bucket bounds.
    ///
    /// Bounds are sorted and deduplicated; non-finite bounds are dropped since
    /// `+Inf` is always implied.
    pub fn with_buckets(mut bounds: Vec<f64>) -> Self {
        bounds.retain(|b| b.is_finite());
        bounds.sort_by(|a, b| a.total_cmp(b));
        bounds.dedup();
        Self {
            requests: CounterVec::new(
                REQUEST_COUNT,
                "Total number of requests to the app",
                &["method", "endpoint"],
            ),
            latency: HistogramVec::new(
                REQUEST_LATENCY,
                "Latency of requests in seconds",
                &["endpoint"],
                bounds,
            ),
            predictions: CounterVec::new(
                PREDICTION_COUNT,
                "Count of predictions for each class",
                &["prediction"],
            ),
        }
    }

    pub fn increment_request_count(&self, method: &str, endpoint: &str) {
        self.requests.inc(&[method, endpoint]);
    }

    pub fn observe_latency(&self, endpoint: &str, seconds: f64) {
        self.latency.observe(&[endpoint], seconds.max(0.0));
    }

    pub fn increment_prediction_count(&self, label: &str) {
        self.predictions.inc(&[label]);
    }

    pub fn request_count(&self, method: &str, endpoint: &str) -> u64 {
        self.requests.get(&[method, endpoint])
    }

    pub fn latency_observations(&self, endpoint: &str) -> u64 {
        self.latency.count(&[endpoint])
    }

    pub fn prediction_count(&self, label: &str) -> u64 {
        self.predictions.get(&[label])
    }

    /// Sum of prediction samples across every label.
    pub fn total_predictions(&self) -> u64 {
        self.predictions.total()
    }

    /// Renders the current snapshot in Prometheus text format.
    ///
    /// Families and series are emitted in sorted order so two exports with no
    /// intervening updates are byte-identical.
    pub fn export(&self) -> String {
        let mut out = String::new();
        self.requests.render(&mut out);
        self.latency.render(&mut out);
        self.predictions.render(&mut out);
        out
    }
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| (*s).to_string()).collect()
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn label_block(names: &[&str], values: &[String], le: Option<&str>) -> String {
    let mut pairs: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    if let Some(le) = le {
        pairs.push(format!("le=\"{}\"", le));
    }
    if pairs.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", pairs.join(","))
    }
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

// Prometheus parsers accept Rust's shortest round-trip float formatting, but
// whole numbers read better with a trailing `.0`.
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
