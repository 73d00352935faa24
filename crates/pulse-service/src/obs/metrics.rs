//! Request metrics registry and Prometheus text exposition.
//!
//! Counter/gauge/histogram families with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors so series identity does not
//! depend on call-site ordering. Histogram sums and buckets are kept in
//! microseconds as integers and converted to seconds only when rendering.
//!
//! One registry is created at startup and handed to the middleware and the
//! `/metrics` handler through `AppState`; tests build a fresh one each.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pulse_core::error::{PulseError, Result};
use pulse_core::BuildIdentity;

/// Content type of the text format rendered by [`MetricsRegistry`].
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

type LabelKey = Vec<(String, String)>;

/// Something the `/metrics` endpoint can render.
pub trait Exposition: Send + Sync {
    /// Content type identifying the format and version.
    fn content_type(&self) -> &'static str;
    /// Render every accumulated series. Must not mutate state.
    fn render(&self) -> Result<String>;
}

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

/// `{a="x",b="y"}`, with an optional trailing pair (used for `le`). Empty when no labels.
fn label_set(key: &[(String, String)], extra: Option<(&str, &str)>) -> String {
    let mut parts: Vec<String> = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect();
    if let Some((k, v)) = extra {
        parts.push(format!("{}=\"{}\"", k, escape_label(v)));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) -> std::fmt::Result {
    writeln!(out, "# HELP {} {}", name, help)?;
    writeln!(out, "# TYPE {} {}", name, kind)
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for a label set, if that series exists.
    pub fn get(&self, labels: &[(&str, &str)]) -> Option<u64> {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
    }

    /// Number of distinct label sets seen.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Render in Prometheus text exposition format, series sorted by labels.
    fn render(&self, name: &str, help: &str, out: &mut String) -> std::fmt::Result {
        header(out, name, help, "counter")?;
        let mut rows: Vec<(LabelKey, u64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (key, val) in rows {
            writeln!(out, "{}{} {}", name, label_set(&key, None), val)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    /// Decrement by 1.
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    /// Overwrite the value.
    pub fn set(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.store(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<i64> {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) -> std::fmt::Result {
        header(out, name, help, "gauge")?;
        let mut rows: Vec<(LabelKey, i64)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort();
        for (key, val) in rows {
            writeln!(out, "{}{} {}", name, label_set(&key, None), val)?;
        }
        Ok(())
    }
}

// Upper bounds in microseconds:
// 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const BUCKETS_MICROS: [u64; 11] = [
    5_000, 10_000, 25_000, 50_000, 100_000, 250_000, 500_000, 1_000_000, 2_500_000, 5_000_000,
    10_000_000,
];

fn micros_to_secs(micros: u64) -> f64 {
    micros as f64 / 1_000_000.0
}

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; BUCKETS_MICROS.len()],
}

struct HistogramSnapshot {
    count: u64,
    sum: u64,
    buckets: [u64; BUCKETS_MICROS.len()],
}

impl AtomicHistogram {
    fn snapshot(&self) -> HistogramSnapshot {
        let mut buckets = [0u64; BUCKETS_MICROS.len()];
        for (slot, b) in buckets.iter_mut().zip(self.buckets.iter()) {
            *slot = b.load(Ordering::Relaxed);
        }
        HistogramSnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum: self.sum.load(Ordering::Relaxed),
            buckets,
        }
    }
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration and increment cumulative buckets.
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self.map.entry(label_key(labels)).or_default();
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);

        // Cumulative: every bucket whose bound is >= the sample.
        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Sample count for a label set, if that series exists.
    pub fn count(&self, labels: &[(&str, &str)]) -> Option<u64> {
        self.map
            .get(&label_key(labels))
            .map(|h| h.count.load(Ordering::Relaxed))
    }

    /// Render in Prometheus text exposition format (unit: seconds).
    fn render(&self, name: &str, help: &str, out: &mut String) -> std::fmt::Result {
        header(out, name, help, "histogram")?;
        let mut rows: Vec<(LabelKey, HistogramSnapshot)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().snapshot()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, hist) in rows {
            for (i, &le) in BUCKETS_MICROS.iter().enumerate() {
                let le = micros_to_secs(le).to_string();
                writeln!(
                    out,
                    "{}_bucket{} {}",
                    name,
                    label_set(&key, Some(("le", &le))),
                    hist.buckets[i]
                )?;
            }
            writeln!(
                out,
                "{}_bucket{} {}",
                name,
                label_set(&key, Some(("le", "+Inf"))),
                hist.count
            )?;
            let labels = label_set(&key, None);
            writeln!(out, "{}_sum{} {}", name, labels, micros_to_secs(hist.sum))?;
            writeln!(out, "{}_count{} {}", name, labels, hist.count)?;
        }
        Ok(())
    }
}

/// Process-wide collector of request outcomes.
pub struct MetricsRegistry {
    pub requests: CounterVec,
    pub request_duration: HistogramVec,
    pub in_flight: GaugeVec,
    pub build_info: GaugeVec,
    start_time_secs: f64,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let start_time_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self {
            requests: CounterVec::default(),
            request_duration: HistogramVec::default(),
            in_flight: GaugeVec::default(),
            build_info: GaugeVec::default(),
            start_time_secs,
        }
    }

    /// Expose the frozen build identity as a constant `1` gauge.
    pub fn register_build_info(&self, identity: &BuildIdentity, service: &str) {
        self.build_info.set(
            &[
                ("git_sha", identity.commit_sha()),
                ("build_time", identity.build_time()),
                ("service", service),
            ],
            1,
        );
    }

    /// Count a request that has entered the chain.
    pub fn request_started(&self, method: &str) {
        self.in_flight.inc(&[("method", method)]);
    }

    /// Counterpart of [`MetricsRegistry::request_started`].
    pub fn request_ended(&self, method: &str) {
        self.in_flight.dec(&[("method", method)]);
    }

    /// Record one completed request.
    ///
    /// `route` must be a route pattern, never a raw path, so the number of
    /// series stays bounded by the routes the router declares.
    pub fn record_request(
        &self,
        method: &str,
        route: &str,
        status: u16,
        duration: Duration,
    ) -> Result<()> {
        if method.is_empty() {
            return Err(PulseError::Instrumentation("empty method label".into()));
        }
        if route.is_empty() {
            return Err(PulseError::Instrumentation("empty route label".into()));
        }

        let status = status.to_string();
        let labels = [("method", method), ("route", route), ("status", status.as_str())];
        self.requests.inc(&labels);
        self.request_duration.observe(&labels, duration);
        Ok(())
    }

    /// Completed-request count for one key, zero if never seen.
    pub fn request_count(&self, method: &str, route: &str, status: u16) -> u64 {
        let status = status.to_string();
        self.requests
            .get(&[("method", method), ("route", route), ("status", status.as_str())])
            .unwrap_or(0)
    }

    /// Number of distinct `(method, route, status)` keys.
    pub fn request_series(&self) -> usize {
        self.requests.len()
    }

    fn render_text(&self) -> std::result::Result<String, std::fmt::Error> {
        let mut out = String::new();
        self.requests
            .render("http_requests_total", "Total HTTP requests", &mut out)?;
        self.request_duration.render(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            &mut out,
        )?;
        self.in_flight
            .render("http_requests_in_flight", "HTTP requests currently being served", &mut out)?;
        self.build_info
            .render("pulse_build_info", "Build identity of the running service", &mut out)?;
        header(
            &mut out,
            "process_start_time_seconds",
            "Start time of the process since unix epoch in seconds",
            "gauge",
        )?;
        writeln!(out, "process_start_time_seconds {}", self.start_time_secs)?;
        Ok(out)
    }
}

impl Exposition for MetricsRegistry {
    fn content_type(&self) -> &'static str {
        PROMETHEUS_CONTENT_TYPE
    }

    fn render(&self) -> Result<String> {
        Ok(self.render_text()?)
    }
}
