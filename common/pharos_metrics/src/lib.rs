//! A wrapper around the `prometheus` crate that provides a global, `lazy_static` metrics registry
//! with a slightly different interface than the vanilla crate.
//!
//! The design of this crate is heavily driven by the metrics modules that consume it: metrics are
//! declared once in a `lazy_static` block and referenced from hot paths, so every helper here
//! accepts a `Result` and silently no-ops when the metric failed to register. A metrics failure
//! must never take down consensus code.
//!
//! ## Example
//!
//! ```rust
//! #[macro_use]
//! extern crate lazy_static;
//! use pharos_metrics::*;
//!
//! lazy_static! {
//!     pub static ref RUN_COUNT: Result<IntCounter> =
//!         try_create_int_counter("runs_total", "Total number of runs");
//! }
//!
//! fn main() {
//!     inc_counter(&RUN_COUNT);
//! }
//! ```

use prometheus::{HistogramOpts, Opts};

pub use prometheus::{
    Encoder, Histogram, HistogramTimer, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    IntGaugeVec, Result, TextEncoder,
};

/// Collect all the metrics for reporting.
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    prometheus::gather()
}

/// Attempts to create an `IntCounter`, returning `Err` if the registry does not accept the counter
/// (potentially due to naming conflict).
pub fn try_create_int_counter(name: &str, help: &str) -> Result<IntCounter> {
    let opts = Opts::new(name, help);
    let counter = IntCounter::with_opts(opts)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

/// Attempts to create an `IntGauge`, returning `Err` if the registry does not accept the gauge
/// (potentially due to naming conflict).
pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let opts = Opts::new(name, help);
    let gauge = IntGauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

/// Attempts to create a `Histogram`, returning `Err` if the registry does not accept the
/// histogram (potentially due to naming conflict).
pub fn try_create_histogram(name: &str, help: &str) -> Result<Histogram> {
    let opts = HistogramOpts::new(name, help);
    let histogram = Histogram::with_opts(opts)?;
    prometheus::register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

/// Attempts to create an `IntCounterVec`, returning `Err` if the registry does not accept the
/// counter (potentially due to naming conflict).
pub fn try_create_int_counter_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec> {
    let opts = Opts::new(name, help);
    let counter_vec = IntCounterVec::new(opts, label_names)?;
    prometheus::register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

/// Attempts to create an `IntGaugeVec`, returning `Err` if the registry does not accept the gauge
/// (potentially due to naming conflict).
pub fn try_create_int_gauge_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntGaugeVec> {
    let opts = Opts::new(name, help);
    let gauge_vec = IntGaugeVec::new(opts, label_names)?;
    prometheus::register(Box::new(gauge_vec.clone()))?;
    Ok(gauge_vec)
}

/// If `int_counter.is_ok()`, increment it.
pub fn inc_counter(int_counter: &Result<IntCounter>) {
    if let Ok(counter) = int_counter {
        counter.inc();
    }
}

/// If `int_counter.is_ok()`, increment it by `n`.
pub fn inc_counter_by(int_counter: &Result<IntCounter>, n: u64) {
    if let Ok(counter) = int_counter {
        counter.inc_by(n);
    }
}

/// If `int_counter_vec.is_ok()`, increment the counter with the given label values.
pub fn inc_counter_vec(int_counter_vec: &Result<IntCounterVec>, name: &[&str]) {
    if let Ok(counter_vec) = int_counter_vec {
        counter_vec.with_label_values(name).inc();
    }
}

/// If `int_gauge.is_ok()`, set it to the given value.
pub fn set_gauge(int_gauge: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = int_gauge {
        gauge.set(value);
    }
}

/// If `int_gauge.is_ok()`, increment it.
pub fn inc_gauge(int_gauge: &Result<IntGauge>) {
    if let Ok(gauge) = int_gauge {
        gauge.inc();
    }
}

/// If `int_gauge.is_ok()`, decrement it.
pub fn dec_gauge(int_gauge: &Result<IntGauge>) {
    if let Ok(gauge) = int_gauge {
        gauge.dec();
    }
}

/// If `histogram.is_ok()`, start a timer. The timer observes its elapsed time when dropped.
pub fn start_timer(histogram: &Result<Histogram>) -> Option<HistogramTimer> {
    if let Ok(histogram) = histogram {
        Some(histogram.start_timer())
    } else {
        None
    }
}

/// Stops a timer created with `start_timer`, observing the elapsed duration.
pub fn stop_timer(timer: Option<HistogramTimer>) {
    if let Some(t) = timer {
        t.observe_duration();
    }
}

/// If `histogram.is_ok()`, observe the given value.
pub fn observe(histogram: &Result<Histogram>, value: f64) {
    if let Ok(histogram) = histogram {
        histogram.observe(value);
    }
}

/// Reads the value of an `IntCounter`, for tests.
pub fn get_counter_value(int_counter: &Result<IntCounter>) -> u64 {
    int_counter.as_ref().map(|c| c.get()).unwrap_or(0)
}

/// Reads the value of a labelled counter, for tests.
pub fn get_counter_vec_value(int_counter_vec: &Result<IntCounterVec>, name: &[&str]) -> u64 {
    int_counter_vec
        .as_ref()
        .map(|c| c.with_label_values(name).get())
        .unwrap_or(0)
}
