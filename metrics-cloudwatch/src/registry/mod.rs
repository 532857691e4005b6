//! The metrics registry abstraction.
//!
//! A [`Registry`] enumerates named metrics. Every metric is handed out as a
//! [`Metric`], a tagged view whose statistics are read synchronously by the
//! exporter. Any store can be exported by implementing [`Registry`]; the
//! crate ships [`StandardRegistry`] as a ready-made in-process store.

mod ewma;
mod sample;
mod standard;

use std::fmt;

pub use standard::{
    Counter, Gauge, Histogram, HistogramSnapshot, Meter, MeterSnapshot, RegistryError,
    StandardRegistry, Timer, DEFAULT_RESERVOIR_SIZE,
};

/// A source of named metrics.
///
/// Implementations must tolerate being walked while other threads update or
/// register metrics. The view of every single metric passed to the callback
/// should be internally consistent; consistency across metrics is not
/// required.
pub trait Registry: Send + Sync {
    /// Calls `f` once for every registered metric.
    fn each(&self, f: &mut dyn FnMut(&str, Metric<'_>));
}

/// The kind of a metric.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MetricKind {
    /// See [`Metric::Counter`].
    Counter,
    /// See [`Metric::Gauge`].
    Gauge,
    /// See [`Metric::Histogram`].
    Histogram,
    /// See [`Metric::Meter`].
    Meter,
    /// See [`Metric::Timer`].
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Histogram => write!(f, "histogram"),
            MetricKind::Meter => write!(f, "meter"),
            MetricKind::Timer => write!(f, "timer"),
        }
    }
}

/// A metric as read from a [`Registry`].
#[derive(Clone, Copy)]
pub enum Metric<'a> {
    /// A running integer total.
    Counter(&'a dyn CounterValue),
    /// An instantaneous value.
    Gauge(f64),
    /// A distribution of observed values.
    Histogram(&'a dyn Distribution),
    /// Event rates.
    Meter(&'a dyn Rates),
    /// A distribution of durations together with the rate they were recorded at.
    ///
    /// Values of `durations` are in nanoseconds.
    Timer {
        /// The recorded durations, in nanoseconds.
        durations: &'a dyn Distribution,
        /// The rate of recorded events.
        rates: &'a dyn Rates,
    },
}

impl Metric<'_> {
    /// Returns the kind of this metric.
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Timer { .. } => MetricKind::Timer,
        }
    }
}

impl fmt::Debug for Metric<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Counter(c) => f.debug_tuple("Counter").field(&c.count()).finish(),
            Metric::Gauge(v) => f.debug_tuple("Gauge").field(v).finish(),
            Metric::Histogram(h) => f
                .debug_struct("Histogram")
                .field("count", &h.count())
                .finish_non_exhaustive(),
            Metric::Meter(m) => f
                .debug_struct("Meter")
                .field("count", &m.count())
                .finish_non_exhaustive(),
            Metric::Timer { durations, .. } => f
                .debug_struct("Timer")
                .field("count", &durations.count())
                .finish_non_exhaustive(),
        }
    }
}

/// Read access to a counter.
pub trait CounterValue {
    /// The current total.
    fn count(&self) -> i64;

    /// Subtracts `reported` from the total once it has been delivered.
    ///
    /// Only called when the exporter is configured to reset counters after
    /// reporting them. Increments made since the value was read must be
    /// kept, so implementations subtract instead of storing zero.
    fn consume(&self, reported: i64) {
        let _ = reported;
    }
}

/// Summary statistics of a distribution.
///
/// Registries with no recorded values should return zero for every
/// statistic.
pub trait Distribution {
    /// Number of recorded values.
    fn count(&self) -> u64;
    /// Smallest value.
    fn min(&self) -> f64;
    /// Largest value.
    fn max(&self) -> f64;
    /// Arithmetic mean.
    fn mean(&self) -> f64;
    /// Standard deviation.
    fn std_dev(&self) -> f64;
    /// The value at quantile `q`, with `q` in `(0, 1)`.
    fn percentile(&self, q: f64) -> f64;
}

/// Rate statistics of an event stream, in events per second.
pub trait Rates {
    /// Number of events.
    fn count(&self) -> u64;
    /// Mean rate since creation.
    fn rate_mean(&self) -> f64;
    /// One-minute exponentially weighted moving average rate.
    fn rate1(&self) -> f64;
    /// Five-minute exponentially weighted moving average rate.
    fn rate5(&self) -> f64;
    /// Fifteen-minute exponentially weighted moving average rate.
    fn rate15(&self) -> f64;
}
