use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;

use super::ewma::{Ewma, TICK_INTERVAL};
use super::sample::UniformSample;
use super::{CounterValue, Distribution, Metric, MetricKind, Rates, Registry};

/// The number of values a [`Histogram`] keeps by default.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// Raised by [`StandardRegistry`] when a name is already taken.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The name is registered under a different kind of metric.
    #[error("metric `{name}` is already registered as a {existing}, not a {requested}")]
    KindMismatch {
        /// The contested name.
        name: String,
        /// The kind already registered.
        existing: MetricKind,
        /// The kind that was asked for.
        requested: MetricKind,
    },
}

/// A counter holding a signed running total.
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` to the total.
    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Subtracts `n` from the total.
    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }

    /// The current total.
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Resets the total to zero.
    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

impl CounterValue for Counter {
    fn count(&self) -> i64 {
        Counter::count(self)
    }

    fn consume(&self, reported: i64) {
        self.dec(reported);
    }
}

/// A gauge holding the last value it was set to.
#[derive(Debug, Default)]
pub struct Gauge {
    bits: AtomicU64,
}

impl Gauge {
    /// Creates a gauge at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value.
    pub fn update(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// The current value.
    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// A histogram over a uniform reservoir sample of the recorded values.
#[derive(Debug)]
pub struct Histogram {
    sample: Mutex<UniformSample>,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::with_reservoir_size(DEFAULT_RESERVOIR_SIZE)
    }
}

impl Histogram {
    /// Creates a histogram keeping [`DEFAULT_RESERVOIR_SIZE`] values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a histogram keeping at most `size` values.
    pub fn with_reservoir_size(size: usize) -> Self {
        Self {
            sample: Mutex::new(UniformSample::new(size)),
        }
    }

    /// Records a value.
    pub fn update(&self, value: i64) {
        self.lock().update(value);
    }

    /// Number of values recorded so far.
    pub fn count(&self) -> u64 {
        self.lock().count()
    }

    /// Drops all recorded values.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Takes a point-in-time copy of the recorded values.
    pub fn snapshot(&self) -> HistogramSnapshot {
        let sample = self.lock();
        HistogramSnapshot::new(sample.count(), sample.values().to_vec())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UniformSample> {
        self.sample.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A frozen view of a [`Histogram`].
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramSnapshot {
    count: u64,
    sorted: Vec<i64>,
}

impl HistogramSnapshot {
    /// Creates a snapshot from a total count and the sampled values.
    pub fn new(count: u64, mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self {
            count,
            sorted: values,
        }
    }

    /// The sampled values in ascending order.
    pub fn values(&self) -> &[i64] {
        &self.sorted
    }

    fn variance(&self) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let sum: f64 = self
            .sorted
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        sum / self.sorted.len() as f64
    }
}

impl Distribution for HistogramSnapshot {
    fn count(&self) -> u64 {
        self.count
    }

    fn min(&self) -> f64 {
        self.sorted.first().map_or(0.0, |&v| v as f64)
    }

    fn max(&self) -> f64 {
        self.sorted.last().map_or(0.0, |&v| v as f64)
    }

    fn mean(&self) -> f64 {
        if self.sorted.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.sorted.iter().map(|&v| v as f64).sum();
        sum / self.sorted.len() as f64
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    fn percentile(&self, q: f64) -> f64 {
        let len = self.sorted.len();
        if len == 0 {
            return 0.0;
        }
        let pos = q * (len + 1) as f64;
        if pos < 1.0 {
            self.sorted[0] as f64
        } else if pos >= len as f64 {
            self.sorted[len - 1] as f64
        } else {
            let lower = self.sorted[pos as usize - 1] as f64;
            let upper = self.sorted[pos as usize] as f64;
            lower + (pos - pos.floor()) * (upper - lower)
        }
    }
}

#[derive(Debug)]
struct MeterState {
    count: u64,
    uncounted: u64,
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

impl MeterState {
    fn tick_if_necessary(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = (elapsed.as_nanos() / TICK_INTERVAL.as_nanos()) as u64;
        if ticks == 0 {
            return;
        }
        self.last_tick += TICK_INTERVAL * ticks.min(u32::MAX as u64) as u32;

        let uncounted = std::mem::take(&mut self.uncounted);
        for ewma in [&mut self.m1, &mut self.m5, &mut self.m15] {
            ewma.tick(uncounted);
            ewma.decay((ticks - 1).min(u32::MAX as u64) as u32);
        }
    }
}

/// A meter tracking the rate of events.
///
/// Moving averages are ticked lazily whenever the meter is marked or read,
/// so no background thread is needed.
#[derive(Debug)]
pub struct Meter {
    start: Instant,
    state: Mutex<MeterState>,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new_at(Instant::now())
    }
}

impl Meter {
    /// Creates a meter with no events.
    pub fn new() -> Self {
        Self::default()
    }

    fn new_at(start: Instant) -> Self {
        Self {
            start,
            state: Mutex::new(MeterState {
                count: 0,
                uncounted: 0,
                last_tick: start,
                m1: Ewma::with_minutes(1.0),
                m5: Ewma::with_minutes(5.0),
                m15: Ewma::with_minutes(15.0),
            }),
        }
    }

    /// Records `n` events.
    pub fn mark(&self, n: u64) {
        self.mark_at(n, Instant::now());
    }

    fn mark_at(&self, n: u64, now: Instant) {
        let mut state = self.lock();
        state.tick_if_necessary(now);
        state.count += n;
        state.uncounted += n;
    }

    /// Number of events recorded so far.
    pub fn count(&self) -> u64 {
        self.lock().count
    }

    /// Takes a point-in-time copy of the rates.
    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        let mut state = self.lock();
        state.tick_if_necessary(now);
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        MeterSnapshot {
            count: state.count,
            rate_mean: if elapsed > 0.0 {
                state.count as f64 / elapsed
            } else {
                0.0
            },
            rate1: state.m1.rate(),
            rate5: state.m5.rate(),
            rate15: state.m15.rate(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MeterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A frozen view of a [`Meter`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeterSnapshot {
    /// Number of events.
    pub count: u64,
    /// Mean rate since creation.
    pub rate_mean: f64,
    /// One-minute moving rate.
    pub rate1: f64,
    /// Five-minute moving rate.
    pub rate5: f64,
    /// Fifteen-minute moving rate.
    pub rate15: f64,
}

impl Rates for MeterSnapshot {
    fn count(&self) -> u64 {
        self.count
    }

    fn rate_mean(&self) -> f64 {
        self.rate_mean
    }

    fn rate1(&self) -> f64 {
        self.rate1
    }

    fn rate5(&self) -> f64 {
        self.rate5
    }

    fn rate15(&self) -> f64 {
        self.rate15
    }
}

/// A timer recording durations and the rate they occur at.
#[derive(Debug, Default)]
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
}

impl Timer {
    /// Creates a timer with no recorded durations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a duration.
    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    /// Records the time elapsed since `start`.
    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }

    /// Runs `f` and records how long it took.
    pub fn time<F: FnOnce() -> R, R>(&self, f: F) -> R {
        let start = Instant::now();
        let rv = f();
        self.update_since(start);
        rv
    }

    /// Number of durations recorded so far.
    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    /// Takes point-in-time copies of the durations and rates.
    pub fn snapshot(&self) -> (HistogramSnapshot, MeterSnapshot) {
        (self.histogram.snapshot(), self.meter.snapshot())
    }
}

#[derive(Clone, Debug)]
enum StandardMetric {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl StandardMetric {
    fn kind(&self) -> MetricKind {
        match self {
            StandardMetric::Counter(_) => MetricKind::Counter,
            StandardMetric::Gauge(_) => MetricKind::Gauge,
            StandardMetric::Histogram(_) => MetricKind::Histogram,
            StandardMetric::Meter(_) => MetricKind::Meter,
            StandardMetric::Timer(_) => MetricKind::Timer,
        }
    }
}

macro_rules! get_or_register {
    ($(#[$attr:meta])* $fn:ident, $variant:ident, $ty:ty) => {
        $(#[$attr])*
        pub fn $fn(&self, name: &str) -> Result<Arc<$ty>, RegistryError> {
            self.get_or_register(
                name,
                MetricKind::$variant,
                |metric| match metric {
                    StandardMetric::$variant(inner) => Some(inner.clone()),
                    _ => None,
                },
                || StandardMetric::$variant(Arc::new(<$ty>::default())),
            )
        }
    };
}

/// An in-process registry of named metrics.
///
/// Names are unique across kinds: asking for a histogram under a name that
/// is already a counter fails with [`RegistryError::KindMismatch`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use metrics_cloudwatch::registry::StandardRegistry;
///
/// let registry = StandardRegistry::new();
/// registry.counter("requests").unwrap().inc(1);
/// registry.timer("latency").unwrap().update(Duration::from_millis(12));
///
/// assert_eq!(registry.len(), 2);
/// assert!(registry.histogram("requests").is_err());
/// ```
#[derive(Debug, Default)]
pub struct StandardRegistry {
    metrics: RwLock<BTreeMap<String, StandardMetric>>,
}

impl StandardRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    get_or_register!(
        /// Returns the counter called `name`, registering it if needed.
        counter,
        Counter,
        Counter
    );
    get_or_register!(
        /// Returns the gauge called `name`, registering it if needed.
        gauge,
        Gauge,
        Gauge
    );
    get_or_register!(
        /// Returns the histogram called `name`, registering it if needed.
        histogram,
        Histogram,
        Histogram
    );
    get_or_register!(
        /// Returns the meter called `name`, registering it if needed.
        meter,
        Meter,
        Meter
    );
    get_or_register!(
        /// Returns the timer called `name`, registering it if needed.
        timer,
        Timer,
        Timer
    );

    /// Registers a histogram with a custom reservoir size.
    ///
    /// Returns the existing histogram if `name` is already one.
    pub fn histogram_with_reservoir(
        &self,
        name: &str,
        size: usize,
    ) -> Result<Arc<Histogram>, RegistryError> {
        self.get_or_register(
            name,
            MetricKind::Histogram,
            |metric| match metric {
                StandardMetric::Histogram(inner) => Some(inner.clone()),
                _ => None,
            },
            || StandardMetric::Histogram(Arc::new(Histogram::with_reservoir_size(size))),
        )
    }

    /// Removes the metric called `name`. Returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_register<T>(
        &self,
        name: &str,
        requested: MetricKind,
        extract: impl Fn(&StandardMetric) -> Option<Arc<T>>,
        create: impl FnOnce() -> StandardMetric,
    ) -> Result<Arc<T>, RegistryError> {
        let check = |metric: &StandardMetric| {
            extract(metric).ok_or_else(|| RegistryError::KindMismatch {
                name: name.to_owned(),
                existing: metric.kind(),
                requested,
            })
        };

        if let Some(metric) = self
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return check(metric);
        }

        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        let metric = metrics.entry(name.to_owned()).or_insert_with(create);
        check(metric)
    }
}

impl Registry for StandardRegistry {
    fn each(&self, f: &mut dyn FnMut(&str, Metric<'_>)) {
        // walk over a copy of the handles so that writers are never blocked
        let entries: Vec<(String, StandardMetric)> = self
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect();

        for (name, metric) in &entries {
            match metric {
                StandardMetric::Counter(counter) => f(name, Metric::Counter(counter.as_ref())),
                StandardMetric::Gauge(gauge) => f(name, Metric::Gauge(gauge.value())),
                StandardMetric::Histogram(histogram) => {
                    let snapshot = histogram.snapshot();
                    f(name, Metric::Histogram(&snapshot));
                }
                StandardMetric::Meter(meter) => {
                    let snapshot = meter.snapshot();
                    f(name, Metric::Meter(&snapshot));
                }
                StandardMetric::Timer(timer) => {
                    let (durations, rates) = timer.snapshot();
                    f(
                        name,
                        Metric::Timer {
                            durations: &durations,
                            rates: &rates,
                        },
                    );
                }
            }
        }
    }
}
