//! Expanding a single metric into datums.
//!
//! Every metric kind has a fixed expansion:
//!
//! | kind      | datums                                                        |
//! |-----------|---------------------------------------------------------------|
//! | counter   | `name`                                                        |
//! | gauge     | `name`                                                        |
//! | histogram | `.count`, `.min`, `.max`, `.mean`, `.std-dev`, one `.pNN` each |
//! | meter     | `.rate-mean`, `.rate-1m`, `.rate-5m`, `.rate-15m`             |
//! | timer     | the histogram datums followed by the meter datums             |

use std::time::SystemTime;

use thiserror::Error;

use crate::config::DurationUnit;
use crate::protocol::{Dimension, MetricDatum, StandardUnit};
use crate::registry::{Distribution, Metric, Rates};

/// Raised when a metric reports statistics that cannot be sent.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ExpansionError {
    /// A statistic is NaN or infinite.
    #[error("statistic `{statistic}` is not finite: {value}")]
    NonFiniteValue {
        /// The datum name the value was meant for.
        statistic: String,
        /// The value.
        value: f64,
    },
    /// The reported minimum exceeds the maximum.
    #[error("minimum {min} exceeds maximum {max}")]
    InvalidRange {
        /// The reported minimum.
        min: f64,
        /// The reported maximum.
        max: f64,
    },
}

/// Values shared by all datums of one export.
#[derive(Clone, Debug)]
pub struct ExpandOptions {
    /// The capture time stamped on every datum.
    pub timestamp: SystemTime,
    /// Dimensions attached to every datum.
    pub dimensions: Vec<Dimension>,
    /// The unit timer durations are converted to.
    pub duration_unit: DurationUnit,
}

impl ExpandOptions {
    /// Creates options without dimensions, reporting timers in milliseconds.
    pub fn new(timestamp: SystemTime) -> Self {
        Self {
            timestamp,
            dimensions: Vec::new(),
            duration_unit: DurationUnit::default(),
        }
    }
}

/// Returns the name suffix of quantile `q`, e.g. `p99` for `0.99`.
///
/// The suffix carries the fractional digits of `q`, padded to two digits:
/// `0.5` becomes `p50` and `0.999` becomes `p999`.
pub fn percentile_suffix(q: f64) -> String {
    let formatted = q.to_string();
    let digits = formatted.strip_prefix("0.").unwrap_or(&formatted);
    format!("p{:0<2}", digits)
}

/// Pairs every distinct quantile with its suffix, keeping the first of
/// several quantiles that map onto the same name.
pub fn dedup_percentiles(percentiles: &[f64]) -> Vec<(String, f64)> {
    let mut rv: Vec<(String, f64)> = Vec::with_capacity(percentiles.len());
    for &q in percentiles {
        let suffix = percentile_suffix(q);
        if !rv.iter().any(|(existing, _)| *existing == suffix) {
            rv.push((suffix, q));
        }
    }
    rv
}

struct Expander<'a> {
    name: &'a str,
    options: &'a ExpandOptions,
    datums: Vec<MetricDatum>,
}

impl<'a> Expander<'a> {
    fn new(name: &'a str, options: &'a ExpandOptions) -> Self {
        Self {
            name,
            options,
            datums: Vec::new(),
        }
    }

    fn push(
        &mut self,
        suffix: Option<&str>,
        value: f64,
        unit: StandardUnit,
    ) -> Result<(), ExpansionError> {
        let metric_name = match suffix {
            Some(suffix) => format!("{}.{}", self.name, suffix),
            None => self.name.to_owned(),
        };
        if !value.is_finite() {
            return Err(ExpansionError::NonFiniteValue {
                statistic: metric_name,
                value,
            });
        }
        self.datums.push(
            MetricDatum::new(metric_name, value, unit, self.options.timestamp)
                .with_dimensions(self.options.dimensions.clone()),
        );
        Ok(())
    }

    fn distribution(
        &mut self,
        distribution: &dyn Distribution,
        percentiles: &[(String, f64)],
        scale: f64,
        unit: StandardUnit,
    ) -> Result<(), ExpansionError> {
        let (min, max) = (distribution.min(), distribution.max());
        if min > max {
            return Err(ExpansionError::InvalidRange { min, max });
        }

        self.push(Some("count"), distribution.count() as f64, StandardUnit::Count)?;
        self.push(Some("min"), min / scale, unit)?;
        self.push(Some("max"), max / scale, unit)?;
        self.push(Some("mean"), distribution.mean() / scale, unit)?;
        self.push(Some("std-dev"), distribution.std_dev() / scale, unit)?;
        for (suffix, q) in percentiles {
            self.push(Some(suffix.as_str()), distribution.percentile(*q) / scale, unit)?;
        }
        Ok(())
    }

    fn rates(&mut self, rates: &dyn Rates) -> Result<(), ExpansionError> {
        let unit = StandardUnit::CountPerSecond;
        self.push(Some("rate-mean"), rates.rate_mean(), unit)?;
        self.push(Some("rate-1m"), rates.rate1(), unit)?;
        self.push(Some("rate-5m"), rates.rate5(), unit)?;
        self.push(Some("rate-15m"), rates.rate15(), unit)?;
        Ok(())
    }
}

/// Expands one metric into its datums.
///
/// `percentiles` is only consulted for histograms and timers and should
/// come from [`dedup_percentiles`]. A metric with any unusable statistic
/// yields an error and no datums at all.
pub fn expand_metric(
    name: &str,
    metric: Metric<'_>,
    percentiles: &[(String, f64)],
    options: &ExpandOptions,
) -> Result<Vec<MetricDatum>, ExpansionError> {
    let mut expander = Expander::new(name, options);
    match metric {
        Metric::Counter(counter) => {
            expander.push(None, counter.count() as f64, StandardUnit::Count)?;
        }
        Metric::Gauge(value) => {
            expander.push(None, value, StandardUnit::None)?;
        }
        Metric::Histogram(histogram) => {
            expander.distribution(histogram, percentiles, 1.0, StandardUnit::None)?;
        }
        Metric::Meter(meter) => {
            expander.rates(meter)?;
        }
        Metric::Timer { durations, rates } => {
            let unit = options.duration_unit;
            expander.distribution(durations, percentiles, unit.nanos(), unit.standard_unit())?;
            expander.rates(rates)?;
        }
    }
    Ok(expander.datums)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::registry::{Counter, HistogramSnapshot, MeterSnapshot};

    fn options() -> ExpandOptions {
        ExpandOptions::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }

    fn names(datums: &[MetricDatum]) -> Vec<&str> {
        datums.iter().map(|d| d.metric_name.as_str()).collect()
    }

    struct Broken;

    impl Distribution for Broken {
        fn count(&self) -> u64 {
            2
        }
        fn min(&self) -> f64 {
            5.0
        }
        fn max(&self) -> f64 {
            1.0
        }
        fn mean(&self) -> f64 {
            3.0
        }
        fn std_dev(&self) -> f64 {
            0.0
        }
        fn percentile(&self, _q: f64) -> f64 {
            3.0
        }
    }

    #[rstest]
    #[case(0.5, "p50")]
    #[case(0.75, "p75")]
    #[case(0.99, "p99")]
    #[case(0.999, "p999")]
    #[case(0.05, "p05")]
    fn test_percentile_suffix(#[case] q: f64, #[case] expected: &str) {
        assert_eq!(percentile_suffix(q), expected);
    }

    #[test]
    fn test_dedup_percentiles() {
        let deduped = dedup_percentiles(&[0.99, 0.5, 0.99, 0.50]);
        assert_eq!(
            deduped,
            vec![("p99".to_owned(), 0.99), ("p50".to_owned(), 0.5)]
        );
    }

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.inc(7);
        let datums = expand_metric("hits", Metric::Counter(&counter), &[], &options()).unwrap();
        assert_eq!(datums.len(), 1);
        assert_eq!(datums[0].metric_name, "hits");
        assert_eq!(datums[0].value, 7.0);
        assert_eq!(datums[0].unit, StandardUnit::Count);
    }

    #[test]
    fn test_gauge() {
        let datums = expand_metric("temp", Metric::Gauge(21.5), &[], &options()).unwrap();
        assert_eq!(datums.len(), 1);
        assert_eq!(datums[0].value, 21.5);
        assert_eq!(datums[0].unit, StandardUnit::None);
    }

    #[test]
    fn test_histogram_order() {
        let snapshot = HistogramSnapshot::new(2, vec![500, 1000]);
        let percentiles = dedup_percentiles(&[0.5, 0.99]);
        let datums =
            expand_metric("histo", Metric::Histogram(&snapshot), &percentiles, &options())
                .unwrap();
        assert_eq!(
            names(&datums),
            vec![
                "histo.count",
                "histo.min",
                "histo.max",
                "histo.mean",
                "histo.std-dev",
                "histo.p50",
                "histo.p99",
            ]
        );
        assert_eq!(datums[0].unit, StandardUnit::Count);
        assert_eq!(datums[3].value, 750.0);
        assert!(datums[1..].iter().all(|d| d.unit == StandardUnit::None));
    }

    #[test]
    fn test_meter() {
        let snapshot = MeterSnapshot {
            count: 4,
            rate_mean: 1.0,
            rate1: 2.0,
            rate5: 3.0,
            rate15: 4.0,
        };
        let datums = expand_metric("m", Metric::Meter(&snapshot), &[], &options()).unwrap();
        assert_eq!(
            names(&datums),
            vec!["m.rate-mean", "m.rate-1m", "m.rate-5m", "m.rate-15m"]
        );
        assert_eq!(
            datums.iter().map(|d| d.value).collect::<Vec<_>>(),
            vec![1.0, 2.0, 3.0, 4.0]
        );
        assert!(datums.iter().all(|d| d.unit == StandardUnit::CountPerSecond));
    }

    #[test]
    fn test_timer_scales_durations() {
        let durations = HistogramSnapshot::new(1, vec![10_000_000_000]);
        let rates = MeterSnapshot::default();
        let percentiles = dedup_percentiles(&[0.5]);
        let metric = Metric::Timer {
            durations: &durations,
            rates: &rates,
        };

        let datums = expand_metric("timer", metric, &percentiles, &options()).unwrap();
        assert_eq!(datums.len(), 9 + 1);
        assert_eq!(datums[0].value, 1.0);
        assert_eq!(datums[0].unit, StandardUnit::Count);
        assert_eq!(datums[2].metric_name, "timer.max");
        assert_eq!(datums[2].value, 10_000.0);
        assert_eq!(datums[2].unit, StandardUnit::Milliseconds);
        assert_eq!(datums[6].metric_name, "timer.rate-mean");

        let options = ExpandOptions {
            duration_unit: DurationUnit::Seconds,
            ..options()
        };
        let datums = expand_metric("timer", metric, &percentiles, &options).unwrap();
        assert_eq!(datums[2].value, 10.0);
        assert_eq!(datums[2].unit, StandardUnit::Seconds);
    }

    #[test]
    fn test_empty_histogram_still_expands() {
        let snapshot = HistogramSnapshot::new(0, vec![]);
        let percentiles = dedup_percentiles(&[0.5, 0.75, 0.95, 0.99]);
        let datums =
            expand_metric("empty", Metric::Histogram(&snapshot), &percentiles, &options())
                .unwrap();
        assert_eq!(datums.len(), 9);
        assert!(datums.iter().all(|d| d.value == 0.0));
    }

    #[test]
    fn test_dimensions_and_timestamp() {
        let options = ExpandOptions {
            dimensions: vec![Dimension::new("host", "a")],
            ..options()
        };
        let datums = expand_metric("g", Metric::Gauge(1.0), &[], &options).unwrap();
        assert_eq!(datums[0].dimensions, vec![Dimension::new("host", "a")]);
        assert_eq!(datums[0].timestamp, options.timestamp);
    }

    #[test]
    fn test_non_finite_gauge_is_rejected() {
        let err = expand_metric("g", Metric::Gauge(f64::NAN), &[], &options()).unwrap_err();
        assert!(matches!(err, ExpansionError::NonFiniteValue { ref statistic, .. } if statistic == "g"));
    }

    #[test]
    fn test_inconsistent_distribution_is_rejected() {
        let err = expand_metric("h", Metric::Histogram(&Broken), &[], &options()).unwrap_err();
        assert_eq!(err, ExpansionError::InvalidRange { min: 5.0, max: 1.0 });
    }
}
