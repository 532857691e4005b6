//! Walking a registry and exporting it in one pass.

use std::collections::BTreeMap;
use std::time::SystemTime;

use thiserror::Error;

use crate::batcher::{self, Batches};
use crate::client::ClientError;
use crate::config::{Config, ConfigError};
use crate::expand::{dedup_percentiles, expand_metric, ExpandOptions, ExpansionError};
use crate::protocol::MetricDatum;
use crate::registry::{CounterValue, Metric, MetricKind};

/// A metric left out of an export because its statistics were unusable.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedMetric {
    /// The name of the metric.
    pub name: String,
    /// The kind of the metric.
    pub kind: MetricKind,
    /// Why it was skipped.
    pub reason: ExpansionError,
}

/// A counter value that went into a datum.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CounterReading {
    name: String,
    value: i64,
    datum: usize,
}

/// The datums of one registry walk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collected {
    /// All datums in walk order.
    pub datums: Vec<MetricDatum>,
    /// Metrics that could not be expanded.
    pub skipped: Vec<SkippedMetric>,
    /// Counter values to subtract once their datums are delivered.
    pub(crate) counters: Vec<CounterReading>,
}

/// A counter frozen at the value that is being reported.
struct Reading(i64);

impl CounterValue for Reading {
    fn count(&self) -> i64 {
        self.0
    }
}

/// What happened during one export.
#[derive(Debug, Default)]
pub struct EmitReport {
    /// Number of datums produced by the walk.
    pub datums: usize,
    /// Batches accepted by the client.
    pub batches_sent: usize,
    /// Batches the client failed to submit.
    pub batches_failed: usize,
    /// Batches never attempted because of [`DispatchPolicy::Abort`](crate::DispatchPolicy::Abort).
    pub batches_skipped: usize,
    /// Metrics left out of the export.
    pub skipped_metrics: Vec<SkippedMetric>,
    /// The errors of the failed batches, in submission order.
    pub errors: Vec<ClientError>,
}

impl EmitReport {
    /// Total number of batches the datums were split into.
    pub fn batches(&self) -> usize {
        self.batches_sent + self.batches_failed + self.batches_skipped
    }

    /// Returns true if every batch was accepted.
    pub fn is_success(&self) -> bool {
        self.batches_failed == 0 && self.batches_skipped == 0
    }
}

/// Raised by [`emit_metrics`].
#[derive(Debug, Error)]
pub enum EmitError {
    /// The configuration or the filter is unusable; nothing was sent.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// At least one batch failed. The report describes the partial export.
    #[error("{failed} of {total} batches failed to submit")]
    Dispatch {
        /// Number of failed batches.
        failed: usize,
        /// Number of batches in the export.
        total: usize,
        /// The full report.
        report: EmitReport,
    },
}

impl EmitError {
    /// The report of a partially failed export, if any.
    pub fn report(&self) -> Option<&EmitReport> {
        match self {
            EmitError::Config(_) => None,
            EmitError::Dispatch { report, .. } => Some(report),
        }
    }
}

fn validate_percentiles(name: &str, percentiles: &[f64]) -> Result<(), ConfigError> {
    match percentiles.iter().find(|&&q| !(q > 0.0 && q < 1.0)) {
        Some(&value) => Err(ConfigError::InvalidPercentile {
            metric: name.to_owned(),
            value,
        }),
        None => Ok(()),
    }
}

/// Walks the registry of `config` and expands every included metric.
///
/// The filter is asked once per metric. Metrics with unusable statistics are
/// skipped and listed in [`Collected::skipped`]; an invalid percentile from
/// the filter stops the walk. Nothing in the registry is modified.
pub fn collect_datums(config: &Config, timestamp: SystemTime) -> Result<Collected, ConfigError> {
    let options = ExpandOptions {
        timestamp,
        dimensions: config.dimensions(),
        duration_unit: config.duration_unit,
    };
    let mut collected = Collected::default();
    let mut fatal = None;

    config.registry.each(&mut |name, metric| {
        if fatal.is_some() || !config.filter.should_report(name) {
            return;
        }

        let percentiles = match metric {
            Metric::Histogram(_) | Metric::Timer { .. } => {
                let percentiles = config.filter.percentiles(name);
                if let Err(err) = validate_percentiles(name, &percentiles) {
                    fatal = Some(err);
                    return;
                }
                dedup_percentiles(&percentiles)
            }
            _ => Vec::new(),
        };

        // read a counter once so the reported value is the one consumed later
        let reading;
        let (metric, value) = match metric {
            Metric::Counter(counter) => {
                reading = Reading(counter.count());
                (Metric::Counter(&reading), Some(reading.0))
            }
            other => (other, None),
        };

        match expand_metric(name, metric, &percentiles, &options) {
            Ok(datums) => {
                if let Some(value) = value {
                    collected.counters.push(CounterReading {
                        name: name.to_owned(),
                        value,
                        datum: collected.datums.len(),
                    });
                }
                collected.datums.extend(datums);
            }
            Err(reason) => {
                log::warn!("skipping {} `{}`: {}", metric.kind(), name, reason);
                collected.skipped.push(SkippedMetric {
                    name: name.to_owned(),
                    kind: metric.kind(),
                    reason,
                });
            }
        }
    });

    match fatal {
        Some(err) => Err(err),
        None => Ok(collected),
    }
}

/// Subtracts the reported values of counters whose batch was accepted.
fn consume_counters(config: &Config, counters: Vec<CounterReading>, accepted: &[bool]) {
    let mut pending: BTreeMap<String, i64> = counters
        .into_iter()
        .filter(|reading| reading.value != 0)
        .filter(|reading| {
            accepted
                .get(reading.datum / config.max_batch_size)
                .copied()
                .unwrap_or(false)
        })
        .map(|reading| (reading.name, reading.value))
        .collect();
    if pending.is_empty() {
        return;
    }

    config.registry.each(&mut |name, metric| {
        if let Metric::Counter(counter) = metric {
            if let Some(value) = pending.remove(name) {
                counter.consume(value);
            }
        }
    });
}

/// Exports the registry of `config` once.
///
/// All datums share one timestamp. They are split into batches of
/// `config.max_batch_size` and submitted in order through `config.client`.
/// An empty registry submits nothing.
///
/// With [`Config::reset_counters_on_report`] set, every counter whose datum
/// was accepted is decreased by the reported value after dispatch. Counters
/// in failed or skipped batches keep their value, as do all counters when
/// the export fails before dispatch.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use metrics_cloudwatch::registry::StandardRegistry;
/// use metrics_cloudwatch::{emit_metrics, Config};
/// # use metrics_cloudwatch::{ClientError, PutMetricsClient, protocol::PutMetricDataInput};
/// # struct Discard;
/// # impl PutMetricsClient for Discard {
/// #     fn put_metric_data(&self, _: &PutMetricDataInput) -> Result<(), ClientError> { Ok(()) }
/// # }
///
/// let registry = Arc::new(StandardRegistry::new());
/// for i in 0..30 {
///     registry.counter(&format!("count-{i}")).unwrap().inc(1);
/// }
///
/// let config = Config::new(registry, Arc::new(Discard));
/// let report = emit_metrics(&config).unwrap();
/// assert_eq!(report.datums, 30);
/// assert_eq!(report.batches_sent, 2);
/// ```
pub fn emit_metrics(config: &Config) -> Result<EmitReport, EmitError> {
    config.validate()?;

    let Collected {
        datums,
        skipped,
        counters,
    } = collect_datums(config, SystemTime::now())?;
    let mut report = EmitReport {
        datums: datums.len(),
        skipped_metrics: skipped,
        ..Default::default()
    };

    let batches = Batches::new(config.namespace.as_str(), datums, config.max_batch_size);
    log::debug!(
        "emitting {} datums in {} batches to {}",
        report.datums,
        batches.len(),
        config.namespace
    );
    let accepted = batcher::dispatch(
        config.client.as_ref(),
        config.dispatch_policy,
        batches,
        &mut report,
    );
    if config.reset_counters_on_report {
        consume_counters(config, counters, &accepted);
    }

    if report.is_success() {
        Ok(report)
    } else {
        Err(EmitError::Dispatch {
            failed: report.batches_failed,
            total: report.batches(),
            report,
        })
    }
}
