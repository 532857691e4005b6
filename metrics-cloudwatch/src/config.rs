//! Configuration of an export.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::client::PutMetricsClient;
use crate::filter::{Filter, NoFilter};
use crate::protocol::{Dimension, StandardUnit, MAX_DIMENSIONS};
use crate::registry::Registry;

/// The default number of datums sent in one `PutMetricData` request.
pub const MAX_BATCH_SIZE: usize = 20;

/// The largest batch size CloudWatch accepts.
pub const MAX_BATCH_SIZE_LIMIT: usize = 1000;

/// The namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "metrics";

/// Raised when a [`Config`] cannot be used for an export.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The batch size is zero or above what CloudWatch accepts.
    #[error("batch size must be between 1 and {max}, got {0}", max = MAX_BATCH_SIZE_LIMIT)]
    InvalidBatchSize(usize),
    /// More static dimensions than a datum may carry.
    #[error("at most {max} dimensions are allowed, got {0}", max = MAX_DIMENSIONS)]
    TooManyDimensions(usize),
    /// A static dimension has an empty name or value.
    #[error("dimension `{0}` has an empty name or value")]
    EmptyDimension(String),
    /// The namespace is empty.
    #[error("namespace must not be empty")]
    EmptyNamespace,
    /// The filter returned a quantile outside of `(0, 1)`.
    #[error("filter returned invalid percentile {value} for metric `{metric}`")]
    InvalidPercentile {
        /// The metric the filter was asked about.
        metric: String,
        /// The offending quantile.
        value: f64,
    },
}

/// The unit timer durations are reported in.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DurationUnit {
    /// Seconds.
    Seconds,
    /// Milliseconds.
    #[default]
    Milliseconds,
    /// Microseconds.
    Microseconds,
}

impl DurationUnit {
    /// Number of nanoseconds in one unit.
    pub fn nanos(self) -> f64 {
        match self {
            DurationUnit::Seconds => 1e9,
            DurationUnit::Milliseconds => 1e6,
            DurationUnit::Microseconds => 1e3,
        }
    }

    /// The CloudWatch unit matching this duration unit.
    pub fn standard_unit(self) -> StandardUnit {
        match self {
            DurationUnit::Seconds => StandardUnit::Seconds,
            DurationUnit::Milliseconds => StandardUnit::Milliseconds,
            DurationUnit::Microseconds => StandardUnit::Microseconds,
        }
    }
}

/// What to do with the remaining batches once one failed to submit.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DispatchPolicy {
    /// Keep submitting and report all failures at the end.
    #[default]
    Continue,
    /// Stop at the first failed batch.
    Abort,
}

/// Everything needed to export a registry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use metrics_cloudwatch::registry::StandardRegistry;
/// use metrics_cloudwatch::{Config, DurationUnit, PercentileFilter, PutMetricsClient};
/// # use metrics_cloudwatch::{ClientError, protocol::PutMetricDataInput};
/// # struct Discard;
/// # impl PutMetricsClient for Discard {
/// #     fn put_metric_data(&self, _: &PutMetricDataInput) -> Result<(), ClientError> { Ok(()) }
/// # }
/// # let client = Arc::new(Discard);
///
/// let config = Config::new(Arc::new(StandardRegistry::new()), client)
///     .with_namespace("checkout")
///     .with_dimension("host", "web-1")
///     .with_filter(PercentileFilter::new([0.5, 0.999]))
///     .with_duration_unit(DurationUnit::Microseconds)
///     .with_reporting_interval(Duration::from_secs(30));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct Config {
    /// The registry to export.
    pub registry: Arc<dyn Registry>,
    /// The client submitting batches.
    pub client: Arc<dyn PutMetricsClient>,
    /// Selects metrics and percentiles.
    ///
    /// Default: [`NoFilter`]
    pub filter: Arc<dyn Filter>,
    /// The namespace all data is published under.
    ///
    /// Default: `"metrics"`
    pub namespace: String,
    /// Dimensions attached to every datum.
    pub static_dimensions: BTreeMap<String, String>,
    /// The unit timer durations are converted to.
    ///
    /// Default: milliseconds
    pub duration_unit: DurationUnit,
    /// The maximum number of datums per request.
    ///
    /// Default: [`MAX_BATCH_SIZE`]
    pub max_batch_size: usize,
    /// Behaviour after a failed batch.
    ///
    /// Default: [`DispatchPolicy::Continue`]
    pub dispatch_policy: DispatchPolicy,
    /// Clear counters after they have been reported.
    ///
    /// Default: false
    pub reset_counters_on_report: bool,
    /// How often a [`Reporter`](crate::Reporter) exports.
    ///
    /// Default: 60 seconds
    pub reporting_interval: Duration,
    /// Whether a [`Reporter`](crate::Reporter) exports one last time when
    /// it is stopped.
    ///
    /// Default: false
    pub flush_on_shutdown: bool,
}

impl Config {
    /// Creates a configuration with default options.
    pub fn new(registry: Arc<dyn Registry>, client: Arc<dyn PutMetricsClient>) -> Self {
        Self {
            registry,
            client,
            filter: Arc::new(NoFilter),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            static_dimensions: BTreeMap::new(),
            duration_unit: DurationUnit::default(),
            max_batch_size: MAX_BATCH_SIZE,
            dispatch_policy: DispatchPolicy::default(),
            reset_counters_on_report: false,
            reporting_interval: Duration::from_secs(60),
            flush_on_shutdown: false,
        }
    }

    /// Sets the filter.
    #[must_use]
    pub fn with_filter<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Adds a dimension attached to every datum.
    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_dimensions.insert(name.into(), value.into());
        self
    }

    /// Sets the unit timer durations are reported in.
    #[must_use]
    pub fn with_duration_unit(mut self, unit: DurationUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    /// Sets the maximum number of datums per request.
    #[must_use]
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Sets the behaviour after a failed batch.
    #[must_use]
    pub fn with_dispatch_policy(mut self, policy: DispatchPolicy) -> Self {
        self.dispatch_policy = policy;
        self
    }

    /// Enables or disables clearing counters after reporting them.
    #[must_use]
    pub fn with_reset_counters_on_report(mut self, enabled: bool) -> Self {
        self.reset_counters_on_report = enabled;
        self
    }

    /// Sets the interval of a [`Reporter`](crate::Reporter).
    #[must_use]
    pub fn with_reporting_interval(mut self, interval: Duration) -> Self {
        self.reporting_interval = interval;
        self
    }

    /// Enables or disables a final export when a reporter stops.
    #[must_use]
    pub fn with_flush_on_shutdown(mut self, enabled: bool) -> Self {
        self.flush_on_shutdown = enabled;
        self
    }

    /// Checks the options that do not depend on the registry contents.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_size == 0 || self.max_batch_size > MAX_BATCH_SIZE_LIMIT {
            return Err(ConfigError::InvalidBatchSize(self.max_batch_size));
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.static_dimensions.len() > MAX_DIMENSIONS {
            return Err(ConfigError::TooManyDimensions(
                self.static_dimensions.len(),
            ));
        }
        if let Some((name, _)) = self
            .static_dimensions
            .iter()
            .find(|(name, value)| name.is_empty() || value.is_empty())
        {
            return Err(ConfigError::EmptyDimension(name.clone()));
        }
        Ok(())
    }

    /// The static dimensions in wire form.
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.static_dimensions
            .iter()
            .map(|(name, value)| Dimension::new(name.as_str(), value.as_str()))
            .collect()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("namespace", &self.namespace)
            .field("static_dimensions", &self.static_dimensions)
            .field("duration_unit", &self.duration_unit)
            .field("max_batch_size", &self.max_batch_size)
            .field("dispatch_policy", &self.dispatch_policy)
            .field("reset_counters_on_report", &self.reset_counters_on_report)
            .field("reporting_interval", &self.reporting_interval)
            .field("flush_on_shutdown", &self.flush_on_shutdown)
            .finish_non_exhaustive()
    }
}
