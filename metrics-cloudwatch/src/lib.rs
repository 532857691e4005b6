//! This crate exports an in-process metrics registry to [CloudWatch].
//!
//! Applications record counters, gauges, histograms, meters and timers in a
//! [`Registry`](registry::Registry). On every export the registry is walked
//! once, each metric is expanded into one or more CloudWatch datums, and the
//! datums are submitted in batches of at most [`MAX_BATCH_SIZE`] through a
//! [`PutMetricsClient`].
//!
//! # Core Concepts
//!
//! - The [`Config`] names the registry, the client and every export option.
//! - A [`Filter`] decides which metrics are reported and which percentiles
//!   are published for histograms and timers.
//! - [`emit_metrics`] runs a single export. The [`Reporter`] runs one on a
//!   background thread every [`Config::reporting_interval`].
//!
//! Exports never stop halfway on their own: a metric whose statistics cannot
//! be represented is skipped and reported, and failed batches are collected
//! in the [`EmitReport`] according to the [`DispatchPolicy`].
//!
//! # Naming
//!
//! Every datum is named after its metric, with a suffix for multi-valued
//! kinds:
//!
//! | Kind      | Datums                                                         |
//! |-----------|----------------------------------------------------------------|
//! | counter   | `name`                                                         |
//! | gauge     | `name`                                                         |
//! | histogram | `.count`, `.min`, `.max`, `.mean`, `.std-dev`, `.pNN`          |
//! | meter     | `.rate-mean`, `.rate-1m`, `.rate-5m`, `.rate-15m`              |
//! | timer     | the histogram datums in [`DurationUnit`], then the meter rates |
//!
//! Percentile suffixes come from [`percentile_suffix`]: `0.5` is `p50`,
//! `0.999` is `p999`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use metrics_cloudwatch::registry::StandardRegistry;
//! use metrics_cloudwatch::{emit_metrics, Config};
//! # use metrics_cloudwatch::{ClientError, PutMetricsClient, protocol::PutMetricDataInput};
//! # struct Discard;
//! # impl PutMetricsClient for Discard {
//! #     fn put_metric_data(&self, _: &PutMetricDataInput) -> Result<(), ClientError> { Ok(()) }
//! # }
//! # let client = Arc::new(Discard);
//!
//! let registry = Arc::new(StandardRegistry::new());
//! registry.counter("requests").unwrap().inc(1);
//! registry.timer("latency").unwrap().update(Duration::from_millis(12));
//!
//! let config = Config::new(registry, client).with_namespace("checkout");
//! let report = emit_metrics(&config).unwrap();
//! assert_eq!(report.datums, 1 + 9 + 4);
//! ```
//!
//! # Features
//!
//! - `feature = "transport"` (*default*): Enables the [`HttpClient`] using
//!   `reqwest` with `native-tls`.
//! - `feature = "rustls"`: Uses `rustls` instead of `native-tls` for the
//!   HTTP client.
//! - `feature = "test"`: Activates the [`test`] module, which comes with a
//!   client capturing all submitted batches for inspection.
//!
//! [CloudWatch]: https://aws.amazon.com/cloudwatch/
//! [`HttpClient`]: transports/struct.HttpClient.html
//! [`test`]: test/index.html

#![warn(missing_docs)]

mod batcher;
mod client;
mod config;
mod constants;
mod emit;
mod expand;
mod filter;
mod reporter;

pub mod registry;
pub mod transports;


pub use crate::batcher::Batches;
pub use crate::client::{ClientError, PutMetricsClient};
pub use crate::config::{
    Config, ConfigError, DispatchPolicy, DurationUnit, DEFAULT_NAMESPACE, MAX_BATCH_SIZE,
    MAX_BATCH_SIZE_LIMIT,
};
pub use crate::constants::USER_AGENT;
pub use crate::emit::{
    collect_datums, emit_metrics, Collected, EmitError, EmitReport, SkippedMetric,
};
pub use crate::expand::{
    dedup_percentiles, expand_metric, percentile_suffix, ExpandOptions, ExpansionError,
};
pub use crate::filter::{AllFilter, Filter, NoFilter, PercentileFilter, DEFAULT_PERCENTILES};
pub use crate::reporter::{Reporter, ReporterError};

// public api from other crates
#[doc(inline)]
pub use metrics_cloudwatch_types as types;
pub use metrics_cloudwatch_types::protocol;
