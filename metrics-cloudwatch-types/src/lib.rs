//! This crate provides the wire types of the CloudWatch `PutMetricData`
//! call as used by the `metrics-cloudwatch` reporter.
//!
//! All types serialize to the CloudWatch JSON protocol, which uses
//! PascalCase field names and unix timestamps in seconds:
//!
//! ```rust
//! use std::time::{Duration, SystemTime};
//! use metrics_cloudwatch_types::protocol::{MetricDatum, PutMetricDataInput, StandardUnit};
//!
//! let timestamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
//! let input = PutMetricDataInput {
//!     namespace: "app".into(),
//!     metric_data: vec![MetricDatum::new("hits", 3.0, StandardUnit::Count, timestamp)],
//! };
//!
//! let json = serde_json::to_string(&input).unwrap();
//! assert_eq!(
//!     json,
//!     r#"{"Namespace":"app","MetricData":[{"MetricName":"hits","Timestamp":1700000000,"Value":3.0,"Unit":"Count"}]}"#
//! );
//! ```
#![warn(missing_docs)]

#[cfg(feature = "protocol")]
pub mod protocol;
mod utils;

pub use utils::serialize_timestamp;
