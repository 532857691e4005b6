//! Types of the CloudWatch `PutMetricData` request.

mod datum;
mod unit;

pub use datum::{Dimension, MetricDatum, PutMetricDataInput};
pub use unit::{ParseStandardUnitError, StandardUnit};

/// The maximum number of dimensions CloudWatch accepts on a single datum.
pub const MAX_DIMENSIONS: usize = 30;

/// The `X-Amz-Target` header value of the JSON protocol call.
pub const PUT_METRIC_DATA_TARGET: &str = "GraniteServiceVersion20100801.PutMetricData";

/// The content type of JSON protocol requests.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.0";
