use std::time::SystemTime;

use serde::Serialize;

use super::StandardUnit;
use crate::utils::serialize_timestamp;

/// A name/value pair attached to a datum to further identify it.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    /// The name of the dimension.
    pub name: String,
    /// The value of the dimension.
    pub value: String,
}

impl Dimension {
    /// Creates a new dimension.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single datapoint of a metric.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDatum {
    /// The name of the metric, possibly suffixed with the statistic it carries.
    pub metric_name: String,
    /// Dimensions further identifying the metric.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    /// The capture time of the value.
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: SystemTime,
    /// The value.
    pub value: f64,
    /// The unit of the value.
    pub unit: StandardUnit,
}

impl MetricDatum {
    /// Creates a datum without dimensions.
    pub fn new(
        metric_name: impl Into<String>,
        value: f64,
        unit: StandardUnit,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            metric_name: metric_name.into(),
            dimensions: Vec::new(),
            timestamp,
            value,
            unit,
        }
    }

    /// Attaches dimensions to the datum.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// The body of one `PutMetricData` call.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutMetricDataInput {
    /// The namespace the data is published under.
    pub namespace: String,
    /// The datapoints of this request.
    pub metric_data: Vec<MetricDatum>,
}

impl PutMetricDataInput {
    /// Returns the number of datapoints in this request.
    pub fn len(&self) -> usize {
        self.metric_data.len()
    }

    /// Returns true if the request carries no datapoints.
    pub fn is_empty(&self) -> bool {
        self.metric_data.is_empty()
    }

    /// Serializes the request into the JSON protocol body.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
