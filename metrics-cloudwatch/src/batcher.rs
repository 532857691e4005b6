//! Splitting datums into requests and submitting them.

use std::vec;

use crate::client::PutMetricsClient;
use crate::config::DispatchPolicy;
use crate::emit::EmitReport;
use crate::protocol::{MetricDatum, PutMetricDataInput};

/// Splits a sequence of datums into requests of at most `size` datums.
///
/// Order is preserved and no empty request is ever produced:
///
/// ```
/// # use std::time::SystemTime;
/// use metrics_cloudwatch::Batches;
/// use metrics_cloudwatch::protocol::{MetricDatum, StandardUnit};
///
/// let datums: Vec<_> = (0..30)
///     .map(|i| MetricDatum::new(format!("c{i}"), 1.0, StandardUnit::Count, SystemTime::now()))
///     .collect();
///
/// let sizes: Vec<_> = Batches::new("app", datums, 20).map(|b| b.len()).collect();
/// assert_eq!(sizes, vec![20, 10]);
/// ```
#[derive(Debug)]
pub struct Batches {
    namespace: String,
    datums: vec::IntoIter<MetricDatum>,
    size: usize,
}

impl Batches {
    /// Creates the batches of `datums`. A `size` of zero is treated as one.
    pub fn new(namespace: impl Into<String>, datums: Vec<MetricDatum>, size: usize) -> Self {
        Self {
            namespace: namespace.into(),
            datums: datums.into_iter(),
            size: size.max(1),
        }
    }
}

impl Iterator for Batches {
    type Item = PutMetricDataInput;

    fn next(&mut self) -> Option<Self::Item> {
        let metric_data: Vec<MetricDatum> = self.datums.by_ref().take(self.size).collect();
        if metric_data.is_empty() {
            return None;
        }
        Some(PutMetricDataInput {
            namespace: self.namespace.clone(),
            metric_data,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let batches = self.datums.len().div_ceil(self.size);
        (batches, Some(batches))
    }
}

impl ExactSizeIterator for Batches {}

/// Submits every batch in order, recording the outcome on `report`.
///
/// Returns whether each batch was accepted, indexed by batch. Batches never
/// attempted are missing from the end.
pub(crate) fn dispatch(
    client: &dyn PutMetricsClient,
    policy: DispatchPolicy,
    mut batches: Batches,
    report: &mut EmitReport,
) -> Vec<bool> {
    let mut accepted = Vec::with_capacity(batches.len());
    while let Some(batch) = batches.next() {
        log::trace!("putting {} datums to {}", batch.len(), batch.namespace);
        match client.put_metric_data(&batch) {
            Ok(()) => {
                report.batches_sent += 1;
                accepted.push(true);
            }
            Err(err) => {
                log::warn!("failed to put metric data: {}", err);
                report.batches_failed += 1;
                report.errors.push(err);
                accepted.push(false);
                if policy == DispatchPolicy::Abort {
                    report.batches_skipped = batches.len();
                    break;
                }
            }
        }
    }
    accepted
}
