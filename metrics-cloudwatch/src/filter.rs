//! Deciding which metrics get reported.

/// The percentiles reported for histograms and timers by [`NoFilter`].
pub const DEFAULT_PERCENTILES: &[f64] = &[0.5, 0.75, 0.95, 0.99];

/// Selects the metrics to report and the percentiles to compute for them.
///
/// Both methods are called at most once per metric and export. They must be
/// pure: the exporter may call them from several threads at once.
///
/// Any `Fn(&str) -> bool` closure is a filter reporting
/// [`DEFAULT_PERCENTILES`] for every included metric:
///
/// ```
/// use metrics_cloudwatch::Filter;
///
/// let only_http = |name: &str| name.starts_with("http.");
/// assert!(only_http.should_report("http.requests"));
/// assert!(!only_http.should_report("db.queries"));
/// ```
pub trait Filter: Send + Sync {
    /// Returns true if the metric called `name` should be reported.
    fn should_report(&self, name: &str) -> bool;

    /// The quantiles in `(0, 1)` to report for the histogram or timer
    /// called `name`.
    fn percentiles(&self, name: &str) -> Vec<f64>;
}

/// Reports every metric with [`DEFAULT_PERCENTILES`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFilter;

impl Filter for NoFilter {
    fn should_report(&self, _name: &str) -> bool {
        true
    }

    fn percentiles(&self, _name: &str) -> Vec<f64> {
        DEFAULT_PERCENTILES.to_vec()
    }
}

/// Reports nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllFilter;

impl Filter for AllFilter {
    fn should_report(&self, _name: &str) -> bool {
        false
    }

    fn percentiles(&self, _name: &str) -> Vec<f64> {
        Vec::new()
    }
}

/// Reports every metric with a fixed set of percentiles.
#[derive(Clone, Debug, PartialEq)]
pub struct PercentileFilter {
    percentiles: Vec<f64>,
}

impl PercentileFilter {
    /// Creates a filter reporting the given quantiles.
    pub fn new(percentiles: impl Into<Vec<f64>>) -> Self {
        Self {
            percentiles: percentiles.into(),
        }
    }
}

impl Default for PercentileFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PERCENTILES)
    }
}

impl Filter for PercentileFilter {
    fn should_report(&self, _name: &str) -> bool {
        true
    }

    fn percentiles(&self, _name: &str) -> Vec<f64> {
        self.percentiles.clone()
    }
}

impl<F> Filter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn should_report(&self, name: &str) -> bool {
        self(name)
    }

    fn percentiles(&self, _name: &str) -> Vec<f64> {
        DEFAULT_PERCENTILES.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter() {
        assert!(NoFilter.should_report("anything"));
        assert_eq!(NoFilter.percentiles("anything"), vec![0.5, 0.75, 0.95, 0.99]);
    }

    #[test]
    fn test_all_filter() {
        assert!(!AllFilter.should_report("anything"));
        assert!(AllFilter.percentiles("anything").is_empty());
    }

    #[test]
    fn test_percentile_filter() {
        let filter = PercentileFilter::new([0.9, 0.999]);
        assert!(filter.should_report("latency"));
        assert_eq!(filter.percentiles("latency"), vec![0.9, 0.999]);
        assert_eq!(PercentileFilter::default().percentiles("x"), DEFAULT_PERCENTILES);
    }

    #[test]
    fn test_closure_filter() {
        let filter = |name: &str| name != "secret";
        let filter: &dyn Filter = &filter;
        assert!(filter.should_report("public"));
        assert!(!filter.should_report("secret"));
        assert_eq!(filter.percentiles("public"), DEFAULT_PERCENTILES);
    }
}
