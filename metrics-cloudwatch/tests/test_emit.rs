use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use metrics_cloudwatch::protocol::{PutMetricDataInput, StandardUnit};
use metrics_cloudwatch::registry::{CounterValue, Metric, Registry, StandardRegistry};
use metrics_cloudwatch::{
    emit_metrics, AllFilter, ClientError, Config, PercentileFilter, PutMetricsClient,
    DEFAULT_PERCENTILES,
};

#[derive(Default)]
struct MockPutMetricsClient {
    requests: AtomicUsize,
    metrics_put: AtomicUsize,
    inputs: Mutex<Vec<PutMetricDataInput>>,
}

impl MockPutMetricsClient {
    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn metrics_put(&self) -> usize {
        self.metrics_put.load(Ordering::SeqCst)
    }

    fn inputs(&self) -> Vec<PutMetricDataInput> {
        self.inputs.lock().unwrap().clone()
    }
}

impl PutMetricsClient for MockPutMetricsClient {
    fn put_metric_data(&self, input: &PutMetricDataInput) -> Result<(), ClientError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.metrics_put
            .fetch_add(input.metric_data.len(), Ordering::SeqCst);
        self.inputs.lock().unwrap().push(input.clone());
        Ok(())
    }
}

fn setup() -> (Arc<StandardRegistry>, Arc<MockPutMetricsClient>, Config) {
    let _ = pretty_env_logger::try_init();
    let registry = Arc::new(StandardRegistry::new());
    let client = Arc::new(MockPutMetricsClient::default());
    let config = Config::new(registry.clone(), client.clone());
    (registry, client, config)
}

#[test]
fn test_thirty_counters_make_two_requests() {
    let (registry, client, config) = setup();
    for i in 0..30 {
        registry.counter(&format!("count-{i}")).unwrap().inc(1);
    }

    let report = emit_metrics(&config).unwrap();

    assert_eq!(report.datums, 30);
    assert_eq!(client.requests(), 2);
    assert_eq!(client.metrics_put(), 30);
    let sizes: Vec<_> = client.inputs().iter().map(|i| i.len()).collect();
    assert_eq!(sizes, vec![20, 10]);
}

#[test]
fn test_histogram_datum_count() {
    let (registry, client, config) = setup();
    registry.histogram("histo").unwrap().update(1);

    emit_metrics(&config).unwrap();
    assert_eq!(client.metrics_put(), 5 + DEFAULT_PERCENTILES.len());
}

#[test]
fn test_timer_datum_count() {
    let (registry, client, config) = setup();
    registry.timer("timer").unwrap().update(Duration::from_millis(3));

    emit_metrics(&config).unwrap();
    assert_eq!(client.metrics_put(), 9 + DEFAULT_PERCENTILES.len());
}

#[test]
fn test_custom_percentiles() {
    let (registry, client, config) = setup();
    registry.histogram("histo").unwrap().update(1);
    let config = config.with_filter(PercentileFilter::new([0.1, 0.999]));

    emit_metrics(&config).unwrap();
    let inputs = client.inputs();
    let names: Vec<_> = inputs[0]
        .metric_data
        .iter()
        .map(|d| d.metric_name.as_str())
        .collect();
    assert_eq!(names.len(), 7);
    assert_eq!(&names[5..], &["histo.p10", "histo.p999"]);
}

#[test]
fn test_all_filter_sends_nothing() {
    let (registry, client, config) = setup();
    registry.counter("c").unwrap().inc(1);
    registry.histogram("h").unwrap().update(1);
    registry.timer("t").unwrap().update(Duration::from_millis(1));

    let report = emit_metrics(&config.with_filter(AllFilter)).unwrap();
    assert_eq!(report.datums, 0);
    assert_eq!(client.requests(), 0);
}

#[test]
fn test_closure_filter() {
    let (registry, client, config) = setup();
    registry.counter("public.hits").unwrap().inc(1);
    registry.counter("internal.hits").unwrap().inc(1);

    let config = config.with_filter(|name: &str| name.starts_with("public."));
    emit_metrics(&config).unwrap();
    let inputs = client.inputs();
    assert_eq!(inputs[0].metric_data.len(), 1);
    assert_eq!(inputs[0].metric_data[0].metric_name, "public.hits");
}

#[test]
fn test_empty_registry_makes_no_requests() {
    let (_registry, client, config) = setup();

    let report = emit_metrics(&config).unwrap();
    assert_eq!(report.datums, 0);
    assert_eq!(report.batches(), 0);
    assert_eq!(client.requests(), 0);
}

#[test]
fn test_emit_is_repeatable() {
    let (registry, client, config) = setup();
    registry.counter("c").unwrap().inc(5);
    registry.gauge("g").unwrap().update(0.25);

    emit_metrics(&config).unwrap();
    emit_metrics(&config).unwrap();

    let inputs = client.inputs();
    assert_eq!(inputs.len(), 2);
    let values = |input: &PutMetricDataInput| -> Vec<(String, f64)> {
        input
            .metric_data
            .iter()
            .map(|d| (d.metric_name.clone(), d.value))
            .collect()
    };
    assert_eq!(values(&inputs[0]), values(&inputs[1]));
}

#[test]
fn test_batches_are_full_except_the_last() {
    for (counters, batch_size) in [(1usize, 20usize), (20, 20), (41, 20), (99, 7), (250, 1000)] {
        let (registry, client, config) = setup();
        for i in 0..counters {
            registry.counter(&format!("c{i:03}")).unwrap().inc(1);
        }

        emit_metrics(&config.with_max_batch_size(batch_size)).unwrap();

        let inputs = client.inputs();
        assert_eq!(inputs.len(), counters.div_ceil(batch_size));
        let (last, full) = inputs.split_last().unwrap();
        assert!(full.iter().all(|i| i.len() == batch_size));
        assert!(!last.is_empty() && last.len() <= batch_size);
        assert_eq!(client.metrics_put(), counters);
    }
}

#[test]
fn test_concurrent_updates_during_emit() {
    let (registry, client, config) = setup();
    let counter = registry.counter("busy").unwrap();
    let timer = registry.timer("busy-timer").unwrap();

    let writers: Vec<_> = (0..4)
        .map(|i| {
            let registry = registry.clone();
            let counter = counter.clone();
            let timer = timer.clone();
            thread::spawn(move || {
                for j in 0..500 {
                    counter.inc(1);
                    timer.update(Duration::from_micros(j));
                    registry.gauge(&format!("gauge-{i}-{}", j % 10)).unwrap().update(1.0);
                }
            })
        })
        .collect();

    for _ in 0..10 {
        let report = emit_metrics(&config).unwrap();
        assert!(report.skipped_metrics.is_empty());
    }
    for writer in writers {
        writer.join().unwrap();
    }

    emit_metrics(&config).unwrap();
    let inputs = client.inputs();
    let last_busy = inputs
        .iter()
        .flat_map(|i| &i.metric_data)
        .filter(|d| d.metric_name == "busy")
        .last()
        .unwrap();
    assert_eq!(last_busy.value, 2000.0);
}

#[test]
fn test_reset_counters_loses_no_increments() {
    let (registry, client, config) = setup();
    let counter = registry.counter("hits").unwrap();
    let config = config.with_reset_counters_on_report(true);
    let total: u32 = 200_000;

    let writer = {
        let counter = counter.clone();
        thread::spawn(move || {
            for _ in 0..total {
                counter.inc(1);
            }
        })
    };
    while !writer.is_finished() {
        emit_metrics(&config).unwrap();
    }
    writer.join().unwrap();
    emit_metrics(&config).unwrap();

    let reported: f64 = client
        .inputs()
        .iter()
        .flat_map(|i| &i.metric_data)
        .map(|d| d.value)
        .sum();
    assert_eq!(reported, f64::from(total));
    assert_eq!(counter.count(), 0);
}

struct FixedRegistry {
    counter: FixedCounter,
}

struct FixedCounter(i64);

impl CounterValue for FixedCounter {
    fn count(&self) -> i64 {
        self.0
    }
}

impl Registry for FixedRegistry {
    fn each(&self, f: &mut dyn FnMut(&str, Metric<'_>)) {
        f("fixed.total", Metric::Counter(&self.counter));
        f("fixed.ratio", Metric::Gauge(0.5));
    }
}

#[test]
fn test_custom_registry() {
    let _ = pretty_env_logger::try_init();
    let client = Arc::new(MockPutMetricsClient::default());
    let registry = Arc::new(FixedRegistry {
        counter: FixedCounter(-3),
    });
    let config = Config::new(registry, client.clone()).with_dimension("service", "billing");

    emit_metrics(&config).unwrap();

    let inputs = client.inputs();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].namespace, "metrics");
    let data = &inputs[0].metric_data;
    assert_eq!(data[0].metric_name, "fixed.total");
    assert_eq!(data[0].value, -3.0);
    assert_eq!(data[0].unit, StandardUnit::Count);
    assert_eq!(data[1].metric_name, "fixed.ratio");
    assert_eq!(data[1].dimensions[0].name, "service");
}
