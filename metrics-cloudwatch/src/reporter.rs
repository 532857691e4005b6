//! Periodic export on a background thread.

use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::emit::{emit_metrics, EmitError, EmitReport};

/// Raised by [`Reporter::start`].
#[derive(Debug, Error)]
pub enum ReporterError {
    /// The configuration cannot be used for an export.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    /// The reporting interval is zero.
    #[error("reporting interval must not be zero")]
    ZeroInterval,
    /// The worker thread could not be spawned.
    #[error("failed to spawn reporter thread")]
    Spawn(#[source] io::Error),
}

fn run_once(config: &Config) -> Result<EmitReport, EmitError> {
    let result = emit_metrics(config);
    match result {
        Ok(ref report) => log::debug!(
            "reported {} datums in {} batches",
            report.datums,
            report.batches_sent
        ),
        Err(ref err) => log::error!("failed to report metrics: {}", err),
    }
    result
}

/// Exports a registry every [`Config::reporting_interval`] until stopped.
///
/// The first export happens one interval after the reporter was started.
/// Failed exports are logged and never stop the loop. Dropping the reporter
/// stops the worker thread and waits for it; an export in progress is
/// completed first.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use metrics_cloudwatch::registry::StandardRegistry;
/// use metrics_cloudwatch::{Config, Reporter};
/// # use metrics_cloudwatch::{ClientError, PutMetricsClient, protocol::PutMetricDataInput};
/// # struct Discard;
/// # impl PutMetricsClient for Discard {
/// #     fn put_metric_data(&self, _: &PutMetricDataInput) -> Result<(), ClientError> { Ok(()) }
/// # }
///
/// let registry = Arc::new(StandardRegistry::new());
/// let config = Config::new(registry.clone(), Arc::new(Discard))
///     .with_reporting_interval(Duration::from_secs(30))
///     .with_flush_on_shutdown(true);
///
/// let reporter = Reporter::start(config).unwrap();
/// registry.counter("requests").unwrap().inc(1);
/// reporter.stop();
/// ```
pub struct Reporter {
    config: Config,
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl Reporter {
    /// Validates `config` and starts the worker thread.
    pub fn start(config: Config) -> Result<Self, ReporterError> {
        config.validate()?;
        let interval = config.reporting_interval;
        if interval.is_zero() {
            return Err(ReporterError::ZeroInterval);
        }

        #[allow(clippy::mutex_atomic)]
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));

        let worker_config = config.clone();
        let worker_shutdown = shutdown.clone();
        let worker = std::thread::Builder::new()
            .name("metrics-cloudwatch-reporter".into())
            .spawn(move || {
                let (lock, cvar) = worker_shutdown.as_ref();
                let mut shutdown = lock.lock().unwrap_or_else(PoisonError::into_inner);
                // check this immediately, in case the reporter is already being dropped
                if *shutdown {
                    return;
                }
                let mut last_report = Instant::now();
                loop {
                    let timeout = interval
                        .checked_sub(last_report.elapsed())
                        .unwrap_or(Duration::ZERO);
                    shutdown = cvar
                        .wait_timeout(shutdown, timeout)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                    if *shutdown {
                        return;
                    }
                    if last_report.elapsed() >= interval {
                        last_report = Instant::now();
                        run_once(&worker_config).ok();
                    }
                }
            })
            .map_err(ReporterError::Spawn)?;

        log::debug!(
            "started reporter for namespace {} every {:?}",
            config.namespace,
            interval
        );

        Ok(Self {
            config,
            shutdown,
            worker: Some(worker),
        })
    }

    /// The configuration the reporter exports with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Exports once on the calling thread, independent of the interval.
    pub fn report_now(&self) -> Result<EmitReport, EmitError> {
        run_once(&self.config)
    }

    /// Stops the worker thread and waits for it to exit.
    ///
    /// If [`Config::flush_on_shutdown`] is set, one last export is made.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        let (lock, cvar) = self.shutdown.as_ref();
        *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_one();

        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
        if self.config.flush_on_shutdown {
            run_once(&self.config).ok();
        }
        log::debug!("stopped reporter for namespace {}", self.config.namespace);
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("config", &self.config)
            .field("running", &self.worker.is_some())
            .finish()
    }
}
