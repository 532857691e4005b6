use std::time::Duration;

/// The interval at which moving averages are ticked.
pub(crate) const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// An exponentially weighted moving average of an event rate.
#[derive(Debug, Clone)]
pub(crate) struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    /// Creates an average decaying over the given number of minutes.
    pub(crate) fn with_minutes(minutes: f64) -> Self {
        let interval = TICK_INTERVAL.as_secs_f64();
        Self {
            alpha: 1.0 - (-interval / 60.0 / minutes).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    /// Folds the events of one tick interval into the average.
    pub(crate) fn tick(&mut self, uncounted: u64) {
        let instant_rate = uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }

    /// Applies `ticks` empty intervals at once.
    pub(crate) fn decay(&mut self, ticks: u32) {
        if ticks == 0 {
            return;
        }
        if !self.initialized {
            self.initialized = true;
            return;
        }
        self.rate *= (1.0 - self.alpha).powi(ticks.min(i32::MAX as u32) as i32);
    }

    /// The current rate in events per second.
    pub(crate) fn rate(&self) -> f64 {
        self.rate
    }
}
