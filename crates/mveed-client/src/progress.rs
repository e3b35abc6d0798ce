//! Cosmetic download progress.
//!
//! The percentage is a timer-driven animation, not a measurement of bytes
//! transferred. It creeps toward a ceiling while the request runs and only
//! jumps to 100 (or back to 0) when the caller reports completion.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

/// Shape of the animation.
#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    pub initial: u8,
    pub step: u8,
    pub ceiling: u8,
    pub tick: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            initial: 5,
            step: 5,
            ceiling: 90,
            tick: Duration::from_millis(400),
        }
    }
}

/// Running animation. Dropping it stops the ticker.
#[derive(Debug)]
pub struct ProgressAnimation {
    tx: watch::Sender<u8>,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressAnimation {
    /// Start at `config.initial` and advance every `config.tick`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn start(config: ProgressConfig) -> Self {
        let (tx, _rx) = watch::channel(config.initial);
        Self::start_on(tx, config)
    }

    /// Drive an existing channel, resetting it to `config.initial` first.
    pub fn start_on(tx: watch::Sender<u8>, config: ProgressConfig) -> Self {
        tx.send_replace(config.initial);
        let ticker_tx = tx.clone();

        let ticker = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + config.tick, config.tick);
            loop {
                interval.tick().await;
                ticker_tx.send_modify(|value| {
                    if *value < config.ceiling {
                        *value = value.saturating_add(config.step).min(config.ceiling);
                    }
                });
            }
        });

        Self {
            tx,
            ticker: Some(ticker),
        }
    }

    pub fn value(&self) -> u8 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    /// Stop the ticker and settle at 100 on success, 0 on failure.
    pub fn finish(mut self, success: bool) -> u8 {
        self.stop();
        let final_value = if success { 100 } else { 0 };
        self.tx.send_replace(final_value);
        final_value
    }

    fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for ProgressAnimation {
    fn drop(&mut self) {
        self.stop();
    }
}
