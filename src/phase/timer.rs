//! Round timer
//!
//! A periodic tick task that is either stopped or running. Starting it
//! again first stops the previous run, so at most one tick task is ever
//! live. Each run carries a generation number handed to the tick
//! callback; the owner uses it to discard ticks from a stopped run.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::GameError;

#[derive(Debug)]
struct TimerRun {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Periodic timer driving the elapsed-time counter of a round.
#[derive(Debug)]
pub struct RoundTimer {
    period: Duration,
    next_generation: u64,
    run: Option<TimerRun>,
}

impl RoundTimer {
    /// Creates a stopped timer ticking every `period` once started.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ZeroTick`] if `period` is zero.
    pub const fn new(period: Duration) -> Result<Self, GameError> {
        if period.is_zero() {
            return Err(GameError::ZeroTick);
        }
        Ok(Self {
            period,
            next_generation: 0,
            run: None,
        })
    }

    /// Whether a run is live.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Whether `generation` identifies the live run.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.generation == generation)
    }

    /// Starts a new run, stopping any previous one first.
    ///
    /// `on_tick` is called once per period, the first time one full
    /// period after this call, with the run's generation. Returns that
    /// generation.
    pub fn start<F>(&mut self, on_tick: F) -> u64
    where
        F: Fn(u64) + Send + 'static,
    {
        self.stop();

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let token = CancellationToken::new();
        let period = self.period;

        let task = tokio::spawn({
            let token = token.clone();
            async move {
                let mut interval = tokio::time::interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            trace!(generation, "timer run cancelled");
                            break;
                        }
                        _ = interval.tick() => on_tick(generation),
                    }
                }
            }
        });

        debug!(generation, period_ms = period.as_millis(), "timer started");
        self.run = Some(TimerRun {
            generation,
            token,
            task,
        });
        generation
    }

    /// Stops the live run. Idempotent; returns `true` if a run was live.
    pub fn stop(&mut self) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };
        run.token.cancel();
        run.task.abort();
        debug!(generation = run.generation, "timer stopped");
        true
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    fn counting() -> (Arc<AtomicU64>, impl Fn(u64) + Send + 'static) {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ticks);
        (ticks, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period() {
        let mut timer = RoundTimer::new(Duration::from_secs(1)).unwrap();
        let (ticks, on_tick) = counting();
        timer.start(on_tick);
        assert!(timer.is_running());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_halts_ticks() {
        let mut timer = RoundTimer::new(Duration::from_secs(1)).unwrap();
        let (ticks, on_tick) = counting();
        timer.start(on_tick);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(timer.stop());
        assert!(!timer.stop());
        assert!(!timer.is_running());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_leaves_a_single_tick_stream() {
        let mut timer = RoundTimer::new(Duration::from_secs(1)).unwrap();
        let (first_ticks, first) = counting();
        let (second_ticks, second) = counting();

        let g1 = timer.start(first);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let g2 = timer.start(second);

        assert!(!timer.is_current(g1));
        assert!(timer.is_current(g2));

        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(first_ticks.load(Ordering::SeqCst), 1);
        assert_eq!(second_ticks.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn zero_period_is_rejected() {
        assert_eq!(
            RoundTimer::new(Duration::ZERO).unwrap_err(),
            GameError::ZeroTick
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_tick_before_first_period() {
        let mut timer = RoundTimer::new(Duration::from_secs(1)).unwrap();
        let (ticks, on_tick) = counting();
        timer.start(on_tick);
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
