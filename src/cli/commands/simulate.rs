//! Headless bot play.
//!
//! The bot watches the reveal through its presenter, then taps the
//! sequence back through the machine's action channel, optionally
//! slipping in wrong taps.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{ACTION_CAPACITY, Session, load_config, stop_reason};
use crate::cli::args::{OutputFormat, SimulateArgs};
use crate::error::{ConfigError, MemoseqError};
use crate::icon::Icon;
use crate::phase::{GamePhase, GamePhaseMachine, MachineEvent, UserAction};
use crate::presenter::{AnimationKind, AnimationTarget, Presenter};

// ============================================================================
// Report
// ============================================================================

/// Outcome of one bot round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    /// 1-based round number.
    pub round: u32,
    /// Taps counted by the machine.
    pub attempts: u32,
    /// Deliberate wrong taps.
    pub wrong_taps: u32,
    /// Timer ticks at the winning tap.
    pub elapsed_seconds: u64,
}

#[derive(Debug, Serialize)]
struct SimulationReport<'a> {
    requested_rounds: u32,
    rounds: &'a [RoundReport],
}

// ============================================================================
// Bot presenter
// ============================================================================

/// Presenter that remembers the icons shown during the reveal.
#[derive(Debug, Default)]
struct BotPresenter {
    memory: Mutex<Vec<Icon>>,
}

impl BotPresenter {
    fn forget(&self) {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn recall(&self) -> Vec<Icon> {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Presenter for BotPresenter {
    fn render_grid_icons(&self, _slots: &[(usize, Icon)]) {}

    async fn animate(&self, target: AnimationTarget, kind: AnimationKind, duration: Duration) {
        if let (AnimationTarget::RevealIcon(icon), AnimationKind::Show) = (target, kind) {
            self.memory
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(icon);
        }
        tokio::time::sleep(duration).await;
    }

    fn set_title_text(&self, _text: &str) {}

    fn set_button_interactable(&self, _slot: usize, _interactable: bool) {}
}

// ============================================================================
// Command
// ============================================================================

/// Let the bot play `--rounds` rounds and print a report.
///
/// # Errors
///
/// Returns a config error for an out-of-range `--mistake-rate` or
/// `--time-scale`, or when the configuration cannot be loaded, and a game
/// error if its icons cannot fill the grid.
pub async fn run(args: &SimulateArgs, cancel: CancellationToken) -> Result<(), MemoseqError> {
    if !(0.0..=1.0).contains(&args.mistake_rate) {
        return Err(ConfigError::InvalidValue {
            field: "--mistake-rate".to_string(),
            value: args.mistake_rate.to_string(),
            expected: "a probability between 0 and 1".to_string(),
        }
        .into());
    }
    if !args.time_scale.is_finite() || args.time_scale < 0.0 {
        return Err(ConfigError::InvalidValue {
            field: "--time-scale".to_string(),
            value: args.time_scale.to_string(),
            expected: "a non-negative number".to_string(),
        }
        .into());
    }

    let mut config = (*load_config(args.game.config.as_deref())?).clone();
    config.timings = config.timings.scaled(args.time_scale);

    let presenter = Arc::new(BotPresenter::default());
    let session = Session::open(&config, Arc::clone(&presenter) as Arc<dyn Presenter>, &args.game)?;
    let machine = session.machine().clone();
    let events = machine.subscribe();
    machine.start();

    let (tx, rx) = mpsc::channel(ACTION_CAPACITY);
    let rng = args
        .game
        .seed
        .map_or_else(StdRng::from_os_rng, |seed| {
            StdRng::seed_from_u64(seed.wrapping_add(1))
        });
    let mut bot = Bot {
        machine: machine.clone(),
        presenter,
        actions: tx,
        events,
        rng,
        mistake_rate: args.mistake_rate,
        cancel: cancel.clone(),
    };

    let play = async move {
        let mut reports = Vec::new();
        for round in 1..=args.rounds {
            let Some(report) = bot.play_round(round).await else {
                break;
            };
            info!(
                round,
                attempts = report.attempts,
                elapsed_seconds = report.elapsed_seconds,
                "bot round finished"
            );
            reports.push(report);
        }
        // Dropping the bot closes the action channel and ends the run loop.
        drop(bot);
        reports
    };
    let (result, reports) = tokio::join!(machine.run(rx, cancel.clone()), play);

    session.close(stop_reason(&cancel)).await;
    result?;

    print_report(args, &reports)
}

fn print_report(args: &SimulateArgs, reports: &[RoundReport]) -> Result<(), MemoseqError> {
    match args.format {
        OutputFormat::Human => {
            for report in reports {
                println!(
                    "round {}: {} attempts ({} wrong), {}s",
                    report.round, report.attempts, report.wrong_taps, report.elapsed_seconds
                );
            }
            if reports.len() < args.rounds as usize {
                println!("stopped after {} of {} rounds", reports.len(), args.rounds);
            }
        }
        OutputFormat::Json => {
            let report = SimulationReport {
                requested_rounds: args.rounds,
                rounds: reports,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

// ============================================================================
// Bot
// ============================================================================

struct Bot {
    machine: GamePhaseMachine,
    presenter: Arc<BotPresenter>,
    actions: mpsc::Sender<UserAction>,
    events: broadcast::Receiver<MachineEvent>,
    rng: StdRng,
    mistake_rate: f64,
    cancel: CancellationToken,
}

impl Bot {
    /// Plays one round. Returns `None` when the session is cancelled.
    async fn play_round(&mut self, round: u32) -> Option<RoundReport> {
        self.wait_for(|event| {
            matches!(
                event,
                MachineEvent::PhaseChanged {
                    to: GamePhase::AwaitingStart,
                    ..
                }
            )
        })
        .await?;

        self.presenter.forget();
        self.send(UserAction::NewGame).await?;
        self.wait_for(|event| matches!(event, MachineEvent::TimerStarted))
            .await?;

        let sequence = self.presenter.recall();
        debug!(round, length = sequence.len(), "bot recalled sequence");

        let mut wrong_taps = 0;
        for (i, icon) in sequence.iter().enumerate() {
            // Only icons still ahead in the sequence make a wrong tap;
            // already matched ones would count as repeats.
            let ahead = &sequence[i + 1..];
            if !ahead.is_empty() && self.rng.random_bool(self.mistake_rate) {
                let wrong = ahead[self.rng.random_range(0..ahead.len())].clone();
                self.send(UserAction::Tap(wrong)).await?;
                wrong_taps += 1;
            }
            self.send(UserAction::Tap(icon.clone())).await?;
        }

        let MachineEvent::RoundWon {
            attempts,
            elapsed_seconds,
        } = self
            .wait_for(|event| matches!(event, MachineEvent::RoundWon { .. }))
            .await?
        else {
            return None;
        };

        Some(RoundReport {
            round,
            attempts,
            wrong_taps,
            elapsed_seconds,
        })
    }

    async fn send(&self, action: UserAction) -> Option<()> {
        self.actions.send(action).await.ok()
    }

    async fn wait_for(&mut self, matches: impl Fn(&MachineEvent) -> bool) -> Option<MachineEvent> {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return None,
                received = self.events.recv() => match received {
                    Ok(event) if matches(&event) => return Some(event),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "bot lagged behind machine events");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bot_presenter_remembers_revealed_icons_only() {
        let bot = BotPresenter::default();
        bot.animate(
            AnimationTarget::RevealIcon(Icon::new("moon")),
            AnimationKind::Show,
            Duration::from_millis(10),
        )
        .await;
        bot.animate(
            AnimationTarget::RevealIcon(Icon::new("moon")),
            AnimationKind::Hide,
            Duration::from_millis(10),
        )
        .await;
        bot.animate(
            AnimationTarget::GridSlot(0),
            AnimationKind::Enter,
            Duration::from_millis(10),
        )
        .await;

        assert_eq!(bot.recall(), vec![Icon::new("moon")]);
        bot.forget();
        assert!(bot.recall().is_empty());
    }
}
