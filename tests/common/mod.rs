//! Shared integration-test harness: a presenter that records every call
//! and helpers for driving a machine through its phases under paused time.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use memoseq::config::GameConfig;
use memoseq::icon::Icon;
use memoseq::phase::{GamePhase, GamePhaseMachine, GameState, MachineEvent};
use memoseq::presenter::{AnimationKind, AnimationTarget, Presenter};
use memoseq::selector::RandomSelector;

/// Upper bound on virtual time spent waiting for a machine event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(300);

/// One presenter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Render(Vec<(usize, Icon)>),
    Animate(AnimationTarget, AnimationKind),
    Title(String),
    Interactable(usize, bool),
    State(GameState),
}

/// Presenter that records calls in order; animations sleep for their
/// duration.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<Call>>,
}

impl RecordingPresenter {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|call| *call == wanted).count()
    }

    /// Icons shown during reveals, in order.
    pub fn revealed(&self) -> Vec<Icon> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Animate(AnimationTarget::RevealIcon(icon), AnimationKind::Show) => {
                    Some(icon)
                }
                _ => None,
            })
            .collect()
    }

    /// Grid slots animated with `kind`, in call order.
    pub fn slot_animations(&self, kind: AnimationKind) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Animate(AnimationTarget::GridSlot(slot), k) if k == kind => Some(slot),
                _ => None,
            })
            .collect()
    }

    pub fn titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Title(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_state(&self) -> Option<GameState> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::State(state) => Some(state),
            _ => None,
        })
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Presenter for RecordingPresenter {
    fn render_grid_icons(&self, slots: &[(usize, Icon)]) {
        self.record(Call::Render(slots.to_vec()));
    }

    async fn animate(&self, target: AnimationTarget, kind: AnimationKind, duration: Duration) {
        self.record(Call::Animate(target, kind));
        tokio::time::sleep(duration).await;
    }

    fn set_title_text(&self, text: &str) {
        self.record(Call::Title(text.to_string()));
    }

    fn set_button_interactable(&self, slot: usize, interactable: bool) {
        self.record(Call::Interactable(slot, interactable));
    }

    fn state_changed(&self, state: &GameState) {
        self.record(Call::State(*state));
    }
}

/// A seeded machine on the default configuration.
pub fn machine(seed: u64) -> (GamePhaseMachine, Arc<RecordingPresenter>) {
    machine_with(&GameConfig::default(), seed)
}

pub fn machine_with(config: &GameConfig, seed: u64) -> (GamePhaseMachine, Arc<RecordingPresenter>) {
    let presenter = Arc::new(RecordingPresenter::default());
    let machine = GamePhaseMachine::with_selector(
        config,
        Arc::clone(&presenter) as Arc<dyn Presenter>,
        RandomSelector::seeded(seed),
    )
    .unwrap();
    (machine, presenter)
}

/// Waits for the first event matching `matches`, skipping the rest.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<MachineEvent>,
    matches: impl Fn(&MachineEvent) -> bool,
) -> MachineEvent {
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = rx.recv().await.unwrap();
            if matches(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for machine event")
}

pub async fn wait_for_phase(rx: &mut broadcast::Receiver<MachineEvent>, phase: GamePhase) {
    wait_for(
        rx,
        |event| matches!(event, MachineEvent::PhaseChanged { to, .. } if *to == phase),
    )
    .await;
}

/// Starts a machine and waits until it accepts a new game.
pub async fn started(
    seed: u64,
) -> (
    GamePhaseMachine,
    Arc<RecordingPresenter>,
    broadcast::Receiver<MachineEvent>,
) {
    let (machine, presenter) = machine(seed);
    let mut rx = machine.subscribe();
    machine.start();
    wait_for_phase(&mut rx, GamePhase::AwaitingStart).await;
    (machine, presenter, rx)
}

/// Requests a new game and waits until taps are accepted. Returns the
/// round sequence.
pub async fn begin_round(
    machine: &GamePhaseMachine,
    rx: &mut broadcast::Receiver<MachineEvent>,
) -> Vec<Icon> {
    assert!(machine.request_new_game());
    wait_for(rx, |event| matches!(event, MachineEvent::TimerStarted)).await;
    machine.round_sequence()
}

/// Drains every event already broadcast.
pub fn drain(rx: &mut broadcast::Receiver<MachineEvent>) -> Vec<MachineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Lets spawned tasks run without advancing past pending timers.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Binary helpers
// ============================================================================

pub fn run_binary(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_memoseq"))
        .args(args)
        .env_remove("MEMOSEQ_CONFIG")
        .env_remove("MEMOSEQ_LOG_LEVEL")
        .env_remove("MEMOSEQ_LOG_FORMAT")
        .output()
        .expect("failed to run memoseq")
}

pub fn write_config(dir: &tempfile::TempDir, name: &str, yaml: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, yaml).unwrap();
    path
}
