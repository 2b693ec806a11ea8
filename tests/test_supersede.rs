//! Overlapping new-game requests: only the newest round may start the
//! timer or touch the game state.

mod common;

use std::time::Duration;

use common::{Call, EVENT_TIMEOUT, begin_round, drain, started, wait_for, wait_for_phase};
use memoseq::phase::{ChainKind, GamePhase, MachineEvent, TapOutcome};
use memoseq::presenter::{AnimationKind, AnimationTarget};
use tokio::sync::broadcast;

fn timer_starts(events: &[MachineEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, MachineEvent::TimerStarted))
        .count()
}

/// Collects events up to and including the move into `phase`.
async fn collect_until_phase(
    rx: &mut broadcast::Receiver<MachineEvent>,
    phase: GamePhase,
) -> Vec<MachineEvent> {
    let mut events = Vec::new();
    tokio::time::timeout(EVENT_TIMEOUT, async {
        loop {
            let event = rx.recv().await.unwrap();
            let done = matches!(event, MachineEvent::PhaseChanged { to, .. } if to == phase);
            events.push(event);
            if done {
                return;
            }
        }
    })
    .await
    .unwrap();
    events
}

#[tokio::test(start_paused = true)]
async fn back_to_back_requests_start_one_timer() {
    let (machine, presenter, mut rx) = started(11).await;

    assert!(machine.request_new_game());
    assert!(machine.request_new_game());

    let mut events = collect_until_phase(&mut rx, GamePhase::AwaitingInput).await;
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    events.extend(drain(&mut rx));

    assert_eq!(timer_starts(&events), 1);
    assert_eq!(
        presenter.count(&Call::Animate(
            AnimationTarget::RevealSurface,
            AnimationKind::Show
        )),
        1
    );
    assert_eq!(presenter.revealed(), machine.round_sequence());
    assert_eq!(machine.state().elapsed_seconds, 30);
}

#[tokio::test(start_paused = true)]
async fn request_during_reveal_restarts_it() {
    let (machine, presenter, mut rx) = started(12).await;

    assert!(machine.request_new_game());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(machine.state().phase, GamePhase::Revealing);
    assert!(machine.is_chain_active(ChainKind::Reveal));
    let partial = presenter.revealed().len();
    assert!(partial > 0 && partial < 6, "reveal should be mid-way: {partial}");

    assert!(machine.request_new_game());
    let superseded = wait_for(&mut rx, |event| {
        matches!(event, MachineEvent::ChainSuperseded { .. })
    })
    .await;
    assert_eq!(
        superseded,
        MachineEvent::ChainSuperseded {
            kind: ChainKind::Reveal
        }
    );

    let mut events = collect_until_phase(&mut rx, GamePhase::AwaitingInput).await;
    tokio::time::sleep(Duration::from_millis(30_500)).await;
    events.extend(drain(&mut rx));
    assert_eq!(timer_starts(&events), 1);

    let revealed = presenter.revealed();
    assert_eq!(revealed.len(), partial + 6);
    assert_eq!(revealed[partial..], machine.round_sequence()[..]);
    assert_eq!(machine.state().elapsed_seconds, 30);
}

#[tokio::test(start_paused = true)]
async fn restart_mid_input_drops_the_old_timer() {
    let (machine, _presenter, mut rx) = started(13).await;
    begin_round(&machine, &mut rx).await;

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(machine.state().elapsed_seconds, 2);

    assert!(machine.request_new_game());
    assert!(!machine.is_timer_running());
    wait_for(&mut rx, |event| matches!(event, MachineEvent::TimerStarted)).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(machine.state().elapsed_seconds, 1);
}

#[tokio::test(start_paused = true)]
async fn stale_reveal_never_enables_input() {
    let (machine, _presenter, mut rx) = started(14).await;

    // A default reveal takes 11s; restart it during its closing title
    // transition.
    assert!(machine.request_new_game());
    tokio::time::sleep(Duration::from_millis(10_800)).await;
    assert!(machine.request_new_game());
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(machine.state().phase, GamePhase::Revealing);
    let icon = machine.grid()[0].clone();
    assert_eq!(machine.handle_tap(&icon), TapOutcome::Ignored);

    wait_for_phase(&mut rx, GamePhase::AwaitingInput).await;
    assert!(machine.is_timer_running());
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_everything() {
    let (machine, _presenter, mut rx) = started(15).await;
    begin_round(&machine, &mut rx).await;

    machine.shutdown();
    assert!(!machine.is_timer_running());
    let elapsed = machine.state().elapsed_seconds;

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(machine.state().elapsed_seconds, elapsed);
    assert_eq!(machine.handle_tap(&machine.grid()[0]), TapOutcome::Ignored);
}
