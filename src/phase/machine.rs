//! Game phase machine
//!
//! Drives `Idle → SettingUp → AwaitingStart → Revealing → AwaitingInput
//! → Won → SettingUp`. Each multi-step phase runs as a chain (see
//! [`super::chain`]); the round timer is started by the reveal chain and
//! stopped by the winning tap or by the next round.
//!
//! Game state, board, selector, chain slots and timer share one mutex.
//! It is never held across an `.await`: chain bodies await presenter
//! animations unlocked and re-enter through [`Inner::apply`], which
//! drops the continuation if the chain was superseded meanwhile.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::config::{GameConfig, Timings, Titles};
use crate::error::GameError;
use crate::icon::{GRID_SIZE, Icon, IconPool};
use crate::presenter::{AnimationKind, AnimationTarget, Presenter};
use crate::selector::RandomSelector;

use super::chain::{ActiveChains, ChainKind, ChainTicket, spawn_chain};
use super::input::{InputValidator, TapOutcome};
use super::state::{Board, GamePhase, GameState, MachineEvent, UserAction};
use super::timer::RoundTimer;

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Top-level state machine of the memory game.
///
/// Cheap to clone; clones drive the same game.
#[derive(Clone)]
pub struct GamePhaseMachine {
    inner: Arc<Inner>,
}

struct Inner {
    timings: Timings,
    titles: Titles,
    pool: IconPool,
    presenter: Arc<dyn Presenter>,
    core: Mutex<Core>,
    events: broadcast::Sender<MachineEvent>,
}

struct Core {
    state: GameState,
    board: Board,
    selector: RandomSelector,
    chains: ActiveChains,
    timer: RoundTimer,
}

impl GamePhaseMachine {
    /// Creates a machine with an OS-seeded selector.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PoolTooSmall`] if the configured icons cannot
    /// fill the grid, or [`GameError::ZeroTick`] if the timer period is
    /// zero.
    pub fn new(config: &GameConfig, presenter: Arc<dyn Presenter>) -> Result<Self, GameError> {
        Self::with_selector(config, presenter, RandomSelector::from_os_rng())
    }

    /// Creates a machine drawing from the given selector.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PoolTooSmall`] if the configured icons cannot
    /// fill the grid, or [`GameError::ZeroTick`] if the timer period is
    /// zero.
    pub fn with_selector(
        config: &GameConfig,
        presenter: Arc<dyn Presenter>,
        selector: RandomSelector,
    ) -> Result<Self, GameError> {
        let pool = config.icon_pool()?;
        let timer = RoundTimer::new(config.timings.tick)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let core = Core {
            state: GameState::default(),
            board: Board::new(),
            selector,
            chains: ActiveChains::new(),
            timer,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                timings: config.timings,
                titles: config.titles.clone(),
                pool,
                presenter,
                core: Mutex::new(core),
                events,
            }),
        })
    }

    /// Leaves `Idle` and runs the first setup. Must be called from within
    /// a tokio runtime. Calling it again is a no-op.
    pub fn start(&self) {
        let mut core = self.inner.lock();
        if core.state.phase != GamePhase::Idle {
            debug!(phase = %core.state.phase, "start ignored: machine already running");
            return;
        }
        info!(pool_size = self.inner.pool.len(), "starting game");
        self.inner.presenter.set_title_text(&self.inner.titles.idle);
        self.inner.begin_setup(&mut core);
    }

    /// Starts a new round (the "new game" action).
    ///
    /// Returns `false` when the request is ignored because setup or the
    /// win sequence is still running.
    pub fn request_new_game(&self) -> bool {
        self.inner.request_new_game()
    }

    /// Feeds one grid tap to the input validator.
    pub fn handle_tap(&self, icon: &Icon) -> TapOutcome {
        self.inner.handle_tap(icon)
    }

    /// Consumes user actions in arrival order until the channel closes or
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotStarted`] if [`start`](Self::start) has not
    /// been called.
    pub async fn run(
        &self,
        mut actions: mpsc::Receiver<UserAction>,
        cancel: CancellationToken,
    ) -> Result<(), GameError> {
        if self.state().phase == GamePhase::Idle {
            return Err(GameError::NotStarted);
        }

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("run loop cancelled");
                    break;
                }
                action = actions.recv() => match action {
                    Some(UserAction::NewGame) => {
                        self.request_new_game();
                    }
                    Some(UserAction::Tap(icon)) => {
                        self.handle_tap(&icon);
                    }
                    None => {
                        debug!("action channel closed");
                        break;
                    }
                },
            }
        }
        Ok(())
    }

    /// Cancels every chain and stops the timer.
    pub fn shutdown(&self) {
        let mut core = self.inner.lock();
        core.chains.cancel_all();
        self.inner.stop_timer(&mut core);
        debug!("machine shut down");
    }

    /// Returns a snapshot of the game state.
    #[must_use]
    pub fn state(&self) -> GameState {
        self.inner.lock().state
    }

    /// Icons in grid slot order; empty before the first setup draw.
    #[must_use]
    pub fn grid(&self) -> Vec<Icon> {
        self.inner.lock().board.grid().to_vec()
    }

    /// The current round sequence; empty before the first round.
    #[must_use]
    pub fn round_sequence(&self) -> Vec<Icon> {
        self.inner.lock().board.sequence().to_vec()
    }

    /// Whether the round timer is running.
    #[must_use]
    pub fn is_timer_running(&self) -> bool {
        self.inner.lock().timer.is_running()
    }

    /// Whether a chain of `kind` is bound.
    #[must_use]
    pub fn is_chain_active(&self, kind: ChainKind) -> bool {
        self.inner.lock().chains.slot(kind).is_active()
    }

    /// Subscribes to machine events emitted from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MachineEvent> {
        self.inner.events.subscribe()
    }
}

impl std::fmt::Debug for GamePhaseMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.lock();
        f.debug_struct("GamePhaseMachine")
            .field("state", &core.state)
            .field("timer_running", &core.timer.is_running())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: MachineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish(&self, core: &Core) {
        self.presenter.state_changed(&core.state);
    }

    fn set_phase(&self, core: &mut Core, to: GamePhase) {
        let from = core.state.phase;
        if from == to {
            return;
        }
        core.state.phase = to;
        info!(%from, %to, "phase transition");
        self.emit(MachineEvent::PhaseChanged { from, to });
        self.publish(core);
    }

    /// Runs `f` on the shared state if `ticket` is still the current
    /// chain of its kind.
    fn apply<R>(&self, ticket: &ChainTicket, f: impl FnOnce(&mut Core) -> R) -> Option<R> {
        let mut core = self.lock();
        if !core.chains.is_current(ticket) {
            trace!(
                kind = %ticket.kind(),
                generation = ticket.generation(),
                "stale continuation suppressed"
            );
            return None;
        }
        Some(f(&mut core))
    }

    /// Supersedes the chain of `kind` and spawns `body` in its place.
    fn bind_chain<F, Fut>(self: &Arc<Self>, core: &mut Core, kind: ChainKind, body: F)
    where
        F: FnOnce(Arc<Self>, ChainTicket) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (ticket, superseded) = core.chains.slot_mut(kind).supersede();
        if superseded {
            debug!(%kind, "superseding running chain");
            self.emit(MachineEvent::ChainSuperseded { kind });
        }
        let task = spawn_chain(ticket.clone(), body(Arc::clone(self), ticket.clone()));
        core.chains.slot_mut(kind).attach(&ticket, task);
    }

    fn start_timer(self: &Arc<Self>, core: &mut Core) {
        core.state.elapsed_seconds = 0;
        let weak = Arc::downgrade(self);
        core.timer.start(move |generation| {
            if let Some(inner) = weak.upgrade() {
                inner.on_tick(generation);
            }
        });
        info!("round timer started");
        self.emit(MachineEvent::TimerStarted);
    }

    fn stop_timer(&self, core: &mut Core) -> bool {
        if !core.timer.stop() {
            return false;
        }
        self.emit(MachineEvent::TimerStopped {
            elapsed_seconds: core.state.elapsed_seconds,
        });
        true
    }

    fn on_tick(&self, generation: u64) {
        let mut core = self.lock();
        if !core.timer.is_current(generation) {
            trace!(generation, "stale timer tick suppressed");
            return;
        }
        core.state.elapsed_seconds = core.state.elapsed_seconds.saturating_add(1);
        self.publish(&core);
    }

    // ========================================================================
    // Setup
    // ========================================================================

    fn begin_setup(self: &Arc<Self>, core: &mut Core) {
        if core.chains.slot_mut(ChainKind::Win).cancel() {
            self.emit(MachineEvent::ChainSuperseded {
                kind: ChainKind::Win,
            });
        }
        self.stop_timer(core);
        core.state.reset_round();
        self.set_phase(core, GamePhase::SettingUp);
        self.bind_chain(core, ChainKind::Setup, Self::run_setup);
    }

    async fn run_setup(self: Arc<Self>, ticket: ChainTicket) {
        let Some(slots) = self.apply(&ticket, |core| {
            let selection = core.selector.select_subset(self.pool.icons(), GRID_SIZE);
            core.board.assign(selection);
            self.emit(MachineEvent::SelectionDrawn {
                icons: core.board.grid().to_vec(),
            });
            let slots: Vec<usize> = (0..core.board.grid().len()).collect();
            self.presenter.render_grid_icons(&core.board.slots());
            slots
        }) else {
            return;
        };

        self.animate_grid(slots, AnimationKind::Enter).await;

        self.apply(&ticket, |core| {
            core.chains.slot_mut(ChainKind::Setup).finish(&ticket);
            self.set_phase(core, GamePhase::AwaitingStart);
        });
    }

    // ========================================================================
    // Round and reveal
    // ========================================================================

    fn request_new_game(self: &Arc<Self>) -> bool {
        let mut guard = self.lock();
        let core = &mut *guard;
        let phase = core.state.phase;
        if !phase.accepts_new_game() || core.board.is_empty() {
            debug!(%phase, "new game request ignored");
            return false;
        }

        if core.chains.slot_mut(ChainKind::Reveal).cancel() {
            debug!("cancelling reveal of the previous round");
            self.emit(MachineEvent::ChainSuperseded {
                kind: ChainKind::Reveal,
            });
        }
        self.stop_timer(core);
        core.state.reset_round();
        core.state.elapsed_seconds = 0;
        for slot in core.board.enable_all() {
            self.presenter.set_button_interactable(slot, true);
        }

        self.set_phase(core, GamePhase::Revealing);
        self.bind_chain(core, ChainKind::Round, Self::run_round);
        self.publish(core);
        true
    }

    #[allow(clippy::unused_async)]
    async fn run_round(self: Arc<Self>, ticket: ChainTicket) {
        self.apply(&ticket, |core| {
            let sequence = core.selector.shuffle(core.board.grid());
            debug!(length = sequence.len(), "round sequence drawn");
            self.emit(MachineEvent::SequenceDrawn {
                length: sequence.len(),
            });
            core.board.set_sequence(sequence);
            core.chains.slot_mut(ChainKind::Round).finish(&ticket);
            self.bind_chain(core, ChainKind::Reveal, Self::run_reveal);
        });
    }

    async fn run_reveal(self: Arc<Self>, ticket: ChainTicket) {
        let timings = self.timings;

        self.transition_title(&self.titles.reveal, Some(AnimationKind::Raise))
            .await;
        self.presenter
            .animate(
                AnimationTarget::RevealSurface,
                AnimationKind::Show,
                timings.animation,
            )
            .await;

        let Some(sequence) = self.apply(&ticket, |core| core.board.sequence().to_vec()) else {
            return;
        };
        for icon in sequence {
            let target = AnimationTarget::RevealIcon(icon);
            self.presenter
                .animate(target.clone(), AnimationKind::Show, timings.animation)
                .await;
            tokio::time::sleep(timings.hold).await;
            self.presenter
                .animate(target, AnimationKind::Hide, timings.animation)
                .await;
        }

        self.presenter
            .animate(
                AnimationTarget::RevealSurface,
                AnimationKind::Hide,
                timings.animation,
            )
            .await;
        self.transition_title(&self.titles.input, Some(AnimationKind::Lower))
            .await;

        self.apply(&ticket, |core| {
            core.chains.slot_mut(ChainKind::Reveal).finish(&ticket);
            self.start_timer(core);
            self.set_phase(core, GamePhase::AwaitingInput);
        });
    }

    // ========================================================================
    // Input and win
    // ========================================================================

    fn handle_tap(self: &Arc<Self>, icon: &Icon) -> TapOutcome {
        let mut guard = self.lock();
        let core = &mut *guard;
        let round_active = core.timer.is_running();
        let outcome =
            InputValidator::new(&mut core.board, &mut core.state).handle_tap(icon, round_active);

        match outcome {
            TapOutcome::Ignored => return outcome,
            TapOutcome::Correct { slot } => {
                self.presenter.set_button_interactable(slot, false);
                self.emit(MachineEvent::CorrectTap {
                    slot,
                    expected_index: core.state.expected_index,
                });
            }
            TapOutcome::Wrong { slot } => {
                debug!(slot, %icon, "wrong tap");
                self.emit(MachineEvent::WrongTap { slot });
                self.play_wrong_cue(slot);
            }
            TapOutcome::Repeat { slot } => {
                self.emit(MachineEvent::RepeatTap { slot });
            }
            TapOutcome::Won { slot } => {
                self.presenter.set_button_interactable(slot, false);
                self.emit(MachineEvent::CorrectTap {
                    slot,
                    expected_index: core.state.expected_index,
                });
                self.publish(core);
                self.end_round(core);
                return outcome;
            }
        }
        self.publish(core);
        outcome
    }

    fn play_wrong_cue(&self, slot: usize) {
        let presenter = Arc::clone(&self.presenter);
        let duration = self.timings.fade.saturating_mul(2);
        tokio::spawn(async move {
            presenter
                .animate(
                    AnimationTarget::GridSlot(slot),
                    AnimationKind::WrongFlash,
                    duration,
                )
                .await;
        });
    }

    fn end_round(self: &Arc<Self>, core: &mut Core) {
        self.stop_timer(core);
        let attempts = core.state.attempt_count;
        let elapsed_seconds = core.state.elapsed_seconds;
        info!(attempts, elapsed_seconds, "round won");
        self.emit(MachineEvent::RoundWon {
            attempts,
            elapsed_seconds,
        });
        self.set_phase(core, GamePhase::Won);
        self.bind_chain(core, ChainKind::Win, Self::run_win);
    }

    async fn run_win(self: Arc<Self>, ticket: ChainTicket) {
        let timings = self.timings;

        let Some(slots) = self.apply(&ticket, |core| {
            for slot in core.board.enable_all() {
                self.presenter.set_button_interactable(slot, true);
            }
            (0..core.board.grid().len()).collect::<Vec<_>>()
        }) else {
            return;
        };

        let title = self.transition_title(&self.titles.win, None);
        let acknowledge = async {
            join_all(slots.iter().map(|slot| {
                self.presenter.animate(
                    AnimationTarget::GridSlot(*slot),
                    AnimationKind::Pulse,
                    timings.animation,
                )
            }))
            .await;
            tokio::time::sleep(timings.hold).await;
        };
        tokio::join!(title, acknowledge);

        let Some(exit_order) = self.apply(&ticket, |core| core.board.slots_in_sequence_order())
        else {
            return;
        };
        self.animate_grid(exit_order, AnimationKind::Exit).await;

        self.apply(&ticket, |core| {
            core.chains.slot_mut(ChainKind::Win).finish(&ticket);
            self.begin_setup(core);
        });
    }

    // ========================================================================
    // Animation helpers
    // ========================================================================

    /// Fades the title out, swaps its text and fades it back in, moving
    /// it concurrently when `movement` is given.
    async fn transition_title(&self, text: &str, movement: Option<AnimationKind>) {
        let timings = self.timings;
        let fade = async {
            self.presenter
                .animate(AnimationTarget::Title, AnimationKind::FadeOut, timings.fade)
                .await;
            self.presenter.set_title_text(text);
            self.presenter
                .animate(AnimationTarget::Title, AnimationKind::FadeIn, timings.fade)
                .await;
        };
        let shift = async {
            if let Some(kind) = movement {
                self.presenter
                    .animate(AnimationTarget::Title, kind, timings.animation)
                    .await;
            }
        };
        tokio::join!(fade, shift);
    }

    /// Animates grid slots in the given order, each one `stagger` after
    /// the previous, and waits for all of them.
    async fn animate_grid(&self, slots: Vec<usize>, kind: AnimationKind) {
        let timings = self.timings;
        let animations = slots.into_iter().enumerate().map(|(i, slot)| {
            let delay = timings
                .stagger
                .saturating_mul(u32::try_from(i).unwrap_or(u32::MAX));
            async move {
                tokio::time::sleep(delay).await;
                self.presenter
                    .animate(AnimationTarget::GridSlot(slot), kind, timings.animation)
                    .await;
            }
        });
        join_all(animations).await;
    }
}
