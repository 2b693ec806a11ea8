//! Game state representation
//!
//! Plain values owned by the phase machine: the current phase, the
//! round counters, the icons on the grid and the round sequence. Display
//! updates happen through the presenter's `state_changed` hook, never
//! from here.

use serde::Serialize;

use crate::icon::Icon;

use super::chain::ChainKind;

/// Named states of the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Constructed, `start()` not yet called.
    #[default]
    Idle,
    /// Drawing the selection and animating the grid in.
    SettingUp,
    /// Grid is ready; waiting for a new-game request.
    AwaitingStart,
    /// Showing the round sequence.
    Revealing,
    /// Timer running; taps are being matched.
    AwaitingInput,
    /// Round completed; win sequence in progress.
    Won,
}

impl GamePhase {
    /// Returns the phase name used in logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SettingUp => "setting_up",
            Self::AwaitingStart => "awaiting_start",
            Self::Revealing => "revealing",
            Self::AwaitingInput => "awaiting_input",
            Self::Won => "won",
        }
    }

    /// Whether a new-game request starts a round from this phase.
    ///
    /// A running round may be restarted; setup and the win sequence
    /// must finish first.
    #[must_use]
    pub const fn accepts_new_game(self) -> bool {
        matches!(
            self,
            Self::AwaitingStart | Self::Revealing | Self::AwaitingInput
        )
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the values a presenter displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GameState {
    /// Current phase.
    pub phase: GamePhase,
    /// Index into the round sequence of the next icon to tap.
    pub expected_index: usize,
    /// Taps counted this round, right or wrong.
    pub attempt_count: u32,
    /// Timer ticks since the timer was last started.
    pub elapsed_seconds: u64,
}

impl GameState {
    /// Clears the per-round counters.
    pub const fn reset_round(&mut self) {
        self.expected_index = 0;
        self.attempt_count = 0;
    }
}

/// Icons on the grid, their button states and the current round
/// sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    grid: Vec<Icon>,
    interactable: Vec<bool>,
    sequence: Vec<Icon>,
}

impl Board {
    /// Creates an empty board.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            grid: Vec::new(),
            interactable: Vec::new(),
            sequence: Vec::new(),
        }
    }

    /// Places a fresh selection on the grid, slot `i` holding
    /// `selection[i]`. All buttons become interactable and the previous
    /// round sequence is dropped.
    pub fn assign(&mut self, selection: Vec<Icon>) {
        self.interactable = vec![true; selection.len()];
        self.grid = selection;
        self.sequence.clear();
    }

    /// Returns `true` until a selection has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Icons in slot order.
    #[must_use]
    pub fn grid(&self) -> &[Icon] {
        &self.grid
    }

    /// `(slot, icon)` pairs in slot order.
    #[must_use]
    pub fn slots(&self) -> Vec<(usize, Icon)> {
        self.grid.iter().cloned().enumerate().collect()
    }

    /// Returns the slot holding `icon`.
    #[must_use]
    pub fn slot_of(&self, icon: &Icon) -> Option<usize> {
        self.grid.iter().position(|i| i == icon)
    }

    /// Whether the button on `slot` accepts taps.
    #[must_use]
    pub fn is_interactable(&self, slot: usize) -> bool {
        self.interactable.get(slot).copied().unwrap_or(false)
    }

    /// Disables the button on `slot`.
    pub fn disable(&mut self, slot: usize) {
        if let Some(flag) = self.interactable.get_mut(slot) {
            *flag = false;
        }
    }

    /// Enables every button and returns the slots that were disabled.
    pub fn enable_all(&mut self) -> Vec<usize> {
        let mut changed = Vec::new();
        for (slot, flag) in self.interactable.iter_mut().enumerate() {
            if !*flag {
                *flag = true;
                changed.push(slot);
            }
        }
        changed
    }

    /// Installs the round sequence.
    pub fn set_sequence(&mut self, sequence: Vec<Icon>) {
        self.sequence = sequence;
    }

    /// The round sequence, empty before the first round.
    #[must_use]
    pub fn sequence(&self) -> &[Icon] {
        &self.sequence
    }

    /// Slots ordered by the round sequence, or by slot index when no
    /// round has been drawn.
    #[must_use]
    pub fn slots_in_sequence_order(&self) -> Vec<usize> {
        if self.sequence.is_empty() {
            return (0..self.grid.len()).collect();
        }
        self.sequence
            .iter()
            .filter_map(|icon| self.slot_of(icon))
            .collect()
    }
}

/// User-initiated actions, delivered FIFO to the machine's run loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// The "new game" button was pressed.
    NewGame,
    /// A grid button showing this icon was tapped.
    Tap(Icon),
}

/// Notable occurrences broadcast by the phase machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum MachineEvent {
    /// The machine moved between phases.
    PhaseChanged {
        /// Phase left.
        from: GamePhase,
        /// Phase entered.
        to: GamePhase,
    },
    /// A new selection was placed on the grid.
    SelectionDrawn {
        /// Icons in slot order.
        icons: Vec<Icon>,
    },
    /// A new round sequence was drawn.
    SequenceDrawn {
        /// Number of icons in the sequence.
        length: usize,
    },
    /// The round timer started; taps are now matched.
    TimerStarted,
    /// The round timer stopped.
    TimerStopped {
        /// Ticks counted before stopping.
        elapsed_seconds: u64,
    },
    /// A tap matched the expected icon.
    CorrectTap {
        /// Slot that was tapped.
        slot: usize,
        /// Cursor after advancing.
        expected_index: usize,
    },
    /// A tap did not match; the slot shows a wrong-tap cue.
    WrongTap {
        /// Slot that was tapped.
        slot: usize,
    },
    /// A slot already matched this round was tapped again.
    RepeatTap {
        /// Slot that was tapped.
        slot: usize,
    },
    /// The whole sequence was reproduced.
    RoundWon {
        /// Taps used this round.
        attempts: u32,
        /// Timer ticks at the winning tap.
        elapsed_seconds: u64,
    },
    /// A running chain was replaced by a newer one of the same kind.
    ChainSuperseded {
        /// Kind of the replaced chain.
        kind: ChainKind,
    },
}
