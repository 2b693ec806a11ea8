//! Tap matching during the input phase.

use tracing::trace;

use crate::icon::Icon;

use super::state::{Board, GameState};

/// Result of feeding one tap to the [`InputValidator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Dropped: no round active, or the icon is not on the grid.
    Ignored,
    /// Matched the expected icon; the slot is now disabled.
    Correct {
        /// Slot that was tapped.
        slot: usize,
    },
    /// Did not match; the slot should show a wrong-tap cue.
    Wrong {
        /// Slot that was tapped.
        slot: usize,
    },
    /// The slot was already matched this round.
    Repeat {
        /// Slot that was tapped.
        slot: usize,
    },
    /// Matched the last icon of the sequence.
    Won {
        /// Slot that was tapped.
        slot: usize,
    },
}

/// Matches taps against the round sequence.
///
/// A view over state owned by the phase machine: it reads the sequence,
/// advances the cursor, counts attempts and disables matched buttons.
#[derive(Debug)]
pub struct InputValidator<'a> {
    board: &'a mut Board,
    state: &'a mut GameState,
}

impl<'a> InputValidator<'a> {
    /// Creates a validator over the machine's board and state.
    pub const fn new(board: &'a mut Board, state: &'a mut GameState) -> Self {
        Self { board, state }
    }

    /// Handles one tap.
    ///
    /// `round_active` is whether the round timer is running; without it
    /// the tap is ignored entirely. Every other tap on a grid icon counts
    /// as an attempt, including the winning one.
    pub fn handle_tap(&mut self, icon: &Icon, round_active: bool) -> TapOutcome {
        if !round_active {
            trace!(%icon, "tap outside input phase ignored");
            return TapOutcome::Ignored;
        }
        let Some(slot) = self.board.slot_of(icon) else {
            trace!(%icon, "tap on icon not on the grid ignored");
            return TapOutcome::Ignored;
        };

        let expected = self.board.sequence().get(self.state.expected_index);
        let outcome = if !self.board.is_interactable(slot) {
            TapOutcome::Repeat { slot }
        } else if expected == Some(icon) {
            self.board.disable(slot);
            self.state.expected_index += 1;
            if self.state.expected_index == self.board.sequence().len() {
                TapOutcome::Won { slot }
            } else {
                TapOutcome::Correct { slot }
            }
        } else {
            TapOutcome::Wrong { slot }
        };

        self.state.attempt_count = self.state.attempt_count.saturating_add(1);
        outcome
    }
}
