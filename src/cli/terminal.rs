//! Line-oriented presenter for the interactive `play` command.
//!
//! Every visual effect becomes a line of text; animations only keep their
//! duration so the pacing of a round is unchanged.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::icon::Icon;
use crate::phase::{GamePhase, GameState};
use crate::presenter::{AnimationKind, AnimationTarget, Presenter};

struct Screen {
    out: Box<dyn Write + Send>,
    last_attempts: Option<u32>,
}

/// Presenter that prints the game to a text stream.
pub struct TerminalPresenter {
    screen: Mutex<Screen>,
}

impl std::fmt::Debug for TerminalPresenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPresenter").finish_non_exhaustive()
    }
}

impl TerminalPresenter {
    /// Creates a presenter writing to `out`.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            screen: Mutex::new(Screen {
                out,
                last_attempts: None,
            }),
        }
    }

    /// Creates a presenter writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn line(&self, text: &str) {
        let mut screen = self.screen();
        let _ = writeln!(screen.out, "{text}");
        let _ = screen.out.flush();
    }
}

#[async_trait]
impl Presenter for TerminalPresenter {
    fn render_grid_icons(&self, slots: &[(usize, Icon)]) {
        let cells: Vec<String> = slots
            .iter()
            .map(|(slot, icon)| format!("[{}] {icon}", slot + 1))
            .collect();
        self.line(&format!("\n  {}", cells.join("  ")));
    }

    async fn animate(&self, target: AnimationTarget, kind: AnimationKind, duration: Duration) {
        match (&target, kind) {
            (AnimationTarget::RevealSurface, AnimationKind::Show) => self.line("  watch:"),
            (AnimationTarget::RevealIcon(icon), AnimationKind::Show) => {
                self.line(&format!("    > {icon}"));
            }
            (AnimationTarget::GridSlot(slot), AnimationKind::WrongFlash) => {
                self.line(&format!("  x [{}] wrong", slot + 1));
            }
            _ => {}
        }
        tokio::time::sleep(duration).await;
    }

    fn set_title_text(&self, text: &str) {
        let title = text.lines().collect::<Vec<_>>().join(" ");
        self.line(&format!("\n== {title} =="));
    }

    fn set_button_interactable(&self, slot: usize, interactable: bool) {
        if !interactable {
            self.line(&format!("  ok [{}]", slot + 1));
        }
    }

    fn state_changed(&self, state: &GameState) {
        let mut screen = self.screen();
        match state.phase {
            GamePhase::AwaitingInput if screen.last_attempts != Some(state.attempt_count) => {
                screen.last_attempts = Some(state.attempt_count);
                let _ = writeln!(
                    screen.out,
                    "  attempts: {}  time: {}s",
                    state.attempt_count, state.elapsed_seconds
                );
            }
            GamePhase::Won => {
                screen.last_attempts = None;
                let _ = writeln!(
                    screen.out,
                    "  solved in {} attempts, {}s",
                    state.attempt_count, state.elapsed_seconds
                );
            }
            _ => return,
        }
        let _ = screen.out.flush();
    }
}
