//! Rendering collaborator contract.
//!
//! The phase machine never draws anything itself. It tells a
//! [`Presenter`] which icons sit on which slots, what the title says,
//! which buttons accept taps, and asks it to animate targets. Only the
//! completion of an animation matters to the machine, not how it looks.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::icon::Icon;
use crate::phase::state::GameState;

/// What an animation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "target", content = "value", rename_all = "snake_case")]
pub enum AnimationTarget {
    /// One button of the icon grid.
    GridSlot(usize),
    /// The title text.
    Title,
    /// The window in which the sequence is revealed.
    RevealSurface,
    /// An icon displayed on the reveal surface.
    RevealIcon(Icon),
}

/// The kind of animation requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    /// Grid slot scales and fades in.
    Enter,
    /// Grid slot scales and fades out.
    Exit,
    /// Reveal surface or reveal icon appears.
    Show,
    /// Reveal surface or reveal icon disappears.
    Hide,
    /// Title fades out before its text changes.
    FadeOut,
    /// Title fades back in after its text changed.
    FadeIn,
    /// Title moves up for the reveal.
    Raise,
    /// Title moves down for input.
    Lower,
    /// Short acknowledgement bump on a grid slot.
    Pulse,
    /// Transient cue on a wrongly tapped slot.
    WrongFlash,
}

/// Rendering and animation capabilities consumed by the phase machine.
///
/// The synchronous methods are invoked while the machine holds its state
/// lock; implementations must return promptly and must not call back
/// into the machine.
#[async_trait]
pub trait Presenter: Send + Sync {
    /// Assigns icons to grid slots.
    fn render_grid_icons(&self, slots: &[(usize, Icon)]);

    /// Plays an animation and resolves when it has finished.
    async fn animate(&self, target: AnimationTarget, kind: AnimationKind, duration: Duration);

    /// Replaces the title text.
    fn set_title_text(&self, text: &str);

    /// Enables or disables the button on a grid slot.
    fn set_button_interactable(&self, slot: usize, interactable: bool);

    /// Observes every change of the game state (phase, counters, clock).
    fn state_changed(&self, _state: &GameState) {}
}

/// Presenter that renders nothing and finishes animations after their
/// nominal duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

#[async_trait]
impl Presenter for NullPresenter {
    fn render_grid_icons(&self, _slots: &[(usize, Icon)]) {}

    async fn animate(&self, _target: AnimationTarget, _kind: AnimationKind, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn set_title_text(&self, _text: &str) {}

    fn set_button_interactable(&self, _slot: usize, _interactable: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_serialize_with_tag() {
        let json = serde_json::to_value(AnimationTarget::GridSlot(3)).unwrap();
        assert_eq!(json["target"], "grid_slot");
        assert_eq!(json["value"], 3);

        let json = serde_json::to_value(AnimationTarget::RevealIcon(Icon::new("star"))).unwrap();
        assert_eq!(json["target"], "reveal_icon");
        assert_eq!(json["value"], "star");
    }

    #[tokio::test(start_paused = true)]
    async fn null_presenter_waits_for_duration() {
        let start = tokio::time::Instant::now();
        NullPresenter
            .animate(
                AnimationTarget::Title,
                AnimationKind::FadeOut,
                Duration::from_millis(250),
            )
            .await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
