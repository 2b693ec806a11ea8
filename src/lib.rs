//! `memoseq` - icon sequence memory game
//!
//! A six-slot grid of icons is drawn from a pool, the icons are revealed
//! one by one in a shuffled order, and the player taps them back in that
//! order while attempts and elapsed seconds are counted. Rendering is
//! delegated to a [`presenter::Presenter`].

pub mod cli;
pub mod config;
pub mod error;
pub mod icon;
pub mod observability;
pub mod phase;
pub mod presenter;
pub mod selector;
