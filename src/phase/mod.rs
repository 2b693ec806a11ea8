//! Phase machine
//!
//! Round lifecycle of the memory game: grid setup, sequence reveal, tap
//! input and the win acknowledgement.
//!
//! # Architecture
//!
//! - [`GamePhaseMachine`]: orchestrator (user actions, chains, timer)
//! - [`chain`]: cancellable multi-step phase tasks with stale-continuation guards
//! - [`RoundTimer`]: periodic elapsed-seconds counter for one round
//! - [`InputValidator`]: tap matching against the round sequence
//! - [`state`]: phase enum, counters, board and events

pub mod chain;
pub mod input;
pub mod machine;
pub mod state;
pub mod timer;

pub use chain::{ChainKind, ChainTicket};
pub use input::{InputValidator, TapOutcome};
pub use machine::GamePhaseMachine;
pub use state::{Board, GamePhase, GameState, MachineEvent, UserAction};
pub use timer::RoundTimer;
