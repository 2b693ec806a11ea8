//! Configuration module
//!
//! Loading and validation of game configuration files: the icon pool,
//! animation pacing, timer period and title texts.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning};
pub use schema::{GameConfig, Timings, Titles};
pub use validation::{ValidationResult, Validator};
