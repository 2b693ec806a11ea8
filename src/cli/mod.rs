//! Command-line interface
//!
//! Argument parsing, command handlers and the terminal presenter.

pub mod args;
pub mod commands;
pub mod terminal;
