//! Dojo game server library.
//!
//! Connected players watch a recurring cycle of timed challenges and breaks.
//! During a challenge they submit code, which runs in a sandbox and is scored
//! against the challenge's expected output.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
