//! Utilities shared between Dojo binaries and libraries.

pub mod logger;
pub mod time;
