//! Type-safe wrappers for Fantasy Critic identifiers and seasons.

pub mod ids;
pub mod time;
