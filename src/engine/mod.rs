//! Rules engine: pure functions over in-memory league state.
//!
//! Nothing in here reads the clock or touches storage; callers pass `today`/`now`
//! and persist what comes back.

pub mod claims;
pub mod draft;
pub mod eligibility;
pub mod processing;
pub mod trades;
