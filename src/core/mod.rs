//! Core utilities shared across the application
//!
//! - `cache`: master game LRU cache with disk snapshots
//! - `clock`: UTC time source for services
//! - `config`: TOML configuration with environment overrides
//! - `logging`: tracing subscriber setup

pub mod cache;
pub mod clock;
pub mod config;
pub mod logging;

pub use cache::{try_read_to_string, write_string, MasterGameCache};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
