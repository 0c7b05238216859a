//! OpenCritic API client
//!
//! - `http`: async fetch of a single game by OpenCritic id
//! - `types`: response payloads and their conversion into `OpenCriticGame`

pub mod http;
pub mod types;

pub use http::{OpenCriticClient, API_KEY_ENV_VAR};
pub use types::OpenCriticGame;
