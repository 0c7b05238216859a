//! HTTP access to the OpenCritic API

use crate::error::{FantasyCriticError, Result};
use crate::opencritic::types::{OpenCriticGame, RawGame};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};

/// Optional API key sent as `X-RapidAPI-Key` when set.
pub const API_KEY_ENV_VAR: &str = "OPENCRITIC_API_KEY";

const API_KEY_HEADER: &str = "x-rapidapi-key";

/// Default request headers, with the API key from `OPENCRITIC_API_KEY` if present.
pub fn default_header_map() -> Result<HeaderMap> {
    let mut h = HeaderMap::new();
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
        if !key.trim().is_empty() {
            let value = HeaderValue::from_str(key.trim()).map_err(|e| FantasyCriticError::Config {
                message: format!("{} is not a valid header value: {}", API_KEY_ENV_VAR, e),
            })?;
            h.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }
    }
    Ok(h)
}

#[derive(Debug, Clone)]
pub struct OpenCriticClient {
    client: Client,
    base_url: String,
}

impl OpenCriticClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().default_headers(default_header_map()?).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn game_url(&self, id: u32) -> String {
        format!("{}/game/{}", self.base_url, id)
    }

    /// Fetch one game. Unknown ids come back as `None`.
    pub async fn get_game(&self, id: u32) -> Result<Option<OpenCriticGame>> {
        let url = self.game_url(id);
        tracing::debug!(%url, "Fetching OpenCritic game");

        let response = self.client.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!(open_critic_id = id, "OpenCritic game not found");
            return Ok(None);
        }
        let raw = response.error_for_status()?.json::<RawGame>().await?;
        Ok(Some(raw.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_url_strips_trailing_slash() {
        let client = OpenCriticClient::new("https://api.opencritic.com/api/").unwrap();
        assert_eq!(
            client.game_url(42),
            "https://api.opencritic.com/api/game/42"
        );
    }

    #[test]
    fn test_default_header_map() {
        std::env::set_var(API_KEY_ENV_VAR, "test_key");
        let headers = default_header_map().unwrap();
        assert!(headers.contains_key(ACCEPT));
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "test_key");

        std::env::remove_var(API_KEY_ENV_VAR);
        let headers = default_header_map().unwrap();
        assert!(headers.contains_key(ACCEPT));
        assert!(!headers.contains_key(API_KEY_HEADER));
    }
}
