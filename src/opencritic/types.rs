//! OpenCritic response types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A game as OpenCritic reports it, reduced to what master games track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenCriticGame {
    pub id: u32,
    pub name: String,
    pub score: Option<f64>,
    pub release_date: Option<NaiveDate>,
    pub has_any_reviews: bool,
}

/// Raw `/game/{id}` payload. OpenCritic reports a top critic score of -1 until a game
/// has enough reviews.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawGame {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub top_critic_score: Option<f64>,
    #[serde(default)]
    pub num_reviews: Option<i64>,
    #[serde(default)]
    pub first_release_date: Option<String>,
}

impl From<RawGame> for OpenCriticGame {
    fn from(raw: RawGame) -> Self {
        let score = raw.top_critic_score.filter(|s| *s >= 0.0);
        // Dates arrive as full ISO timestamps; the day is all that matters.
        let release_date = raw
            .first_release_date
            .as_deref()
            .and_then(|d| d.get(..10))
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
        OpenCriticGame {
            id: raw.id,
            name: raw.name,
            score,
            release_date,
            has_any_reviews: raw.num_reviews.unwrap_or(0) > 0,
        }
    }
}
