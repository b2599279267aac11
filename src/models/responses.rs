use serde::{Deserialize, Serialize};
use crate::models::domain::Candidate;

/// Response for `GET /candidates`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidatesResponse {
    #[serde(default)]
    pub results: Option<Vec<Candidate>>,
}

impl CandidatesResponse {
    /// The candidates, with a missing or `null` list read as empty.
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.results.unwrap_or_default()
    }
}

/// Response for `POST /swipe`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeResponse {
    pub matched: bool,
    #[serde(default)]
    pub message: String,
}
