use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::services::ApiError;

/// Candidate profile as served by `GET /candidates`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub age: u32,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Swipe decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Like,
    Pass,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Like => "like",
            Action::Pass => "pass",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("action must be like or pass, got {0:?}")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Action::Like),
            "pass" => Ok(Action::Pass),
            other => Err(ParseActionError(other.to_string())),
        }
    }
}

/// Unit of work carried through the dispatch queue
#[derive(Debug, Clone)]
pub struct Job {
    pub candidate: Candidate,
}

impl Job {
    pub fn new(candidate: Candidate) -> Self {
        Self { candidate }
    }
}

/// Result of submitting one decision
///
/// A failed submission carries the error and never reports a match.
#[derive(Debug)]
pub struct SwipeOutcome {
    pub candidate_id: String,
    pub action: Action,
    pub matched: bool,
    pub message: Option<String>,
    pub error: Option<ApiError>,
    pub processed_at: chrono::DateTime<chrono::Utc>,
}

impl SwipeOutcome {
    pub fn success(candidate_id: String, action: Action, matched: bool, message: String) -> Self {
        Self {
            candidate_id,
            action,
            matched,
            message: Some(message),
            error: None,
            processed_at: chrono::Utc::now(),
        }
    }

    pub fn failure(candidate_id: String, action: Action, error: ApiError) -> Self {
        Self {
            candidate_id,
            action,
            matched: false,
            message: None,
            error: Some(error),
            processed_at: chrono::Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
