use serde::{Deserialize, Serialize};
use validator::Validate;

/// Body of `POST /swipe`
///
/// `action` stays a plain string on the wire so the fixture can reject
/// unknown values with its own 400 message.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[validate(length(min = 1))]
    pub candidate_id: String,
    pub action: String,
}

impl SwipeRequest {
    pub fn new(candidate_id: impl Into<String>, action: crate::models::Action) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            action: action.as_str().to_string(),
        }
    }
}
