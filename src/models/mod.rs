// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Action, Candidate, Job, ParseActionError, SwipeOutcome};
pub use requests::SwipeRequest;
pub use responses::{CandidatesResponse, SwipeResponse};
