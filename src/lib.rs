//! Swipebot - rate-limited swipe automation for the candidate service
//!
//! Candidates are fetched on a timer, run through a decision rule and
//! submitted back by a bounded pool of workers sharing one rate limiter.

pub mod config;
pub mod core;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{decide, DispatchPool, Poller, ShutdownSignal, ShutdownTrigger};
pub use models::{Action, Candidate, SwipeOutcome};
pub use services::{ApiClient, ApiError};
