// Route exports
pub mod metrics;
pub mod mock;

pub use mock::MockState;
