// Core pipeline exports
pub mod decide;
pub mod poller;
pub mod pool;
pub mod rate_limit;
pub mod retry;
pub mod shutdown;

pub use decide::{decide, Decider, RuleDecider};
pub use poller::{log_results, Poller};
pub use pool::{DispatchPool, EnqueueReport, PoolError, PoolState, ResultStream};
pub use rate_limit::RateLimiter;
pub use retry::RetryPolicy;
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
