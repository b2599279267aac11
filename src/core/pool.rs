use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::PoolSettings;
use crate::core::decide::Decider;
use crate::core::shutdown::{ShutdownSignal, ShutdownTrigger};
use crate::models::{Candidate, Job, SwipeOutcome};
use crate::services::{MetricsSink, SwipeApi};

/// Lifecycle of a [`DispatchPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Created => "created",
            PoolState::Running => "running",
            PoolState::Stopping => "stopping",
            PoolState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool is {actual}, expected {expected}")]
    InvalidState {
        expected: PoolState,
        actual: PoolState,
    },
}

/// What happened to one `enqueue_many` batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    pub accepted: usize,
    /// Candidates shed because the queue was full or closed.
    pub dropped: Vec<String>,
}

/// Stream of outcomes, closed once every worker has exited.
pub type ResultStream = mpsc::Receiver<SwipeOutcome>;

/// Everything a worker needs, shared across all workers.
struct WorkerContext {
    api: Arc<dyn SwipeApi>,
    decider: Arc<dyn Decider>,
    metrics: Arc<dyn MetricsSink>,
    jobs: tokio::sync::Mutex<mpsc::Receiver<Job>>,
    results: mpsc::Sender<SwipeOutcome>,
    swipe_delay: Duration,
}

/// Fixed-size worker pool turning candidates into swipe outcomes
///
/// Backpressure is asymmetric: admission never blocks and sheds candidates
/// when the job queue is full, while workers block on a full result stream
/// until the consumer drains it.
///
/// # Lifecycle
/// `Created --start--> Running --stop--> Stopping --> Stopped`
pub struct DispatchPool {
    settings: PoolSettings,
    state: PoolState,
    jobs_tx: Option<mpsc::Sender<Job>>,
    results_rx: Option<ResultStream>,
    context: Option<Arc<WorkerContext>>,
    trigger: Option<ShutdownTrigger>,
    workers: Vec<JoinHandle<()>>,
}

impl DispatchPool {
    pub fn new(
        api: Arc<dyn SwipeApi>,
        decider: Arc<dyn Decider>,
        metrics: Arc<dyn MetricsSink>,
        settings: PoolSettings,
    ) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel(settings.queue_capacity.max(1));
        let (results_tx, results_rx) = mpsc::channel(settings.result_capacity.max(1));

        let context = WorkerContext {
            api,
            decider,
            metrics,
            jobs: tokio::sync::Mutex::new(jobs_rx),
            results: results_tx,
            swipe_delay: settings.swipe_delay(),
        };

        Self {
            settings,
            state: PoolState::Created,
            jobs_tx: Some(jobs_tx),
            results_rx: Some(results_rx),
            context: Some(Arc::new(context)),
            trigger: None,
            workers: Vec::new(),
        }
    }

    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Hand out the result stream. Only the first call returns it.
    pub fn results(&mut self) -> Option<ResultStream> {
        self.results_rx.take()
    }

    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn start(&mut self, shutdown: ShutdownSignal) -> Result<(), PoolError> {
        if self.state != PoolState::Created {
            return Err(PoolError::InvalidState {
                expected: PoolState::Created,
                actual: self.state,
            });
        }

        // Workers hold the only references to the context, so the result
        // sender is dropped (and the stream closed) when the last one exits.
        let context = match self.context.take() {
            Some(context) => context,
            None => {
                return Err(PoolError::InvalidState {
                    expected: PoolState::Created,
                    actual: self.state,
                })
            }
        };

        let (trigger, signal) = shutdown.child();
        self.workers = (0..self.settings.workers.max(1))
            .map(|worker_id| {
                let context = Arc::clone(&context);
                let signal = signal.clone();
                tokio::spawn(async move { worker_loop(worker_id, context, signal).await })
            })
            .collect();
        self.trigger = Some(trigger);
        self.state = PoolState::Running;

        tracing::info!(workers = self.workers.len(), "Dispatch pool started");
        Ok(())
    }

    /// Offer each candidate to the job queue without blocking.
    ///
    /// Candidates that do not fit are dropped and never produce an outcome.
    pub fn enqueue_many(&self, candidates: Vec<Candidate>) -> EnqueueReport {
        let mut report = EnqueueReport::default();
        let Some(jobs_tx) = self.jobs_tx.as_ref() else {
            tracing::warn!(count = candidates.len(), "Pool stopped, rejecting candidates");
            report.dropped = candidates.into_iter().map(|c| c.id).collect();
            return report;
        };

        for candidate in candidates {
            match jobs_tx.try_send(Job::new(candidate)) {
                Ok(()) => report.accepted += 1,
                Err(TrySendError::Full(job)) => {
                    tracing::warn!(candidate_id = %job.candidate.id, "Job queue full, dropping candidate");
                    report.dropped.push(job.candidate.id);
                }
                Err(TrySendError::Closed(job)) => {
                    tracing::warn!(candidate_id = %job.candidate.id, "Job queue closed, dropping candidate");
                    report.dropped.push(job.candidate.id);
                }
            }
        }

        report
    }

    /// Cancel the workers, close admission, wait for every worker to exit.
    ///
    /// The result stream is closed when this returns. A second call fails
    /// with [`PoolError::InvalidState`].
    pub async fn stop(&mut self) -> Result<(), PoolError> {
        if matches!(self.state, PoolState::Stopping | PoolState::Stopped) {
            return Err(PoolError::InvalidState {
                expected: PoolState::Running,
                actual: self.state,
            });
        }
        self.state = PoolState::Stopping;

        if let Some(trigger) = &self.trigger {
            trigger.cancel();
        }
        self.jobs_tx = None;

        for (worker_id, handle) in self.workers.drain(..).enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(worker_id, error = %e, "Worker task failed");
            }
        }

        // Never started: drop the unused result sender so the stream closes.
        self.context = None;
        self.trigger = None;
        self.state = PoolState::Stopped;

        tracing::info!("Dispatch pool stopped");
        Ok(())
    }
}

async fn worker_loop(worker_id: usize, context: Arc<WorkerContext>, shutdown: ShutdownSignal) {
    loop {
        let job = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = async { context.jobs.lock().await.recv().await } => job,
        };
        let Some(job) = job else {
            break;
        };
        if shutdown.is_cancelled() {
            tracing::debug!(worker_id, candidate_id = %job.candidate.id, "Shutdown before processing, abandoning job");
            break;
        }

        let outcome = process(&context, job, &shutdown).await;

        let published = tokio::select! {
            biased;
            sent = context.results.send(outcome) => sent.is_ok(),
            _ = shutdown.cancelled() => false,
        };
        if !published || shutdown.is_cancelled() {
            break;
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(context.swipe_delay) => {}
        }
    }

    tracing::debug!(worker_id, "Worker exited");
}

async fn process(context: &WorkerContext, job: Job, shutdown: &ShutdownSignal) -> SwipeOutcome {
    let candidate = job.candidate;
    let action = context.decider.decide(&candidate);
    context.metrics.record_action(action);

    let started = Instant::now();
    let response = context
        .api
        .submit_swipe(&candidate.id, action, shutdown)
        .await;
    context.metrics.observe_latency(started.elapsed().as_secs_f64());

    match response {
        Ok(response) => {
            if response.matched {
                context.metrics.record_match();
            }
            SwipeOutcome::success(candidate.id, action, response.matched, response.message)
        }
        Err(e) => {
            context.metrics.record_error();
            SwipeOutcome::failure(candidate.id, action, e)
        }
    }
}
