// crates/fleet-gate-core/src/runtime/pool.rs
// ============================================================================
// Module: Fleet Gate Review Pool
// Description: Fixed worker pool for batch review.
// Purpose: Fan batch requests over one shared engine with bounded queueing.
// Dependencies: crate::core, crate::runtime::engine, tokio-util, tracing
// ============================================================================

//! ## Overview
//! [`ReviewPool`] owns N named worker threads reading boxed review jobs from
//! one bounded inbox (capacity N). A batch spawns a producer that enqueues one
//! job per asset; the caller collects exactly one outcome per asset from a
//! result channel also sized to N. Peak queued work is therefore bounded by
//! the worker count, not the batch size.
//!
//! Violations of one asset are appended contiguously in evaluation order;
//! assets appear in completion order. Per-asset failures, including skipped
//! results, are collected into a [`BatchError`] and never abort the batch.
//! A runtime panic inside a review becomes [`ReviewError::EvaluatorFailure`]
//! for that asset and the worker keeps serving jobs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::SyncSender;
use std::thread;
use std::thread::JoinHandle;

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::errors::BatchError;
use crate::core::errors::BatchFailure;
use crate::core::errors::ReviewError;
use crate::core::violation::ReviewResult;
use crate::core::violation::Violation;
use crate::interfaces::PolicyRuntime;
use crate::runtime::engine::ReviewEngine;

// ============================================================================
// SECTION: Requests and Responses
// ============================================================================

/// Batch review request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRequest {
    /// Assets in JSON form.
    pub assets: Vec<Value>,
}

/// Batch review response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResponse {
    /// Violations, contiguous per asset.
    pub violations: Vec<Violation>,
    /// Aggregated per-asset failures.
    pub error: Option<BatchError>,
}

/// Pool construction errors.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Worker thread could not be spawned.
    #[error("failed to spawn review worker: {0}")]
    Spawn(String),
}

// ============================================================================
// SECTION: Worker Pool
// ============================================================================

/// Boxed review job.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Constraint named by failures not tied to a single constraint.
const UNKNOWN_CONSTRAINT: &str = "*";

/// Outcome of one asset review tagged with its request index.
type Outcome = (usize, String, Result<ReviewResult, ReviewError>);

/// Fixed-size review worker pool.
///
/// # Invariants
/// - Inbox capacity equals the worker count.
/// - Dropping or shutting down the pool closes the inbox and joins workers.
pub struct ReviewPool<R: PolicyRuntime + 'static> {
    /// Shared immutable engine.
    engine: Arc<ReviewEngine<R>>,
    /// Job inbox; `None` once closed.
    inbox: Option<SyncSender<Job>>,
    /// Worker handles.
    workers: Vec<JoinHandle<()>>,
    /// Worker count.
    worker_count: NonZeroUsize,
}

impl<R: PolicyRuntime + 'static> ReviewPool<R> {
    /// Starts a pool with one worker per logical core.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] when a worker thread cannot be started.
    pub fn with_default_workers(engine: Arc<ReviewEngine<R>>) -> Result<Self, PoolError> {
        Self::new(engine, default_worker_count())
    }

    /// Starts a pool with `worker_count` workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] when a worker thread cannot be started.
    pub fn new(engine: Arc<ReviewEngine<R>>, worker_count: NonZeroUsize) -> Result<Self, PoolError> {
        let (inbox, receiver) = mpsc::sync_channel::<Job>(worker_count.get());
        let receiver = Arc::new(Mutex::new(receiver));
        let mut pool = Self {
            engine,
            inbox: Some(inbox),
            workers: Vec::with_capacity(worker_count.get()),
            worker_count,
        };
        for index in 0 .. worker_count.get() {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("fleet-gate-review-{index}"))
                .spawn(move || worker_loop(index, &receiver))
                .map_err(|err| PoolError::Spawn(err.to_string()))?;
            pool.workers.push(handle);
        }
        Ok(pool)
    }

    /// Returns the worker count.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count.get()
    }

    /// Returns the shared engine.
    #[must_use]
    pub const fn engine(&self) -> &Arc<ReviewEngine<R>> {
        &self.engine
    }

    /// Reviews every asset of a batch.
    ///
    /// Cancelled assets surface as [`ReviewError::Cancelled`] and the partial
    /// response is returned.
    #[must_use]
    pub fn review_batch(&self, request: BatchRequest, cancel: &CancellationToken) -> BatchResponse {
        let total = request.assets.len();
        let assets = Arc::new(request.assets);
        let (results, outcomes) = mpsc::sync_channel::<Outcome>(self.worker_count.get());
        let producer = self.inbox.clone().and_then(|inbox| {
            let engine = Arc::clone(&self.engine);
            let assets = Arc::clone(&assets);
            let results = results.clone();
            let cancel = cancel.clone();
            thread::Builder::new()
                .name("fleet-gate-review-producer".to_string())
                .spawn(move || produce(&engine, &inbox, &results, &assets, &cancel))
                .inspect_err(|err| debug!(error = %err, "review producer unavailable, reviewing inline"))
                .ok()
        });
        drop(results);

        let mut collected = Vec::with_capacity(total);
        if producer.is_some() {
            for _ in 0 .. total {
                match outcomes.recv() {
                    Ok(outcome) => collected.push(outcome),
                    Err(_) => break,
                }
            }
            collected.extend(missing_outcomes(&assets, &collected));
        } else {
            for (index, asset) in assets.iter().enumerate() {
                collected.push(review_one(&self.engine, index, asset, cancel));
            }
        }
        if let Some(producer) = producer
            && producer.join().is_err()
        {
            debug!("review producer panicked");
        }
        aggregate(collected)
    }

    /// Closes the inbox and joins every worker.
    pub fn shutdown(mut self) {
        self.close();
    }

    /// Closes the inbox and joins every worker.
    fn close(&mut self) {
        self.inbox.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                debug!("review worker panicked");
            }
        }
    }
}

impl<R: PolicyRuntime + 'static> Drop for ReviewPool<R> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Returns the number of logical cores (at least one).
#[must_use]
pub fn default_worker_count() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Runs jobs until the inbox is closed and drained.
fn worker_loop(index: usize, receiver: &Arc<Mutex<Receiver<Job>>>) {
    debug!(worker = index, "review worker started");
    loop {
        let job = receiver.lock().unwrap_or_else(PoisonError::into_inner).recv();
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
    debug!(worker = index, "review worker stopped");
}

/// Enqueues one job per asset.
fn produce<R: PolicyRuntime + 'static>(
    engine: &Arc<ReviewEngine<R>>,
    inbox: &SyncSender<Job>,
    results: &SyncSender<Outcome>,
    assets: &Arc<Vec<Value>>,
    cancel: &CancellationToken,
) {
    for index in 0 .. assets.len() {
        let engine = Arc::clone(engine);
        let assets = Arc::clone(assets);
        let results = results.clone();
        let cancel = cancel.clone();
        let job: Job = Box::new(move || {
            let outcome = match assets.get(index) {
                Some(asset) => review_one(&engine, index, asset, &cancel),
                None => return,
            };
            let _ = results.send(outcome);
        });
        if let Err(mpsc::SendError(job)) = inbox.send(job) {
            job();
        }
    }
}

/// Reviews one asset unless the batch was cancelled.
fn review_one<R: PolicyRuntime>(
    engine: &ReviewEngine<R>,
    index: usize,
    asset: &Value,
    cancel: &CancellationToken,
) -> Outcome {
    let name = asset.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
    let outcome = if cancel.is_cancelled() {
        Err(ReviewError::Cancelled {
            asset: name.clone(),
        })
    } else {
        panic::catch_unwind(AssertUnwindSafe(|| engine.review(asset, cancel))).unwrap_or_else(|payload| {
            Err(ReviewError::EvaluatorFailure {
                asset: name.clone(),
                constraint: UNKNOWN_CONSTRAINT.to_string(),
                message: format!("review panicked: {}", panic_message(payload.as_ref())),
            })
        })
    };
    if let Err(err) = &outcome {
        debug!(index, asset = %name, error = %err, "asset review failed");
    }
    (index, name, outcome)
}

/// Returns a failure for every asset index absent from `collected`.
fn missing_outcomes(assets: &[Value], collected: &[Outcome]) -> Vec<Outcome> {
    let mut seen = vec![false; assets.len()];
    for (index, _, _) in collected {
        if let Some(slot) = seen.get_mut(*index) {
            *slot = true;
        }
    }
    assets
        .iter()
        .enumerate()
        .filter(|(index, _)| !seen[*index])
        .map(|(index, asset)| {
            let name = asset.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            debug!(index, asset = %name, "asset review produced no outcome");
            let error = ReviewError::EvaluatorFailure {
                asset: name.clone(),
                constraint: UNKNOWN_CONSTRAINT.to_string(),
                message: "review produced no outcome".to_string(),
            };
            (index, name, Err(error))
        })
        .collect()
}

/// Renders a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// Folds outcomes into a response.
fn aggregate(outcomes: Vec<Outcome>) -> BatchResponse {
    let mut violations = Vec::new();
    let mut failures = Vec::new();
    for (index, asset, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                violations.extend(result.to_violations());
                failures.extend(result.skipped.into_iter().map(|error| BatchFailure {
                    index,
                    asset: asset.clone(),
                    error,
                }));
            }
            Err(error) => failures.push(BatchFailure {
                index,
                asset,
                error,
            }),
        }
    }
    BatchResponse {
        violations,
        error: (!failures.is_empty()).then(|| BatchError::new(failures)),
    }
}
