//! Bounded retrieval execution
//!
//! Runs one primary knowledge search under a timeout, optionally followed by
//! a single freshness lookup, and gives up early when the caller cancels.
//! A failed or timed-out primary call is reported as a degraded outcome,
//! never retried.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use udyami_core::{Error, KnowledgeService, RetrievalQuery, RetrievalResult};

use crate::gate::RetrievalGate;

// =============================================================================
// Cancellation
// =============================================================================

/// Cancels in-flight retrievals of one conversation
///
/// Cloneable and cheap to hand to another task. Each [`CancelToken`] only
/// observes cancellations issued after it was created.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel every token issued so far
    pub fn cancel(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    /// Token for the retrieval about to start
    pub fn token(&self) -> CancelToken {
        let mut rx = self.tx.subscribe();
        rx.borrow_and_update();
        CancelToken { rx }
    }
}

/// Observes cancellation for one retrieval
#[derive(Debug)]
pub struct CancelToken {
    rx: watch::Receiver<u64>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Resolves once the handle is cancelled; never resolves otherwise
    pub async fn cancelled(&mut self) {
        if self.rx.changed().await.is_err() {
            // Handle dropped: nothing can cancel any more
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Result of one bounded retrieval
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    /// Primary search succeeded; `escalated` when a fresh lookup was folded in
    Completed {
        result: RetrievalResult,
        escalated: bool,
        /// The fresh lookup was attempted and failed
        fresh_failed: bool,
    },
    /// Primary search timed out or failed; compose without scheme data
    Degraded(Error),
    /// A newer turn took over; discard
    Cancelled,
}

impl RetrievalOutcome {
    pub fn result(&self) -> Option<&RetrievalResult> {
        match self {
            RetrievalOutcome::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalOutcome::Degraded(_))
    }
}

enum Call {
    Done(udyami_core::Result<RetrievalResult>),
    Cancelled,
}

/// Runs knowledge service calls under the configured bounds
pub struct RetrievalExecutor {
    service: Arc<dyn KnowledgeService>,
    timeout: Duration,
    min_score: f32,
}

impl RetrievalExecutor {
    pub fn new(service: Arc<dyn KnowledgeService>, timeout: Duration, min_score: f32) -> Self {
        Self {
            service,
            timeout,
            min_score,
        }
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    /// Primary search, then at most one escalation if the gate allows it
    pub async fn execute(
        &self,
        query: &RetrievalQuery,
        gate: &RetrievalGate,
        wants_latest: bool,
        mut token: CancelToken,
    ) -> RetrievalOutcome {
        let started = Instant::now();
        let primary = match self.call(query, false, &mut token).await {
            Call::Cancelled => return self.cancelled(),
            Call::Done(Ok(result)) => self.filter(result),
            Call::Done(Err(e)) => {
                tracing::warn!(service = self.service.name(), error = %e, "Primary retrieval failed, composing without scheme data");
                metrics::histogram!("udyami_retrieval_latency_ms").record(started.elapsed().as_millis() as f64);
                return RetrievalOutcome::Degraded(e);
            },
        };

        if !gate.should_escalate(&primary, wants_latest, Utc::now()) {
            metrics::histogram!("udyami_retrieval_latency_ms").record(started.elapsed().as_millis() as f64);
            return RetrievalOutcome::Completed {
                result: primary,
                escalated: false,
                fresh_failed: false,
            };
        }

        tracing::info!(
            service = self.service.name(),
            wants_latest,
            stale_since = ?primary.updated_at,
            "Escalating to fresh search"
        );
        metrics::counter!("udyami_retrieval_escalations_total").increment(1);

        let outcome = match self.call(query, true, &mut token).await {
            Call::Cancelled => return self.cancelled(),
            Call::Done(Ok(fresh)) => RetrievalOutcome::Completed {
                result: primary.merge_fresh(self.filter(fresh)),
                escalated: true,
                fresh_failed: false,
            },
            Call::Done(Err(e)) => {
                tracing::warn!(error = %e, "Fresh search failed, keeping primary result");
                RetrievalOutcome::Completed {
                    result: primary,
                    escalated: true,
                    fresh_failed: true,
                }
            },
        };
        metrics::histogram!("udyami_retrieval_latency_ms").record(started.elapsed().as_millis() as f64);
        outcome
    }

    async fn call(&self, query: &RetrievalQuery, fresh: bool, token: &mut CancelToken) -> Call {
        if token.is_cancelled() {
            return Call::Cancelled;
        }
        let timeout_ms = self.timeout.as_millis() as u64;
        let search = async {
            if fresh {
                self.service.fresh_search(query).await
            } else {
                self.service.search(query).await
            }
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Call::Cancelled,
            res = tokio::time::timeout(self.timeout, search) => match res {
                Ok(result) => Call::Done(result),
                Err(_) => Call::Done(Err(Error::RetrievalTimeout { timeout_ms })),
            },
        }
    }

    fn filter(&self, mut result: RetrievalResult) -> RetrievalResult {
        let before = result.records.len();
        result.records.retain(|r| r.score >= self.min_score);
        if result.records.len() < before {
            tracing::debug!(dropped = before - result.records.len(), min_score = self.min_score, "Dropped weak records");
        }
        result
    }

    fn cancelled(&self) -> RetrievalOutcome {
        tracing::debug!(service = self.service.name(), "Retrieval cancelled by a newer turn");
        RetrievalOutcome::Cancelled
    }
}
