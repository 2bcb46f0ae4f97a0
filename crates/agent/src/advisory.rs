use crate::Action;
use jester_core::{ArchetypeSnapshot, GameContext, Phase};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Payload handed to the advisory channel for a low-confidence strategic decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisoryRequest {
    pub phase: Phase,
    pub context: GameContext,
    pub legal_actions: Vec<Action>,
    pub rule_candidate: Action,
    pub archetype: ArchetypeSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AdvisoryResponse {
    pub action: Action,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvisoryError {
    #[error("advisory timed out")]
    Timeout,
    #[error("advisory transport error: {0}")]
    Transport(String),
    #[error("advisory payload rejected: {0}")]
    Schema(String),
    #[error("advisory chose an illegal action: {0}")]
    IllegalAction(String),
}

impl AdvisoryError {
    /// Only failures on the way to the channel are worth a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Schema(_) => "schema",
            Self::IllegalAction(_) => "illegal_action",
        }
    }
}

/// Transport to an external advisor. Returns the raw JSON response payload.
pub trait AdvisoryChannel: Send + Sync {
    fn advise(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError>;
}

/// Channel used when no advisor is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledChannel;

impl AdvisoryChannel for DisabledChannel {
    fn advise(&self, _request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::Transport("advisory channel disabled".to_string()))
    }
}

/// Caps advisory workers still running, abandoned ones included. Clones share
/// the same count.
#[derive(Debug, Clone)]
pub struct WorkerLimit {
    running: Arc<AtomicUsize>,
    max: usize,
}

impl WorkerLimit {
    pub fn new(max: usize) -> Self {
        Self {
            running: Arc::new(AtomicUsize::new(0)),
            max,
        }
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Option<WorkerSlot> {
        self.running
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max).then_some(n + 1)
            })
            .ok()
            .map(|_| WorkerSlot(Arc::clone(&self.running)))
    }
}

/// Held by a worker thread until its channel call returns.
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Result of a consult, successful or not, with the number of calls made.
#[derive(Debug, Clone)]
pub struct Consultation {
    pub result: Result<AdvisoryResponse, AdvisoryError>,
    pub attempts: u32,
}

/// Calls the channel under a deadline, retrying retryable failures up to
/// `retries` times, and validates the response against the legal set. No call
/// is made while `limit` workers are still outstanding.
pub fn consult(
    channel: &Arc<dyn AdvisoryChannel>,
    request: &AdvisoryRequest,
    timeout: Duration,
    retries: u32,
    limit: &WorkerLimit,
) -> Consultation {
    let mut attempts = 0;
    loop {
        let Some(slot) = limit.acquire() else {
            warn!(
                phase = request.phase.label(),
                running = limit.running(),
                "advisory workers busy, consult skipped"
            );
            return Consultation {
                result: Err(AdvisoryError::Transport("advisory workers busy".to_string())),
                attempts,
            };
        };
        attempts += 1;
        let result = call_once(channel, request, timeout, slot)
            .and_then(|raw| parse_response(&raw, &request.legal_actions));
        match result {
            Err(err) if err.is_retryable() && attempts <= retries => {
                warn!(
                    phase = request.phase.label(),
                    attempt = attempts,
                    error = %err,
                    "advisory retry"
                );
            }
            result => return Consultation { result, attempts },
        }
    }
}

fn call_once(
    channel: &Arc<dyn AdvisoryChannel>,
    request: &AdvisoryRequest,
    timeout: Duration,
    slot: WorkerSlot,
) -> Result<String, AdvisoryError> {
    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(channel);
    let owned = request.clone();
    // The worker only owns its copy of the request; if it outlives the
    // deadline its result is dropped with the receiver.
    thread::spawn(move || {
        let result = worker.advise(&owned);
        drop(slot);
        let _ = tx.send(result);
    });
    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(AdvisoryError::Timeout),
        Err(RecvTimeoutError::Disconnected) => Err(AdvisoryError::Transport(
            "advisory worker exited without a reply".to_string(),
        )),
    }
}

/// Strict decode of a raw payload. Unknown fields and actions outside the
/// legal set are both rejected.
pub fn parse_response(raw: &str, legal: &[Action]) -> Result<AdvisoryResponse, AdvisoryError> {
    let response: AdvisoryResponse =
        serde_json::from_str(raw).map_err(|err| AdvisoryError::Schema(err.to_string()))?;
    if !legal.contains(&response.action) {
        return Err(AdvisoryError::IllegalAction(response.action.stable_key()));
    }
    debug!(action = %response.action.stable_key(), "advisory response accepted");
    Ok(response)
}
