//! Registration Orchestrator
//!
//! One instance drives one document at a time through hash, publish and ledger
//! submission, plus the reverse fetch-and-save workflow. Every transition is
//! written to a `watch` channel; the UI reads snapshots and never writes.
//!
//! Only one operation runs at a time. Selecting a new file or resetting while an
//! attempt is in flight starts a new generation; whatever the older attempt
//! produces afterwards is dropped instead of being written back.

mod registration;
mod retrieval;
mod state;

pub use state::{FailureCause, FailureKind, OrchestratorState, RetrievalState, Stage, SubmissionState};

use docledger_core::{LogLevel, UserFacing};
use docledger_ledger::{ConnectionManager, ContractBinding, ContractError, ContractGateway};
use docledger_storage::ContentStore;
use std::fmt::Display;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::download::DownloadSink;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Another operation is already in progress")]
    AlreadyInProgress,

    #[error("Missing required input: {}", .missing.join(", "))]
    NotReady { missing: Vec<&'static str> },

    #[error("The previous attempt failed; reset before trying again")]
    ResetRequired,

    #[error("{stage} stage failed: {cause}")]
    Failed { stage: Stage, cause: FailureCause },

    #[error("Retrieval failed: {0}")]
    RetrievalFailed(FailureCause),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("Attempt was superseded by a newer selection or reset")]
    Superseded,
}

impl UserFacing for OrchestratorError {
    fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::AlreadyInProgress => "ALREADY_IN_PROGRESS",
            OrchestratorError::NotReady { .. } => "NOT_READY",
            OrchestratorError::ResetRequired => "RESET_REQUIRED",
            OrchestratorError::Failed { stage, .. } => match stage {
                Stage::Hash => "HASH_FAILED",
                Stage::Upload => "UPLOAD_FAILED",
                Stage::Ledger => "LEDGER_FAILED",
            },
            OrchestratorError::RetrievalFailed(_) => "RETRIEVAL_FAILED",
            OrchestratorError::Contract(e) => e.error_code(),
            OrchestratorError::Superseded => "SUPERSEDED",
        }
    }

    fn user_message(&self) -> String {
        match self {
            OrchestratorError::AlreadyInProgress => {
                "Please wait for the current operation to finish.".to_string()
            }
            OrchestratorError::NotReady { missing } => {
                format!("Please provide: {}.", missing.join(", "))
            }
            OrchestratorError::ResetRequired => {
                "The last attempt failed. Start over to try again.".to_string()
            }
            OrchestratorError::Failed { cause, .. } | OrchestratorError::RetrievalFailed(cause) => {
                cause.user_message().to_string()
            }
            OrchestratorError::Contract(e) => e.user_message(),
            OrchestratorError::Superseded => "The operation was cancelled.".to_string(),
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            OrchestratorError::Contract(e) => e.is_recoverable(),
            _ => true,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            OrchestratorError::AlreadyInProgress
            | OrchestratorError::NotReady { .. }
            | OrchestratorError::Superseded => LogLevel::Debug,
            OrchestratorError::Contract(e) => e.log_level(),
            _ => LogLevel::Warn,
        }
    }
}

const IDLE: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Operation {
    Registration = 1,
    Retrieval = 2,
}

/// Exclusive claim on the orchestrator for one operation.
///
/// Once armed (the busy flag has been raised), dropping the claim without
/// settling marks the attempt as interrupted so the UI is never left busy.
struct Attempt<'a> {
    owner: &'a RegistrationOrchestrator,
    operation: Operation,
    generation: u64,
    armed: bool,
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if self.armed {
            let generation = self.generation;
            match self.operation {
                Operation::Registration => {
                    self.owner.state.send_if_modified(|s| {
                        if s.generation != generation || !s.registration_busy {
                            return false;
                        }
                        s.submission = SubmissionState::Failed {
                            stage: s.submission.stage(),
                            cause: FailureCause::interrupted(),
                        };
                        s.registration_busy = false;
                        true
                    });
                }
                Operation::Retrieval => {
                    self.owner.state.send_if_modified(|s| {
                        let reference = match &s.retrieval {
                            RetrievalState::Fetching { reference }
                            | RetrievalState::Ready { reference, .. } => reference.clone(),
                            _ => return false,
                        };
                        s.retrieval = RetrievalState::Failed {
                            reference,
                            cause: FailureCause::interrupted(),
                        };
                        s.retrieval_busy = false;
                        true
                    });
                }
            }
            tracing::warn!(operation = ?self.operation, "Operation interrupted");
        }
        self.owner.active.store(IDLE, Ordering::Release);
    }
}

/// Drives registration and retrieval for a single client.
pub struct RegistrationOrchestrator {
    storage: Arc<dyn ContentStore>,
    gateway: ContractGateway,
    downloads: Arc<dyn DownloadSink>,
    contract_address: Option<String>,
    binding: watch::Sender<Option<ContractBinding>>,
    state: watch::Sender<OrchestratorState>,
    active: AtomicU8,
}

impl RegistrationOrchestrator {
    pub fn new(
        storage: Arc<dyn ContentStore>,
        gateway: ContractGateway,
        downloads: Arc<dyn DownloadSink>,
    ) -> Self {
        let (binding, _) = watch::channel(None);
        let (state, _) = watch::channel(OrchestratorState::default());
        Self {
            storage,
            gateway,
            downloads,
            contract_address: None,
            binding,
            state,
            active: AtomicU8::new(IDLE),
        }
    }

    /// Registry contract to bind on first submission when none is bound yet.
    pub fn with_contract_address(mut self, address: Option<String>) -> Self {
        self.contract_address = address;
        self
    }

    /// Current snapshot.
    pub fn state(&self) -> OrchestratorState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        self.gateway.connection()
    }

    /// Currently bound registry contract, if any.
    pub fn binding(&self) -> Option<ContractBinding> {
        self.binding.borrow().clone()
    }

    /// Bind to the registry deployed at `address`, replacing any earlier binding.
    pub fn bind_contract(&self, address: &str) -> Result<ContractBinding, OrchestratorError> {
        let binding = self.gateway.bind(address).map_err(|e| {
            log_failure("bind", &e);
            e
        })?;
        self.binding.send_replace(Some(binding.clone()));
        Ok(binding)
    }

    fn begin(&self, operation: Operation) -> Result<Attempt<'_>, OrchestratorError> {
        self.active
            .compare_exchange(IDLE, operation as u8, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OrchestratorError::AlreadyInProgress)?;

        Ok(Attempt {
            owner: self,
            operation,
            generation: self.state.borrow().generation,
            armed: false,
        })
    }

    /// Apply `f` only if no selection or reset happened since `attempt` began.
    fn update(
        &self,
        attempt: &Attempt<'_>,
        f: impl FnOnce(&mut OrchestratorState),
    ) -> Result<(), OrchestratorError> {
        let generation = attempt.generation;
        let applied = self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            f(s);
            true
        });

        if applied {
            Ok(())
        } else {
            tracing::debug!(generation, "Discarding result of superseded attempt");
            Err(OrchestratorError::Superseded)
        }
    }
}

fn log_failure(stage: &str, error: &(impl UserFacing + Display)) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(stage, error = %error, code, "Operation failed"),
        LogLevel::Warn => tracing::warn!(stage, error = %error, code, "Operation failed"),
        LogLevel::Error => tracing::error!(stage, error = %error, code, "Operation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_ready_lists_missing_fields() {
        let err = OrchestratorError::NotReady {
            missing: vec!["document_name", "file"],
        };
        assert_eq!(err.to_string(), "Missing required input: document_name, file");
        assert_eq!(err.error_code(), "NOT_READY");
    }

    #[test]
    fn failed_code_follows_stage() {
        let cause = FailureCause::from(&ContractError::NoConnection);
        let err = OrchestratorError::Failed {
            stage: Stage::Ledger,
            cause,
        };
        assert_eq!(err.error_code(), "LEDGER_FAILED");
        assert_eq!(
            err.user_message(),
            ContractError::NoConnection.user_message()
        );
    }

    #[test]
    fn contract_errors_keep_their_metadata() {
        let err = OrchestratorError::from(ContractError::InvalidAddress("0x1".into()));
        assert_eq!(err.error_code(), "INVALID_ADDRESS");
        assert!(!err.is_recoverable());
    }
}
