//! Observable orchestrator state and the failure vocabulary attached to it.

use bytes::Bytes;
use docledger_core::{
    ContentFingerprint, HashError, SelectedFile, StorageReference, UserFacing,
};
use docledger_ledger::{ConnectionError, ContractError, TransactionReceipt};
use docledger_storage::StorageError;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// Where in the registration sequence a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Hash,
    Upload,
    Ledger,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Stage::Hash => write!(f, "hash"),
            Stage::Upload => write!(f, "upload"),
            Stage::Ledger => write!(f, "ledger"),
        }
    }
}

/// Error kinds a collaborator can report, flattened for display and matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnavailable,
    UploadFailed,
    NotFound,
    RetrievalFailed,
    StorageUnavailable,
    WalletUnavailable,
    UserRejected,
    InvalidAddress,
    NoConnection,
    TransactionRejected,
    TransactionReverted,
    NetworkError,
    /// The operation's future was dropped before it finished
    Interrupted,
}

/// Why an attempt failed: the kind, a message for the user, and the raw detail
/// for logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureCause {
    pub kind: FailureKind,
    message: String,
    detail: String,
}

impl FailureCause {
    fn new(kind: FailureKind, error: &(impl UserFacing + Display)) -> Self {
        Self {
            kind,
            message: error.user_message(),
            detail: error.to_string(),
        }
    }

    pub(crate) fn interrupted() -> Self {
        Self {
            kind: FailureKind::Interrupted,
            message: "The operation was interrupted before it finished.".to_string(),
            detail: "operation dropped before completion".to_string(),
        }
    }

    /// Message derived from the error kind, safe to show to the user.
    pub fn user_message(&self) -> &str {
        &self.message
    }

    /// Underlying error text, for logs only.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl Display for FailureCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

impl From<&HashError> for FailureCause {
    fn from(err: &HashError) -> Self {
        match err {
            HashError::SourceUnavailable { .. } => Self::new(FailureKind::SourceUnavailable, err),
        }
    }
}

impl From<&StorageError> for FailureCause {
    fn from(err: &StorageError) -> Self {
        let kind = match err {
            StorageError::UploadFailed(_) => FailureKind::UploadFailed,
            StorageError::NotFound(_) => FailureKind::NotFound,
            StorageError::RetrievalFailed(_) => FailureKind::RetrievalFailed,
            StorageError::IoError(_) | StorageError::ConfigError(_) => FailureKind::StorageUnavailable,
        };
        Self::new(kind, err)
    }
}

impl From<&ConnectionError> for FailureCause {
    fn from(err: &ConnectionError) -> Self {
        let kind = match err {
            ConnectionError::WalletUnavailable(_) => FailureKind::WalletUnavailable,
            ConnectionError::UserRejected => FailureKind::UserRejected,
        };
        Self::new(kind, err)
    }
}

impl From<&ContractError> for FailureCause {
    fn from(err: &ContractError) -> Self {
        let kind = match err {
            ContractError::InvalidAddress(_) => FailureKind::InvalidAddress,
            ContractError::NoConnection => FailureKind::NoConnection,
            ContractError::TransactionRejected => FailureKind::TransactionRejected,
            ContractError::TransactionReverted { .. } => FailureKind::TransactionReverted,
            ContractError::NetworkError(_) => FailureKind::NetworkError,
        };
        Self::new(kind, err)
    }
}

/// Registration workflow phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    FileSelected,
    Hashing,
    /// Upload to the storage network in progress
    Publishing,
    Published,
    AwaitingSignature,
    Confirmed,
    Failed { stage: Stage, cause: FailureCause },
}

impl SubmissionState {
    pub fn is_failed(&self) -> bool {
        matches!(self, SubmissionState::Failed { .. })
    }

    /// Stage an interruption in this phase is attributed to.
    pub(crate) fn stage(&self) -> Stage {
        match self {
            SubmissionState::Hashing => Stage::Hash,
            SubmissionState::AwaitingSignature | SubmissionState::Confirmed => Stage::Ledger,
            SubmissionState::Failed { stage, .. } => *stage,
            _ => Stage::Upload,
        }
    }
}

/// Retrieval workflow phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetrievalState {
    Idle,
    Fetching { reference: StorageReference },
    Ready { reference: StorageReference, size_bytes: usize },
    Failed { reference: StorageReference, cause: FailureCause },
}

/// Snapshot of everything the UI may read. Only the orchestrator writes it.
#[derive(Debug, Clone)]
pub struct OrchestratorState {
    pub submission: SubmissionState,
    pub retrieval: RetrievalState,
    pub file: Option<SelectedFile>,
    pub fingerprint: Option<ContentFingerprint>,
    pub reference: Option<StorageReference>,
    pub receipt: Option<TransactionReceipt>,
    pub last_download: Option<PathBuf>,
    pub(crate) registration_busy: bool,
    pub(crate) retrieval_busy: bool,
    /// Bytes captured when the fingerprint was computed; the payload that gets published
    pub(crate) captured: Option<Bytes>,
    /// Bumped on every new selection or reset; results from older attempts are dropped
    pub(crate) generation: u64,
}

impl Default for OrchestratorState {
    fn default() -> Self {
        Self {
            submission: SubmissionState::Idle,
            retrieval: RetrievalState::Idle,
            file: None,
            fingerprint: None,
            reference: None,
            receipt: None,
            last_download: None,
            registration_busy: false,
            retrieval_busy: false,
            captured: None,
            generation: 0,
        }
    }
}

impl OrchestratorState {
    /// The single flag that gates UI controls across both workflows.
    pub fn is_busy(&self) -> bool {
        self.registration_busy || self.retrieval_busy
    }

    pub(crate) fn clear_attempt(&mut self) {
        self.file = None;
        self.fingerprint = None;
        self.reference = None;
        self.receipt = None;
        self.captured = None;
        self.registration_busy = false;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causes_carry_kind_and_user_message() {
        let cause = FailureCause::from(&StorageError::NotFound("cid-999".to_string()));
        assert_eq!(cause.kind, FailureKind::NotFound);
        assert!(!cause.user_message().contains("cid-999"));
        assert!(cause.detail().contains("cid-999"));
    }

    #[test]
    fn user_message_does_not_leak_transport_text() {
        let cause = FailureCause::from(&StorageError::UploadFailed(
            "Failed to send upload: error trying to connect: tcp connect error".to_string(),
        ));
        assert_eq!(cause.kind, FailureKind::UploadFailed);
        assert!(!cause.user_message().contains("tcp"));
    }

    #[test]
    fn contract_errors_map_to_kinds() {
        assert_eq!(
            FailureCause::from(&ContractError::NoConnection).kind,
            FailureKind::NoConnection
        );
        assert_eq!(
            FailureCause::from(&ContractError::TransactionReverted {
                reason: "duplicate".into()
            })
            .kind,
            FailureKind::TransactionReverted
        );
    }

    #[test]
    fn clearing_an_attempt_bumps_generation() {
        let mut state = OrchestratorState {
            reference: Some(StorageReference::new("cid-123")),
            registration_busy: true,
            ..OrchestratorState::default()
        };
        state.clear_attempt();
        assert_eq!(state.generation, 1);
        assert!(state.reference.is_none());
        assert!(!state.is_busy());
    }

    #[test]
    fn busy_flag_covers_both_workflows() {
        let state = OrchestratorState {
            retrieval_busy: true,
            ..OrchestratorState::default()
        };
        assert!(state.is_busy());
    }
}
