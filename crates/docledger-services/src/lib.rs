//! Docledger Services
//!
//! The registration orchestrator: sequences hashing, publishing and ledger
//! submission for one document at a time, runs the reverse retrieval
//! workflow, and publishes its state for the UI to observe.

pub mod download;
pub mod orchestrator;

// Re-export commonly used types
pub use download::{Download, DownloadDirectory, DownloadSink};
pub use orchestrator::{
    FailureCause, FailureKind, OrchestratorError, OrchestratorState, RegistrationOrchestrator,
    RetrievalState, Stage, SubmissionState,
};
