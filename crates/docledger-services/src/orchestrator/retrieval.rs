//! Retrieval workflow: fetch by storage reference and save locally.

use docledger_core::StorageReference;
use docledger_storage::StorageError;

use super::state::{FailureCause, RetrievalState};
use super::{log_failure, Attempt, Operation, OrchestratorError, RegistrationOrchestrator};
use crate::download::Download;

impl RegistrationOrchestrator {
    /// Fetch the document stored under `reference` and save it through the
    /// download sink.
    ///
    /// Returns to `Idle` once the document is saved. On failure the state stays
    /// at `Failed` (busy cleared) until the next `retrieve` or `reset_retrieval`.
    pub async fn retrieve(&self, reference: &StorageReference) -> Result<Download, OrchestratorError> {
        let mut attempt = self.begin(Operation::Retrieval)?;

        if reference.is_empty() {
            return Err(OrchestratorError::NotReady {
                missing: vec!["storage_reference"],
            });
        }

        self.state.send_modify(|s| {
            s.retrieval = RetrievalState::Fetching {
                reference: reference.clone(),
            };
            s.retrieval_busy = true;
        });
        attempt.armed = true;
        tracing::info!(reference = %reference, "Fetching document");

        let content = match self.storage.fetch(reference).await {
            Ok(content) => content,
            Err(e) => return Err(self.fail_retrieval(&mut attempt, reference, &e)),
        };

        let size_bytes = content.bytes.len();
        self.state.send_modify(|s| {
            s.retrieval = RetrievalState::Ready {
                reference: reference.clone(),
                size_bytes,
            };
        });

        let path = match self.downloads.save(reference, &content).await {
            Ok(path) => path,
            Err(e) => {
                let err = StorageError::IoError(e);
                return Err(self.fail_retrieval(&mut attempt, reference, &err));
            }
        };

        self.state.send_modify(|s| {
            s.retrieval = RetrievalState::Idle;
            s.retrieval_busy = false;
            s.last_download = Some(path.clone());
        });
        attempt.armed = false;

        tracing::info!(
            reference = %reference,
            path = %path.display(),
            size = size_bytes,
            "Document retrieved"
        );

        Ok(Download {
            reference: reference.clone(),
            path,
            media_type: content.media_type,
            size_bytes,
        })
    }

    /// Clear a failed retrieval back to `Idle`.
    pub fn reset_retrieval(&self) -> Result<(), OrchestratorError> {
        let mut busy = false;
        self.state.send_if_modified(|s| {
            if s.retrieval_busy {
                busy = true;
                return false;
            }
            s.retrieval = RetrievalState::Idle;
            true
        });

        if busy {
            Err(OrchestratorError::AlreadyInProgress)
        } else {
            Ok(())
        }
    }

    pub fn retrieval_state(&self) -> RetrievalState {
        self.state.borrow().retrieval.clone()
    }

    fn fail_retrieval(
        &self,
        attempt: &mut Attempt<'_>,
        reference: &StorageReference,
        error: &StorageError,
    ) -> OrchestratorError {
        log_failure("retrieve", error);

        let cause = FailureCause::from(error);
        self.state.send_modify(|s| {
            s.retrieval = RetrievalState::Failed {
                reference: reference.clone(),
                cause: cause.clone(),
            };
            s.retrieval_busy = false;
        });
        attempt.armed = false;

        OrchestratorError::RetrievalFailed(cause)
    }
}
