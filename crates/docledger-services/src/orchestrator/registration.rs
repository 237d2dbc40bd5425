//! Registration workflow: select, hash, publish, sign, confirm.

use bytes::Bytes;
use docledger_core::{
    ContentFingerprint, ContentHasher, RegistrationForm, RegistrationRecord, SelectedFile,
    StorageReference, UserFacing,
};
use docledger_ledger::{ContractBinding, ContractError, TransactionReceipt};
use std::fmt::Display;

use super::state::{FailureCause, OrchestratorState, Stage, SubmissionState};
use super::{log_failure, Attempt, Operation, OrchestratorError, RegistrationOrchestrator};

/// Phase to rest in once a partial run (hash or publish only) settles.
fn resting_phase(state: &OrchestratorState) -> SubmissionState {
    if state.reference.is_some() {
        SubmissionState::Published
    } else {
        SubmissionState::FileSelected
    }
}

impl RegistrationOrchestrator {
    /// Replace the current selection.
    ///
    /// Always accepted. Clears every artifact derived from the previous file; an
    /// attempt still in flight for it will have its results dropped.
    pub fn select_file(&self, file: SelectedFile) {
        tracing::info!(file = %file.name(), media_type = %file.media_type(), "File selected");
        self.state.send_modify(|s| {
            s.clear_attempt();
            s.file = Some(file);
            s.submission = SubmissionState::FileSelected;
        });
    }

    /// Return the registration workflow to `Idle` from any state.
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            s.clear_attempt();
            s.submission = SubmissionState::Idle;
        });
        tracing::info!("Registration reset");
    }

    /// Whether every form field is filled and the selected file has been published.
    pub fn can_submit(&self, form: &RegistrationForm) -> bool {
        let state = self.state.borrow();
        form.is_complete()
            && state.file.is_some()
            && state
                .reference
                .as_ref()
                .is_some_and(|reference| !reference.is_empty())
    }

    /// Fingerprint the selected file without publishing it.
    pub async fn begin_hash(&self) -> Result<ContentFingerprint, OrchestratorError> {
        let mut attempt = self.begin(Operation::Registration)?;
        let file = self.selected_file(&[])?;

        let (_, fingerprint) = self.hash_step(&mut attempt, &file).await?;
        self.settle(&mut attempt, None)?;

        Ok(fingerprint)
    }

    /// Fingerprint (if needed) and publish the selected file.
    pub async fn publish(&self) -> Result<StorageReference, OrchestratorError> {
        let mut attempt = self.begin(Operation::Registration)?;
        let file = self.selected_file(&[])?;

        let (bytes, _) = self.hash_step(&mut attempt, &file).await?;
        let reference = self.publish_step(&mut attempt, &file, bytes).await?;
        self.settle(&mut attempt, None)?;

        Ok(reference)
    }

    /// Register the selected document on the ledger.
    ///
    /// Runs whichever of hash and publish have not happened yet, then asks the
    /// active account to sign `registerDocument` and waits for confirmation.
    /// Rejected with `AlreadyInProgress` while another operation runs, leaving
    /// state untouched.
    pub async fn submit(&self, form: &RegistrationForm) -> Result<TransactionReceipt, OrchestratorError> {
        let mut attempt = self.begin(Operation::Registration)?;
        let file = self.selected_file(&form.missing_fields())?;

        tracing::info!(
            attempt = attempt.generation,
            document = %form.document_name,
            file = %file.name(),
            "Submitting registration"
        );

        let (bytes, _) = self.hash_step(&mut attempt, &file).await?;
        let reference = self.publish_step(&mut attempt, &file, bytes).await?;

        self.enter(&mut attempt, SubmissionState::AwaitingSignature)?;

        let Some(account) = self.connection().active_account() else {
            return Err(self.fail_ledger(&mut attempt, ContractError::NoConnection));
        };

        let binding = match self.resolve_binding(form) {
            Ok(binding) => binding,
            Err(e) => return Err(self.fail_ledger(&mut attempt, e)),
        };

        let Some(record) = RegistrationRecord::from_form(form, &reference) else {
            self.settle(&mut attempt, None)?;
            return Err(OrchestratorError::NotReady {
                missing: vec!["storage_reference"],
            });
        };

        let receipt = match binding.submit_registration(&record, &account).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.fail_ledger(&mut attempt, e)),
        };

        // The file is spent once registered; fingerprint and reference stay for display.
        self.update(&attempt, |s| {
            s.receipt = Some(receipt.clone());
            s.submission = SubmissionState::Confirmed;
            s.registration_busy = false;
            s.file = None;
            s.captured = None;
        })?;
        attempt.armed = false;

        tracing::info!(
            tx = %receipt.transaction_hash,
            reference = %reference,
            account = %account,
            "Registration confirmed"
        );

        Ok(receipt)
    }

    /// Selected file, once preconditions for a new run hold.
    fn selected_file(&self, missing_fields: &[&'static str]) -> Result<SelectedFile, OrchestratorError> {
        let state = self.state.borrow();
        if state.submission.is_failed() {
            return Err(OrchestratorError::ResetRequired);
        }

        let mut missing = missing_fields.to_vec();
        if state.file.is_none() {
            missing.push("file");
        }
        match (&state.file, missing.is_empty()) {
            (Some(file), true) => Ok(file.clone()),
            _ => Err(OrchestratorError::NotReady { missing }),
        }
    }

    async fn hash_step(
        &self,
        attempt: &mut Attempt<'_>,
        file: &SelectedFile,
    ) -> Result<(Bytes, ContentFingerprint), OrchestratorError> {
        let existing = {
            let state = self.state.borrow();
            if state.generation != attempt.generation {
                return Err(OrchestratorError::Superseded);
            }
            state.captured.clone().zip(state.fingerprint.clone())
        };
        if let Some(done) = existing {
            return Ok(done);
        }

        self.enter(attempt, SubmissionState::Hashing)?;

        match ContentHasher::hash_file(file).await {
            Ok((bytes, fingerprint)) => {
                self.update(attempt, |s| {
                    s.captured = Some(bytes.clone());
                    s.fingerprint = Some(fingerprint.clone());
                })?;
                tracing::debug!(fingerprint = %fingerprint, size = bytes.len(), "File hashed");
                Ok((bytes, fingerprint))
            }
            Err(e) => Err(self.fail(attempt, Stage::Hash, &e, FailureCause::from(&e))),
        }
    }

    async fn publish_step(
        &self,
        attempt: &mut Attempt<'_>,
        file: &SelectedFile,
        bytes: Bytes,
    ) -> Result<StorageReference, OrchestratorError> {
        let existing = {
            let state = self.state.borrow();
            if state.generation != attempt.generation {
                return Err(OrchestratorError::Superseded);
            }
            state.reference.clone()
        };
        if let Some(reference) = existing {
            return Ok(reference);
        }

        self.enter(attempt, SubmissionState::Publishing)?;

        match self.storage.publish(bytes, file.media_type(), file.name()).await {
            Ok(reference) => {
                self.update(attempt, |s| {
                    s.reference = Some(reference.clone());
                    s.submission = SubmissionState::Published;
                })?;
                tracing::info!(
                    reference = %reference,
                    backend = %self.storage.backend_type(),
                    "File published"
                );
                Ok(reference)
            }
            Err(e) => Err(self.fail(attempt, Stage::Upload, &e, FailureCause::from(&e))),
        }
    }

    /// Registry to sign against: the current binding, else the configured
    /// contract, else the receiver address from the form.
    ///
    /// Only `bind_contract` stores a binding; one resolved here lives for this
    /// attempt alone.
    fn resolve_binding(&self, form: &RegistrationForm) -> Result<ContractBinding, ContractError> {
        if let Some(binding) = self.binding() {
            return Ok(binding);
        }

        let address = self
            .contract_address
            .as_deref()
            .unwrap_or(form.receiver_address.as_str());
        self.gateway.bind(address)
    }

    /// Move into a busy phase.
    fn enter(&self, attempt: &mut Attempt<'_>, phase: SubmissionState) -> Result<(), OrchestratorError> {
        tracing::debug!(attempt = attempt.generation, phase = ?phase, "Registration phase");
        self.update(attempt, |s| {
            s.submission = phase;
            s.registration_busy = true;
        })?;
        attempt.armed = true;
        Ok(())
    }

    /// Leave the busy phase: in `phase`, or the resting phase for the artifacts so far.
    fn settle(&self, attempt: &mut Attempt<'_>, phase: Option<SubmissionState>) -> Result<(), OrchestratorError> {
        self.update(attempt, |s| {
            s.submission = phase.unwrap_or_else(|| resting_phase(s));
            s.registration_busy = false;
        })?;
        attempt.armed = false;
        Ok(())
    }

    fn fail_ledger(&self, attempt: &mut Attempt<'_>, error: ContractError) -> OrchestratorError {
        let cause = FailureCause::from(&error);
        self.fail(attempt, Stage::Ledger, &error, cause)
    }

    fn fail(
        &self,
        attempt: &mut Attempt<'_>,
        stage: Stage,
        error: &(impl UserFacing + Display),
        cause: FailureCause,
    ) -> OrchestratorError {
        log_failure(&stage.to_string(), error);

        let failed = SubmissionState::Failed {
            stage,
            cause: cause.clone(),
        };
        match self.settle(attempt, Some(failed)) {
            Ok(()) => OrchestratorError::Failed { stage, cause },
            Err(superseded) => superseded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_phase_reflects_artifacts() {
        let mut state = OrchestratorState::default();
        assert_eq!(resting_phase(&state), SubmissionState::FileSelected);

        state.reference = Some(StorageReference::new("cid-1"));
        assert_eq!(resting_phase(&state), SubmissionState::Published);
    }
}
