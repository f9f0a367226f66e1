use std::{sync::Arc, time::Duration};

use ledger_integration::{LedgerClient, TransactionSigner};
use shared::{
    domain::{AccountAddress, Note},
    error::NotesError,
    protocol::{EntryFunctionId, TransactionOutcome, TransactionPayload, TypeTag},
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{note_store::NoteStore, session::WalletSessionManager, ClientEvent};

/// Matches the default wait used by the node SDKs.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub module_address: AccountAddress,
    pub confirmation_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn new(module_address: AccountAddress) -> Self {
        Self {
            module_address,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn with_confirmation_timeout(mut self, confirmation_timeout: Duration) -> Self {
        self.confirmation_timeout = confirmation_timeout;
        self
    }
}

/// Builds, submits and confirms ledger calls, and applies their local effect
/// only after confirmation. Calls are not serialized against each other.
pub struct TransactionOrchestrator {
    session: Arc<WalletSessionManager>,
    ledger: Arc<dyn LedgerClient>,
    notes: Arc<NoteStore>,
    config: OrchestratorConfig,
    events: broadcast::Sender<ClientEvent>,
}

impl TransactionOrchestrator {
    pub fn new(
        session: Arc<WalletSessionManager>,
        ledger: Arc<dyn LedgerClient>,
        notes: Arc<NoteStore>,
        config: OrchestratorConfig,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            session,
            ledger,
            notes,
            config,
            events,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs one submission to a terminal state. At most once: a failure is
    /// final and a retry is a new call.
    pub async fn submit(
        &self,
        function: EntryFunctionId,
        arguments: Option<Vec<serde_json::Value>>,
        type_arguments: Option<Vec<TypeTag>>,
    ) -> TransactionOutcome {
        let Some(signer) = self.session.current_signer().await else {
            return self.fail(&function, NotesError::NotConnected);
        };

        let payload = TransactionPayload::entry_function(function, arguments, type_arguments);
        debug!(
            target_function = %payload.function,
            sender = %signer.address(),
            "tx: payload built"
        );

        let hash = match self.ledger.submit_transaction(&signer, &payload).await {
            Ok(hash) => hash,
            Err(err) => {
                return self.fail(
                    &payload.function,
                    NotesError::SubmissionFailed(format!("{err:#}")),
                )
            }
        };
        info!(target_function = %payload.function, %hash, "tx: submitted");
        let _ = self.events.send(ClientEvent::TransactionSubmitted {
            function: payload.function.clone(),
            hash: hash.clone(),
        });

        let limit = self.config.confirmation_timeout;
        match tokio::time::timeout(limit, self.ledger.wait_for_transaction(&hash)).await {
            Ok(Ok(confirmation)) => {
                info!(
                    target_function = %payload.function,
                    %hash,
                    version = ?confirmation.version,
                    "tx: confirmed"
                );
                let _ = self.events.send(ClientEvent::TransactionConfirmed {
                    function: payload.function.clone(),
                    hash: hash.clone(),
                });
                TransactionOutcome::Confirmed(hash)
            }
            Ok(Err(err)) => self.fail(
                &payload.function,
                NotesError::ConfirmationFailed(format!("{hash}: {err:#}")),
            ),
            Err(_) => self.fail(
                &payload.function,
                NotesError::ConfirmationFailed(format!(
                    "{hash}: not confirmed within {limit:?}"
                )),
            ),
        }
    }

    /// Calls `add_note` on-chain; the local note is appended only once the
    /// ledger confirms.
    pub async fn add_note(&self) -> TransactionOutcome {
        let function = EntryFunctionId::add_note(self.config.module_address.clone());
        let outcome = self.submit(function, None, None).await;
        if !outcome.is_confirmed() {
            return outcome;
        }

        match self.notes.append(Note::new_editable()).await {
            Ok(notes) => {
                let _ = self.events.send(ClientEvent::NotesChanged(notes));
            }
            Err(err) => {
                // The note exists on-chain and in memory; only the snapshot lagged.
                error!(error = %err, "notes: failed to persist confirmed note");
                let _ = self.events.send(ClientEvent::NotesChanged(self.notes.notes().await));
                let _ = self.events.send(ClientEvent::PersistFailed(err));
            }
        }
        outcome
    }

    /// Provisions the account's on-chain collection. No local effect; a
    /// repeat call failing with "already initialized" is benign.
    pub async fn initialize_collection(&self) -> TransactionOutcome {
        let function = EntryFunctionId::initialize_collection(self.config.module_address.clone());
        self.submit(function, None, None).await
    }

    fn fail(&self, function: &EntryFunctionId, err: NotesError) -> TransactionOutcome {
        if err.is_already_initialized() {
            info!(target_function = %function, reason = %err, "tx: rejected as already applied");
        } else {
            warn!(target_function = %function, reason = %err, "tx: failed");
        }
        let _ = self.events.send(ClientEvent::TransactionFailed {
            function: function.clone(),
            error: err.clone(),
        });
        TransactionOutcome::Failed(err)
    }
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
