use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use ledger_integration::{LedgerClient, WalletProvider};
use shared::{
    domain::{AccountAddress, NoteCollection, WalletSession},
    error::NotesError,
    protocol::{EntryFunctionId, TransactionHash, TransactionOutcome},
};
use storage::KeyValueStore;
use tokio::sync::broadcast;
use tracing::{info, warn};

pub mod note_store;
pub mod orchestrator;
pub mod session;

pub use note_store::NoteStore;
pub use orchestrator::{OrchestratorConfig, TransactionOrchestrator};
pub use session::WalletSessionManager;

#[cfg(test)]
pub(crate) mod test_support;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Observability sink for view layers. Sends never fail the core; having no
/// subscriber is normal.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    WalletConnected(AccountAddress),
    WalletDisconnected,
    WalletConnectionFailed(String),
    TransactionSubmitted {
        function: EntryFunctionId,
        hash: TransactionHash,
    },
    TransactionConfirmed {
        function: EntryFunctionId,
        hash: TransactionHash,
    },
    TransactionFailed {
        function: EntryFunctionId,
        error: NotesError,
    },
    NotesChanged(NoteCollection),
    PersistFailed(NotesError),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub orchestrator: OrchestratorConfig,
    pub connect_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(module_address: AccountAddress) -> Self {
        Self {
            orchestrator: OrchestratorConfig::new(module_address),
            connect_timeout: None,
        }
    }
}

/// Read-only state handed to the view layer.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub notes: NoteCollection,
    pub session: WalletSession,
    pub submission_pending: bool,
}

impl ViewState {
    pub fn address(&self) -> &str {
        self.session.display_address()
    }
}

/// The only mutation entry points the view layer gets.
#[async_trait]
pub trait NotesHandle: Send + Sync {
    async fn connect_wallet(&self) -> Option<AccountAddress>;
    async fn disconnect_wallet(&self);
    async fn add_note_on_chain(&self) -> TransactionOutcome;
    async fn initialize_collection(&self) -> TransactionOutcome;
    async fn on_delete(&self, index: usize) -> Result<(), NotesError>;
    async fn view_state(&self) -> ViewState;
    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent>;
}

pub struct NotesClient {
    notes: Arc<NoteStore>,
    session: Arc<WalletSessionManager>,
    orchestrator: TransactionOrchestrator,
    submission_pending: AtomicBool,
    events: broadcast::Sender<ClientEvent>,
}

/// Re-enables the add trigger when the submission ends, however it ends.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl NotesClient {
    /// Hydrates the note store and wires the collaborators together.
    pub async fn initialize(
        store: Arc<dyn KeyValueStore>,
        wallet: Arc<dyn WalletProvider>,
        ledger: Arc<dyn LedgerClient>,
        config: ClientConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let notes = Arc::new(NoteStore::open(store).await);
        let session = Arc::new(WalletSessionManager::new(
            wallet,
            config.connect_timeout,
            events.clone(),
        ));
        let orchestrator = TransactionOrchestrator::new(
            Arc::clone(&session),
            ledger,
            Arc::clone(&notes),
            config.orchestrator,
            events.clone(),
        );
        Arc::new(Self {
            notes,
            session,
            orchestrator,
            submission_pending: AtomicBool::new(false),
            events,
        })
    }

    pub fn is_submission_pending(&self) -> bool {
        self.submission_pending.load(Ordering::Acquire)
    }
}

#[async_trait]
impl NotesHandle for NotesClient {
    async fn connect_wallet(&self) -> Option<AccountAddress> {
        // Failure is already logged and published by the session manager.
        self.session.connect().await.ok()
    }

    async fn disconnect_wallet(&self) {
        self.session.disconnect().await;
    }

    async fn add_note_on_chain(&self) -> TransactionOutcome {
        if self
            .submission_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("notes: add ignored while a submission is pending");
            return TransactionOutcome::Failed(NotesError::SubmissionPending);
        }
        let _pending = PendingGuard(&self.submission_pending);
        self.orchestrator.add_note().await
    }

    async fn initialize_collection(&self) -> TransactionOutcome {
        self.orchestrator.initialize_collection().await
    }

    async fn on_delete(&self, index: usize) -> Result<(), NotesError> {
        match self.notes.remove_at(index).await {
            Ok(notes) => {
                let _ = self.events.send(ClientEvent::NotesChanged(notes));
                Ok(())
            }
            Err(err @ NotesError::Storage(_)) => {
                warn!(error = %err, "notes: delete applied but snapshot not persisted");
                let _ = self
                    .events
                    .send(ClientEvent::NotesChanged(self.notes.notes().await));
                let _ = self.events.send(ClientEvent::PersistFailed(err.clone()));
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    async fn view_state(&self) -> ViewState {
        ViewState {
            notes: self.notes.notes().await,
            session: self.session.session().await,
            submission_pending: self.is_submission_pending(),
        }
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
