use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use ledger_integration::{WalletProvider, WalletSigner};
use shared::{
    domain::{AccountAddress, ConnectionStatus, WalletSession},
    error::NotesError,
};
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::ClientEvent;

/// Owns the wallet connection lifecycle. Other components read the session,
/// only this type writes it.
pub struct WalletSessionManager {
    provider: Arc<dyn WalletProvider>,
    slot: RwLock<SessionSlot>,
    connect_timeout: Option<Duration>,
    events: broadcast::Sender<ClientEvent>,
}

/// Every connect and disconnect bumps `attempt`; a connect only applies its
/// result if nothing else ran in between.
#[derive(Default)]
struct SessionSlot {
    session: WalletSession,
    attempt: u64,
}

impl WalletSessionManager {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        connect_timeout: Option<Duration>,
        events: broadcast::Sender<ClientEvent>,
    ) -> Self {
        Self {
            provider,
            slot: RwLock::new(SessionSlot::default()),
            connect_timeout,
            events,
        }
    }

    /// Waits for the wallet to approve. Any failure, including a timeout,
    /// leaves the session disconnected and comes back as `ConnectionFailed`.
    /// A result that arrives after a disconnect or a newer connect is
    /// discarded.
    pub async fn connect(&self) -> Result<AccountAddress, NotesError> {
        let attempt = {
            let mut slot = self.slot.write().await;
            slot.attempt += 1;
            slot.session = WalletSession::connecting();
            slot.attempt
        };

        let result = match self.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.connect())
                .await
                .unwrap_or_else(|_| Err(anyhow!("wallet did not respond within {limit:?}"))),
            None => self.provider.connect().await,
        };

        let mut slot = self.slot.write().await;
        if slot.attempt != attempt {
            let session_dropped = slot.session.status == ConnectionStatus::Disconnected;
            drop(slot);
            return Err(self.discard_stale(result.is_ok() && session_dropped).await);
        }

        match result {
            Ok(address) => {
                slot.session = WalletSession::connected(address.clone());
                drop(slot);
                info!(%address, "wallet: connected");
                let _ = self
                    .events
                    .send(ClientEvent::WalletConnected(address.clone()));
                Ok(address)
            }
            Err(err) => {
                slot.session = WalletSession::disconnected();
                drop(slot);
                let reason = format!("{err:#}");
                warn!(%reason, "wallet: connection failed");
                let _ = self
                    .events
                    .send(ClientEvent::WalletConnectionFailed(reason.clone()));
                Err(NotesError::ConnectionFailed(reason))
            }
        }
    }

    async fn discard_stale(&self, release_provider: bool) -> NotesError {
        info!("wallet: connect result arrived after the session moved on, discarding");
        if release_provider {
            if let Err(err) = self.provider.disconnect().await {
                warn!("wallet: releasing stale connection failed: {err:#}");
            }
        }
        NotesError::ConnectionFailed("superseded by a later connect or disconnect".to_string())
    }

    /// Always succeeds locally; transport errors are only logged.
    pub async fn disconnect(&self) {
        let previous = {
            let mut slot = self.slot.write().await;
            slot.attempt += 1;
            std::mem::take(&mut slot.session)
        };
        if let Err(err) = self.provider.disconnect().await {
            warn!("wallet: provider disconnect failed, session cleared anyway: {err:#}");
        }
        if let Some(address) = previous.address {
            info!(%address, "wallet: disconnected");
        }
        let _ = self.events.send(ClientEvent::WalletDisconnected);
    }

    pub async fn current_account(&self) -> Option<AccountAddress> {
        let slot = self.slot.read().await;
        if slot.session.is_connected() {
            slot.session.address.clone()
        } else {
            None
        }
    }

    pub async fn session(&self) -> WalletSession {
        self.slot.read().await.session.clone()
    }

    pub(crate) async fn current_signer(&self) -> Option<WalletSigner> {
        let address = self.current_account().await?;
        Some(WalletSigner::new(Arc::clone(&self.provider), address))
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
