use std::{collections::VecDeque, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ledger_integration::{LedgerClient, TransactionSigner, WalletProvider};
use shared::{
    domain::AccountAddress,
    protocol::{
        SignedTransaction, TransactionConfirmation, TransactionHash, TransactionPayload,
        DEFAULT_MODULE_ADDRESS,
    },
};
use storage::{KeyValueStore, MemoryStorage};
use tokio::sync::Mutex;

pub(crate) type CallLog = Arc<Mutex<Vec<String>>>;

pub(crate) fn module_address() -> AccountAddress {
    DEFAULT_MODULE_ADDRESS.parse().expect("module address")
}

pub(crate) fn alice() -> AccountAddress {
    "0xa11ce".parse().expect("address")
}

pub(crate) struct MockWallet {
    pub connect_error: Option<String>,
    pub connect_delay: Option<Duration>,
    pub disconnect_error: Option<String>,
    /// Per-call `(delay, rejection)` overrides, consumed in call order.
    pub connect_steps: Arc<Mutex<VecDeque<(Duration, Option<String>)>>>,
    pub connect_calls: Arc<Mutex<u32>>,
    pub disconnect_calls: Arc<Mutex<u32>>,
    pub signed: Arc<Mutex<Vec<(AccountAddress, TransactionPayload)>>>,
}

impl MockWallet {
    pub fn approving() -> Self {
        Self {
            connect_error: None,
            connect_delay: None,
            disconnect_error: None,
            connect_steps: Arc::new(Mutex::new(VecDeque::new())),
            connect_calls: Arc::new(Mutex::new(0)),
            disconnect_calls: Arc::new(Mutex::new(0)),
            signed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn rejecting(reason: impl Into<String>) -> Self {
        let mut wallet = Self::approving();
        wallet.connect_error = Some(reason.into());
        wallet
    }

    pub fn with_connect_steps(steps: Vec<(Duration, Option<String>)>) -> Self {
        let mut wallet = Self::approving();
        wallet.connect_steps = Arc::new(Mutex::new(steps.into()));
        wallet
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn connect(&self) -> Result<AccountAddress> {
        *self.connect_calls.lock().await += 1;
        let (delay, error) = match self.connect_steps.lock().await.pop_front() {
            Some((delay, error)) => (Some(delay), error),
            None => (self.connect_delay, self.connect_error.clone()),
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(reason) => Err(anyhow!(reason)),
            None => Ok(alice()),
        }
    }

    async fn disconnect(&self) -> Result<()> {
        *self.disconnect_calls.lock().await += 1;
        match &self.disconnect_error {
            Some(reason) => Err(anyhow!(reason.clone())),
            None => Ok(()),
        }
    }

    async fn sign_transaction(
        &self,
        sender: &AccountAddress,
        payload: &TransactionPayload,
    ) -> Result<SignedTransaction> {
        self.signed
            .lock()
            .await
            .push((sender.clone(), payload.clone()));
        Ok(SignedTransaction {
            bytes: b"signed".to_vec(),
        })
    }
}

pub(crate) struct MockLedger {
    pub submit_error: Option<String>,
    pub wait_error: Option<String>,
    pub wait_delay: Option<Duration>,
    pub log: CallLog,
    pub payloads: Arc<Mutex<Vec<TransactionPayload>>>,
}

impl MockLedger {
    pub fn confirming(log: CallLog) -> Self {
        Self {
            submit_error: None,
            wait_error: None,
            wait_delay: None,
            log,
            payloads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_submit(log: CallLog, reason: impl Into<String>) -> Self {
        let mut ledger = Self::confirming(log);
        ledger.submit_error = Some(reason.into());
        ledger
    }

    pub fn failing_confirmation(log: CallLog, reason: impl Into<String>) -> Self {
        let mut ledger = Self::confirming(log);
        ledger.wait_error = Some(reason.into());
        ledger
    }

    pub async fn calls(&self, name: &str) -> usize {
        self.log
            .lock()
            .await
            .iter()
            .filter(|entry| entry.as_str() == name)
            .count()
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn submit_transaction(
        &self,
        signer: &dyn TransactionSigner,
        payload: &TransactionPayload,
    ) -> Result<TransactionHash> {
        self.log.lock().await.push("submit".to_string());
        self.payloads.lock().await.push(payload.clone());
        if let Some(reason) = &self.submit_error {
            return Err(anyhow!(reason.clone()));
        }
        signer.sign_transaction(payload).await?;
        Ok(TransactionHash("0xbeef".to_string()))
    }

    async fn wait_for_transaction(
        &self,
        hash: &TransactionHash,
    ) -> Result<TransactionConfirmation> {
        self.log.lock().await.push("wait".to_string());
        if let Some(delay) = self.wait_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.wait_error {
            return Err(anyhow!(reason.clone()));
        }
        Ok(TransactionConfirmation {
            hash: hash.clone(),
            version: Some(1),
            vm_status: "Executed successfully".to_string(),
        })
    }
}

/// Memory store that records every write in the shared call log.
pub(crate) struct RecordingStore {
    inner: MemoryStorage,
    pub log: CallLog,
    pub fail_writes: bool,
}

impl RecordingStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: MemoryStorage::new(),
            log,
            fail_writes: false,
        }
    }

    pub fn with_snapshot(log: CallLog, snapshot: &str) -> Self {
        Self {
            inner: MemoryStorage::with_entry(crate::note_store::NOTES_STORAGE_KEY, snapshot),
            log,
            fail_writes: false,
        }
    }

    pub async fn writes(&self) -> usize {
        self.log
            .lock()
            .await
            .iter()
            .filter(|entry| entry.as_str() == "persist")
            .count()
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.log.lock().await.push("persist".to_string());
        if self.fail_writes {
            return Err(anyhow!("disk full"));
        }
        self.inner.set(key, value).await
    }
}

pub(crate) fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}
