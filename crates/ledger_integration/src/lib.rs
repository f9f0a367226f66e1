use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::AccountAddress,
    protocol::{SignedTransaction, TransactionConfirmation, TransactionHash, TransactionPayload},
};

pub mod rest;
pub mod wallet_bridge;

pub use rest::RestLedgerClient;
pub use wallet_bridge::HttpWalletProvider;

/// Identity able to authorize a payload on behalf of `address`.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> &AccountAddress;
    async fn sign_transaction(&self, payload: &TransactionPayload) -> Result<SignedTransaction>;
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Suspends until the wallet approves or rejects the connection.
    async fn connect(&self) -> Result<AccountAddress>;
    async fn disconnect(&self) -> Result<()>;
    async fn sign_transaction(
        &self,
        sender: &AccountAddress,
        payload: &TransactionPayload,
    ) -> Result<SignedTransaction>;
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn submit_transaction(
        &self,
        signer: &dyn TransactionSigner,
        payload: &TransactionPayload,
    ) -> Result<TransactionHash>;
    /// Resolves once the transaction leaves the pending state. Unbounded;
    /// callers impose their own deadline.
    async fn wait_for_transaction(&self, hash: &TransactionHash)
        -> Result<TransactionConfirmation>;
}

/// Signer backed by a connected wallet session.
pub struct WalletSigner {
    provider: Arc<dyn WalletProvider>,
    address: AccountAddress,
}

impl WalletSigner {
    pub fn new(provider: Arc<dyn WalletProvider>, address: AccountAddress) -> Self {
        Self { provider, address }
    }
}

#[async_trait]
impl TransactionSigner for WalletSigner {
    fn address(&self) -> &AccountAddress {
        &self.address
    }

    async fn sign_transaction(&self, payload: &TransactionPayload) -> Result<SignedTransaction> {
        self.provider.sign_transaction(&self.address, payload).await
    }
}

pub struct MissingWalletProvider;

#[async_trait]
impl WalletProvider for MissingWalletProvider {
    async fn connect(&self) -> Result<AccountAddress> {
        Err(anyhow!("no wallet provider is configured"))
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn sign_transaction(
        &self,
        _sender: &AccountAddress,
        _payload: &TransactionPayload,
    ) -> Result<SignedTransaction> {
        Err(anyhow!("no wallet provider is configured"))
    }
}
