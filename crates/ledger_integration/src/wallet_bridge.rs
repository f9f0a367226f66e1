//! Bridge to an external signer process exposing a small HTTP surface.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    domain::AccountAddress,
    protocol::{SignedTransaction, TransactionPayload},
};
use tracing::info;
use url::Url;

use crate::WalletProvider;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub address: AccountAddress,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignRequest {
    pub sender: AccountAddress,
    pub payload: TransactionPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    pub signed_transaction_b64: String,
}

pub struct HttpWalletProvider {
    http: Client,
    signer_url: Url,
}

impl HttpWalletProvider {
    pub fn new(signer_url: Url) -> Self {
        Self {
            http: Client::new(),
            signer_url,
        }
    }

    fn endpoint(&self, name: &str) -> Result<Url> {
        let mut url = self.signer_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("signer url '{}' cannot be a base", self.signer_url))?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn connect(&self) -> Result<AccountAddress> {
        let res = self
            .http
            .post(self.endpoint("connect")?)
            .send()
            .await
            .context("failed to reach signer")?
            .error_for_status()
            .context("signer rejected connection")?;
        let body: ConnectResponse = res.json().await.context("malformed connect response")?;
        info!(address = %body.address, "wallet: signer approved connection");
        Ok(body.address)
    }

    async fn disconnect(&self) -> Result<()> {
        self.http
            .post(self.endpoint("disconnect")?)
            .send()
            .await
            .context("failed to reach signer")?
            .error_for_status()
            .context("signer rejected disconnect")?;
        Ok(())
    }

    async fn sign_transaction(
        &self,
        sender: &AccountAddress,
        payload: &TransactionPayload,
    ) -> Result<SignedTransaction> {
        let res = self
            .http
            .post(self.endpoint("sign")?)
            .json(&SignRequest {
                sender: sender.clone(),
                payload: payload.clone(),
            })
            .send()
            .await
            .context("failed to reach signer")?
            .error_for_status()
            .context("signer refused to sign")?;
        let body: SignResponse = res.json().await.context("malformed sign response")?;
        let bytes = STANDARD
            .decode(body.signed_transaction_b64.as_bytes())
            .context("signed transaction is not valid base64")?;
        Ok(SignedTransaction { bytes })
    }
}

#[cfg(test)]
#[path = "tests/wallet_bridge_tests.rs"]
mod tests;
