//! Node REST adapter: raw signed-transaction submission and hash polling.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use serde::Deserialize;
use shared::protocol::{TransactionConfirmation, TransactionHash, TransactionPayload};
use tracing::debug;
use url::Url;

use crate::{LedgerClient, TransactionSigner};

pub const SIGNED_TRANSACTION_CONTENT_TYPE: &str = "application/x.aptos.signed_transaction+bcs";
pub const DEFAULT_NODE_URL: &str = "https://testnet.aptoslabs.com";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct LedgerApiError {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    vm_error_code: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PendingTransactionResponse {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionStatusResponse {
    #[serde(rename = "type")]
    kind: String,
    hash: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
}

pub struct RestLedgerClient {
    http: Client,
    node_url: Url,
    poll_interval: Duration,
}

impl RestLedgerClient {
    pub fn new(node_url: Url) -> Self {
        Self {
            http: Client::new(),
            node_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.node_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("node url '{}' cannot be a base", self.node_url))?
            .pop_if_empty()
            .push("v1")
            .extend(segments);
        Ok(url)
    }
}

async fn api_failure(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<LedgerApiError>(&body) {
        Ok(api) => {
            let code = api.error_code.unwrap_or_else(|| "unknown".to_string());
            match api.vm_error_code {
                Some(vm) => anyhow!("{status}: {code} (vm error {vm}): {}", api.message),
                None => anyhow!("{status}: {code}: {}", api.message),
            }
        }
        Err(_) if body.is_empty() => anyhow!("{status}"),
        Err(_) => anyhow!("{status}: {body}"),
    }
}

#[async_trait]
impl LedgerClient for RestLedgerClient {
    async fn submit_transaction(
        &self,
        signer: &dyn TransactionSigner,
        payload: &TransactionPayload,
    ) -> Result<TransactionHash> {
        let signed = signer
            .sign_transaction(payload)
            .await
            .with_context(|| format!("signer {} rejected {}", signer.address(), payload.function))?;

        let res = self
            .http
            .post(self.endpoint(&["transactions"])?)
            .header(CONTENT_TYPE, SIGNED_TRANSACTION_CONTENT_TYPE)
            .body(signed.bytes)
            .send()
            .await
            .context("failed to reach ledger node")?;
        if !res.status().is_success() {
            return Err(api_failure(res).await);
        }
        let body: PendingTransactionResponse = res
            .json()
            .await
            .context("malformed submission response")?;
        debug!(hash = %body.hash, function = %payload.function, "ledger: transaction accepted");
        Ok(TransactionHash(body.hash))
    }

    async fn wait_for_transaction(
        &self,
        hash: &TransactionHash,
    ) -> Result<TransactionConfirmation> {
        let url = self.endpoint(&["transactions", "by_hash", hash.as_str()])?;
        loop {
            let res = self
                .http
                .get(url.clone())
                .send()
                .await
                .context("failed to reach ledger node")?;

            if res.status() == StatusCode::NOT_FOUND {
                debug!(%hash, "ledger: transaction not yet visible");
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }
            if !res.status().is_success() {
                return Err(api_failure(res).await);
            }

            let status: TransactionStatusResponse = res
                .json()
                .await
                .context("malformed transaction status response")?;
            if status.kind == "pending_transaction" {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let vm_status = status.vm_status.unwrap_or_default();
            if status.success != Some(true) {
                bail!("transaction {} failed: {vm_status}", status.hash);
            }
            return Ok(TransactionConfirmation {
                hash: TransactionHash(status.hash),
                version: status.version.and_then(|v| v.parse().ok()),
                vm_status,
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
