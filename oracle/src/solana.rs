//! [`LedgerOracle`] backed by a Solana JSON-RPC endpoint.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mintgate_types::{Lamports, Timestamp, TokenId, WalletAddress};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::rpc::{
    self, KeyedAccount, LargestAccount, ParsedAccount, ParsedTransaction, RpcRequest,
    RpcResponse, SignatureInfo, WithContext,
};
use crate::{EligibleSet, LedgerOracle, OracleError};

/// SPL Token program id.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Public mainnet endpoint, used when none is configured.
pub const MAINNET_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// How many recent signatures of the claimed wallet are inspected per poll.
const SIGNATURE_SCAN_LIMIT: u32 = 25;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const COMMITMENT: &str = "confirmed";

pub struct SolanaRpcOracle {
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl SolanaRpcOracle {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<RpcResponse<T>, OracleError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response = self.http_client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(OracleError::Http(response.status().as_u16()));
        }
        response
            .json::<RpcResponse<T>>()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("{method}: {e}")))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, OracleError> {
        self.send(method, params).await?.into_result(method)
    }

    async fn recent_signatures(
        &self,
        address: &WalletAddress,
    ) -> Result<Vec<SignatureInfo>, OracleError> {
        self.call(
            "getSignaturesForAddress",
            json!([address.as_str(), {"limit": SIGNATURE_SCAN_LIMIT, "commitment": COMMITMENT}]),
        )
        .await
    }

    async fn transaction(&self, signature: &str) -> Result<Option<ParsedTransaction>, OracleError> {
        self.send::<ParsedTransaction>(
            "getTransaction",
            json!([signature, {
                "encoding": "jsonParsed",
                "commitment": COMMITMENT,
                "maxSupportedTransactionVersion": 0
            }]),
        )
        .await?
        .into_optional()
    }
}

#[async_trait]
impl LedgerOracle for SolanaRpcOracle {
    async fn owned_eligible_tokens(
        &self,
        owner: &WalletAddress,
        eligible: &EligibleSet,
    ) -> Result<BTreeSet<TokenId>, OracleError> {
        let accounts: WithContext<Vec<KeyedAccount>> = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.as_str(),
                    {"programId": TOKEN_PROGRAM_ID},
                    {"encoding": "jsonParsed", "commitment": COMMITMENT}
                ]),
            )
            .await?;
        let mints = rpc::eligible_mints(&accounts.value, eligible);
        tracing::debug!(
            owner = %owner,
            token_accounts = accounts.value.len(),
            eligible = mints.len(),
            "resolved owned eligible tokens"
        );
        Ok(mints)
    }

    async fn current_owner(&self, token: &TokenId) -> Result<WalletAddress, OracleError> {
        let largest: WithContext<Vec<LargestAccount>> = self
            .call(
                "getTokenLargestAccounts",
                json!([token.as_str(), {"commitment": COMMITMENT}]),
            )
            .await?;
        let holder = rpc::holder_account(&largest.value)
            .ok_or_else(|| OracleError::NotFound(format!("no holder account for mint {token}")))?
            .to_string();

        let info: WithContext<Option<ParsedAccount>> = self
            .call(
                "getAccountInfo",
                json!([holder, {"encoding": "jsonParsed", "commitment": COMMITMENT}]),
            )
            .await?;
        let account = info
            .value
            .ok_or_else(|| OracleError::NotFound(format!("token account {holder}")))?;
        rpc::token_account_owner(&account)
    }

    async fn has_transfer_occurred(
        &self,
        address: &WalletAddress,
        amount: Lamports,
        not_before: Timestamp,
    ) -> Result<bool, OracleError> {
        let signatures = self.recent_signatures(address).await?;
        for sig in signatures.iter().filter(|s| s.is_candidate(not_before)) {
            // Not yet visible at this commitment; the next poll will retry.
            let Some(tx) = self.transaction(&sig.signature).await? else {
                continue;
            };
            if rpc::is_self_transfer(&tx, address, amount, not_before) {
                tracing::debug!(address = %address, signature = %sig.signature, "matched challenge transfer");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let oracle = SolanaRpcOracle::new(MAINNET_RPC_URL);
        assert_eq!(oracle.url(), MAINNET_RPC_URL);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transient_error() {
        // Port 9 (discard) on localhost is not an HTTP server.
        let oracle = SolanaRpcOracle::with_timeout("http://127.0.0.1:9", Duration::from_millis(500));
        let err = oracle
            .current_owner(&TokenId::new("Mint"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OracleError::Unreachable(_) | OracleError::InvalidResponse(_)
        ));
    }
}
