//! JSON-RPC envelope and the slices of Solana RPC payloads the oracle reads.
//!
//! Only fields that are inspected are modelled; everything else in the
//! payloads is ignored by serde. Extraction logic lives in free functions so
//! it can be tested against captured responses without a network.

use std::collections::BTreeSet;

use mintgate_types::{Lamports, Timestamp, TokenId, WalletAddress};
use serde::{Deserialize, Serialize};

use crate::{EligibleSet, OracleError};

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl<T> RpcResponse<T> {
    pub fn into_result(self, method: &str) -> Result<T, OracleError> {
        if let Some(err) = self.error {
            return Err(OracleError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| OracleError::InvalidResponse(format!("{method}: missing result")))
    }

    /// Like [`into_result`](Self::into_result), but a `null` result is `None`
    /// rather than an error.
    pub fn into_optional(self) -> Result<Option<T>, OracleError> {
        match self.error {
            Some(err) => Err(OracleError::Rpc {
                code: err.code,
                message: err.message,
            }),
            None => Ok(self.result),
        }
    }
}

/// Results wrapped in `{context, value}`.
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub value: T,
}

// ── getTokenAccountsByOwner / getAccountInfo (jsonParsed) ───────────────

#[derive(Debug, Deserialize)]
pub struct KeyedAccount {
    pub pubkey: String,
    pub account: ParsedAccount,
}

#[derive(Debug, Deserialize)]
pub struct ParsedAccount {
    pub data: AccountData,
}

/// `data` is either `{parsed, program}` or a raw `[base64, encoding]` pair
/// when the node could not parse the account.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AccountData {
    Parsed { parsed: ParsedTokenAccount },
    Raw(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct ParsedTokenAccount {
    pub info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountInfo {
    pub mint: String,
    pub owner: String,
    pub token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
pub struct TokenAmount {
    pub amount: String,
    pub decimals: u8,
}

impl TokenAmount {
    /// Exactly one indivisible unit, i.e. the account holds the NFT.
    pub fn is_single_nft(&self) -> bool {
        self.decimals == 0 && self.amount == "1"
    }
}

/// Mints from `eligible` held (amount 1, 0 decimals) by the given token
/// accounts.
pub fn eligible_mints(accounts: &[KeyedAccount], eligible: &EligibleSet) -> BTreeSet<TokenId> {
    accounts
        .iter()
        .filter_map(|keyed| match &keyed.account.data {
            AccountData::Parsed { parsed } if parsed.info.token_amount.is_single_nft() => {
                Some(TokenId::new(parsed.info.mint.as_str()))
            }
            _ => None,
        })
        .filter(|mint| eligible.contains(mint))
        .collect()
}

/// Owner wallet of a parsed token account.
pub fn token_account_owner(account: &ParsedAccount) -> Result<WalletAddress, OracleError> {
    match &account.data {
        AccountData::Parsed { parsed } => WalletAddress::parse(&parsed.info.owner).map_err(|e| {
            OracleError::InvalidResponse(format!("token account owner {}: {e}", parsed.info.owner))
        }),
        AccountData::Raw(_) => Err(OracleError::InvalidResponse(
            "token account data was not parsed".into(),
        )),
    }
}

// ── getTokenLargestAccounts ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LargestAccount {
    pub address: String,
    pub amount: String,
}

/// The token account holding the single unit of an NFT, if any.
pub fn holder_account(accounts: &[LargestAccount]) -> Option<&str> {
    accounts
        .iter()
        .find(|a| a.amount == "1")
        .map(|a| a.address.as_str())
}

// ── getSignaturesForAddress / getTransaction ────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub block_time: Option<i64>,
}

impl SignatureInfo {
    /// Successful and not older than `not_before`. Entries without a block
    /// time are kept; the transaction itself is checked later.
    pub fn is_candidate(&self, not_before: Timestamp) -> bool {
        if self.err.is_some() {
            return false;
        }
        match self.block_time {
            Some(t) => t >= 0 && t as u64 >= not_before.as_secs(),
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
    pub transaction: TransactionBody,
}

#[derive(Debug, Deserialize)]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionBody {
    pub message: TransactionMessage,
}

#[derive(Debug, Deserialize)]
pub struct TransactionMessage {
    #[serde(default)]
    pub instructions: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ParsedInstruction {
    program: String,
    parsed: ParsedInstructionBody,
}

#[derive(Debug, Deserialize)]
struct ParsedInstructionBody {
    #[serde(rename = "type")]
    kind: String,
    info: TransferInfo,
}

#[derive(Debug, Deserialize)]
struct TransferInfo {
    source: String,
    destination: String,
    lamports: u64,
}

/// Whether `tx` succeeded, is not older than `not_before`, and contains a
/// system transfer of exactly `amount` from `address` to itself.
pub fn is_self_transfer(
    tx: &ParsedTransaction,
    address: &WalletAddress,
    amount: Lamports,
    not_before: Timestamp,
) -> bool {
    if tx.meta.as_ref().is_some_and(|m| m.err.is_some()) {
        return false;
    }
    if let Some(t) = tx.block_time {
        if t < 0 || (t as u64) < not_before.as_secs() {
            return false;
        }
    }
    tx.transaction.message.instructions.iter().any(|ix| {
        // Instructions the node could not parse have no `parsed` object.
        let Ok(ix) = serde_json::from_value::<ParsedInstruction>(ix.clone()) else {
            return false;
        };
        ix.program == "system"
            && ix.parsed.kind == "transfer"
            && ix.parsed.info.source == address.as_str()
            && ix.parsed.info.destination == address.as_str()
            && ix.parsed.info.lamports == amount.raw()
    })
}
