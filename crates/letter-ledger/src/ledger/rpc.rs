//! RPC client for a settlement node.
//!
//! This module provides a real implementation of `Ledger` that communicates
//! with a settlement node via JSON-RPC.

use super::traits::{Ledger, LedgerError, SettlementReceipt, StakeReceipt};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Escrow status as reported by the settlement node
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum NodeEscrowStatus {
    /// Stakes locked
    Open,
    /// Paid out
    Paid,
    /// Returned to stakers
    Refunded,
}

/// RPC client for a settlement node
pub struct RpcLedger {
    /// HTTP client
    client: Client,
    /// Settlement node RPC URL
    rpc_url: String,
}

impl RpcLedger {
    /// Create a new RPC client
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            rpc_url: rpc_url.into(),
        }
    }

    /// Make a JSON-RPC call
    async fn call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": [params]
        });

        tracing::debug!(method, "ledger rpc request");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::NetworkError(e.to_string()))?;

        let result: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::NetworkError(e.to_string()))?;

        if let Some(error) = result.get("error") {
            let msg = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown error");
            return Err(map_node_error(msg));
        }

        result
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::NetworkError("No result in response".to_string()))
    }
}

/// Map well-known node error messages onto typed errors
fn map_node_error(msg: &str) -> LedgerError {
    match msg {
        "already settled" => LedgerError::AlreadySettled,
        "already refunded" => LedgerError::AlreadyRefunded,
        m if m.starts_with("insufficient funds") => {
            LedgerError::InsufficientFunds(m.trim_start_matches("insufficient funds").trim().to_string())
        }
        m => LedgerError::NetworkError(m.to_string()),
    }
}

fn parse_amount(value: &Value, field: &str) -> Result<u64, LedgerError> {
    let raw = value
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| LedgerError::NetworkError(format!("No {} in response", field)))?;
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| LedgerError::NetworkError(e.to_string()))
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn lock_stake(
        &self,
        room: Uuid,
        player: &str,
        amount: u64,
    ) -> Result<StakeReceipt, LedgerError> {
        let params = json!({
            "escrow_id": room.to_string(),
            "account": player,
            "amount": format!("0x{:x}", amount),
        });

        self.call("lock_stake", params).await?;

        Ok(StakeReceipt {
            room,
            player: player.to_string(),
            amount,
        })
    }

    async fn settle(&self, room: Uuid, winner: &str) -> Result<SettlementReceipt, LedgerError> {
        let params = json!({
            "escrow_id": room.to_string(),
            "winner": winner,
        });

        let result = self.call("settle_escrow", params).await?;
        let payout = parse_amount(&result, "payout")?;

        Ok(SettlementReceipt {
            room,
            winner: winner.to_string(),
            payout,
        })
    }

    async fn refund(&self, room: Uuid) -> Result<u64, LedgerError> {
        let params = json!({
            "escrow_id": room.to_string(),
        });

        let result = self.call("refund_escrow", params).await?;

        let status: Option<NodeEscrowStatus> = result
            .get("status")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        match status {
            Some(NodeEscrowStatus::Paid) => Err(LedgerError::AlreadySettled),
            _ => parse_amount(&result, "refunded"),
        }
    }
}
