//! Letter Ledger Library
//!
//! Settlement collaborator for Letter game rooms:
//! - `Ledger` trait for stake escrow (lock, settle, refund)
//! - `MockLedger` in-memory implementation for tests and local play
//! - `RpcLedger` JSON-RPC client for a real settlement node

pub mod ledger;

pub use ledger::{
    EscrowStatus, Ledger, LedgerError, MockLedger, RpcLedger, SettlementReceipt, StakeReceipt,
};
