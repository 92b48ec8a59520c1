//! Ledger client abstraction.

mod mock;
mod rpc;
mod traits;

pub use mock::MockLedger;
pub use rpc::RpcLedger;
pub use traits::{EscrowStatus, Ledger, LedgerError, SettlementReceipt, StakeReceipt};
