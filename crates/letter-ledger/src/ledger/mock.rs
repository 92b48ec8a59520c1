//! Mock ledger for testing.

use super::traits::{EscrowStatus, Ledger, LedgerError, SettlementReceipt, StakeReceipt};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// State of a mock escrow
#[derive(Clone, Debug)]
struct MockEscrow {
    stakes: Vec<(String, u64)>,
    status: EscrowStatus,
}

impl MockEscrow {
    fn pot(&self) -> u64 {
        self.stakes.iter().map(|(_, amount)| amount).sum()
    }
}

/// In-memory ledger for testing
///
/// Unknown players are funded with `initial_balance` on first touch.
#[derive(Clone)]
pub struct MockLedger {
    /// Map of player -> spendable balance
    balances: Arc<Mutex<HashMap<String, u64>>>,
    /// Map of room -> escrow state
    escrows: Arc<Mutex<HashMap<Uuid, MockEscrow>>>,
    /// Settlements still to be rejected as if the node were down
    settle_failures: Arc<AtomicUsize>,
    initial_balance: u64,
}

impl MockLedger {
    /// Create a new mock ledger funding every new player with `initial_balance`
    pub fn new(initial_balance: u64) -> Self {
        Self {
            balances: Arc::new(Mutex::new(HashMap::new())),
            escrows: Arc::new(Mutex::new(HashMap::new())),
            settle_failures: Arc::new(AtomicUsize::new(0)),
            initial_balance,
        }
    }

    /// Set a player's balance explicitly
    pub fn set_balance(&self, player: &str, amount: u64) {
        self.balances
            .lock()
            .unwrap()
            .insert(player.to_string(), amount);
    }

    /// Make the next `count` settlements fail with a network error
    pub fn fail_settlements(&self, count: usize) {
        self.settle_failures.store(count, Ordering::SeqCst);
    }

    /// Spendable balance of a player
    pub fn balance_of(&self, player: &str) -> u64 {
        *self
            .balances
            .lock()
            .unwrap()
            .get(player)
            .unwrap_or(&self.initial_balance)
    }

    /// Escrow status for a room (for testing)
    pub fn escrow_status(&self, room: Uuid) -> Option<EscrowStatus> {
        self.escrows.lock().unwrap().get(&room).map(|e| e.status)
    }

    /// Amount currently locked for a room (for testing)
    pub fn escrow_pot(&self, room: Uuid) -> u64 {
        self.escrows
            .lock()
            .unwrap()
            .get(&room)
            .map(|e| e.pot())
            .unwrap_or(0)
    }

    fn credit(&self, player: &str, amount: u64) {
        let mut balances = self.balances.lock().unwrap();
        let balance = balances
            .entry(player.to_string())
            .or_insert(self.initial_balance);
        *balance = balance.saturating_add(amount);
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn lock_stake(
        &self,
        room: Uuid,
        player: &str,
        amount: u64,
    ) -> Result<StakeReceipt, LedgerError> {
        let mut escrows = self.escrows.lock().unwrap();
        let escrow = escrows.entry(room).or_insert_with(|| MockEscrow {
            stakes: Vec::new(),
            status: EscrowStatus::Locked,
        });

        match escrow.status {
            EscrowStatus::Settled => return Err(LedgerError::AlreadySettled),
            // An aborted activation may be retried
            EscrowStatus::Refunded => {
                escrow.stakes.clear();
                escrow.status = EscrowStatus::Locked;
            }
            EscrowStatus::Locked => {}
        }

        // Deduct balance (locked)
        {
            let mut balances = self.balances.lock().unwrap();
            let balance = balances
                .entry(player.to_string())
                .or_insert(self.initial_balance);
            if *balance < amount {
                return Err(LedgerError::InsufficientFunds(player.to_string()));
            }
            *balance -= amount;
        }

        escrow.stakes.push((player.to_string(), amount));

        Ok(StakeReceipt {
            room,
            player: player.to_string(),
            amount,
        })
    }

    async fn settle(&self, room: Uuid, winner: &str) -> Result<SettlementReceipt, LedgerError> {
        let failing = self
            .settle_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(LedgerError::NetworkError("settlement node unavailable".to_string()));
        }

        let payout = {
            let mut escrows = self.escrows.lock().unwrap();
            let escrow = escrows
                .get_mut(&room)
                .ok_or(LedgerError::EscrowNotFound(room))?;

            match escrow.status {
                EscrowStatus::Settled => return Err(LedgerError::AlreadySettled),
                EscrowStatus::Refunded => return Err(LedgerError::AlreadyRefunded),
                EscrowStatus::Locked => {}
            }
            if !escrow.stakes.iter().any(|(p, _)| p == winner) {
                return Err(LedgerError::NotStaked(winner.to_string()));
            }

            escrow.status = EscrowStatus::Settled;
            escrow.pot()
        };

        self.credit(winner, payout);

        Ok(SettlementReceipt {
            room,
            winner: winner.to_string(),
            payout,
        })
    }

    async fn refund(&self, room: Uuid) -> Result<u64, LedgerError> {
        let stakes = {
            let mut escrows = self.escrows.lock().unwrap();
            let escrow = escrows
                .get_mut(&room)
                .ok_or(LedgerError::EscrowNotFound(room))?;

            match escrow.status {
                EscrowStatus::Settled => return Err(LedgerError::AlreadySettled),
                EscrowStatus::Refunded => return Err(LedgerError::AlreadyRefunded),
                EscrowStatus::Locked => {}
            }

            escrow.status = EscrowStatus::Refunded;
            escrow.stakes.clone()
        };

        let mut total = 0;
        for (player, amount) in stakes {
            self.credit(&player, amount);
            total += amount;
        }
        Ok(total)
    }
}
