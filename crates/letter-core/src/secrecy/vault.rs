//! Trusted-referee vault.

use super::{
    ensure_same_handle, AccessGrant, GrantPayload, GrantPurpose, HandProof, HandSecrecy,
    HandleId, OwnerDelivery, OwnerSecret, RevealPolicy, SealedBody, SealedCard, SecrecyError,
    Witness,
};
use crate::cards::Rank;
use crate::protocol::PlayerId;
use secp256k1::{PublicKey, SecretKey};
use std::collections::HashMap;
use std::sync::Mutex;

/// Card values live only inside the referee. For local play and tests.
#[derive(Default)]
pub struct PlaintextVault {
    cards: Mutex<HashMap<HandleId, Rank>>,
}

impl PlaintextVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, sealed: &SealedCard) -> Result<Rank, SecrecyError> {
        if sealed.body != SealedBody::Vault {
            return Err(SecrecyError::PolicyMismatch);
        }
        self.cards
            .lock()
            .unwrap()
            .get(&sealed.handle)
            .copied()
            .ok_or(SecrecyError::UnknownHandle)
    }
}

impl HandSecrecy for PlaintextVault {
    fn policy(&self) -> RevealPolicy {
        RevealPolicy::Plaintext
    }

    fn seal(
        &self,
        owner: &PlayerId,
        _owner_key: &PublicKey,
        card: Rank,
    ) -> Result<OwnerDelivery, SecrecyError> {
        let handle = HandleId::new();
        self.cards.lock().unwrap().insert(handle, card);
        Ok(OwnerDelivery {
            sealed: SealedCard {
                handle,
                owner: owner.clone(),
                body: SealedBody::Vault,
            },
            secret: OwnerSecret::Plain { rank: card },
        })
    }

    fn verify(&self, sealed: &SealedCard, proof: &HandProof) -> Result<Rank, SecrecyError> {
        ensure_same_handle(sealed, proof)?;
        match proof.witness {
            Witness::Vault => self.lookup(sealed),
            _ => Err(SecrecyError::PolicyMismatch),
        }
    }

    fn grant_access(
        &self,
        sealed: &SealedCard,
        viewer: &PlayerId,
        _viewer_key: &PublicKey,
        valid_until_turn: u32,
    ) -> Result<AccessGrant, SecrecyError> {
        let rank = self.lookup(sealed)?;
        Ok(AccessGrant {
            handle: sealed.handle,
            owner: sealed.owner.clone(),
            viewer: viewer.clone(),
            purpose: GrantPurpose::Inspect,
            valid_until_turn,
            payload: GrantPayload::Plain { rank },
        })
    }

    fn open(
        &self,
        sealed: &SealedCard,
        grant: &AccessGrant,
        _viewer_secret: Option<&SecretKey>,
        current_turn: u32,
    ) -> Result<Rank, SecrecyError> {
        grant.check(sealed, current_turn)?;
        match grant.payload {
            GrantPayload::Plain { rank } => Ok(rank),
            _ => Err(SecrecyError::PolicyMismatch),
        }
    }

    fn reveal(&self, sealed: &SealedCard) -> Result<Rank, SecrecyError> {
        self.lookup(sealed)
    }

    fn forget(&self, handle: &HandleId) {
        self.cards.lock().unwrap().remove(handle);
    }
}
