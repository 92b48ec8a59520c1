//! Commit-reveal hand secrecy.

use super::{
    ensure_same_handle, AccessGrant, GrantPayload, GrantPurpose, HandProof, HandSecrecy,
    HandleId, OwnerDelivery, OwnerSecret, RevealPolicy, SealedBody, SealedCard, SecrecyError,
    Witness,
};
use crate::cards::Rank;
use crate::protocol::PlayerId;
use rand::RngCore;
use secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Salt for commitment scheme
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt([u8; 32]);

impl Salt {
    /// Create a new random salt
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(&self.0[..8]))
    }
}

/// Commitment = H(rank || salt)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment([u8; 32]);

impl Commitment {
    /// Create a commitment from card bytes and salt
    pub fn new(card_bytes: &[u8], salt: &Salt) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(card_bytes);
        hasher.update(salt.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify that the given card and salt produce this commitment
    pub fn verify(&self, card_bytes: &[u8], salt: &Salt) -> bool {
        *self == Self::new(card_bytes, salt)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Witness that opens a commitment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub rank: Rank,
    pub salt: Salt,
}

/// Commit to a card with a fresh salt
pub fn commit(card: Rank) -> (Commitment, Opening) {
    let salt = Salt::random();
    let commitment = Commitment::new(&card.to_bytes(), &salt);
    (commitment, Opening { rank: card, salt })
}

pub fn verify_open(commitment: &Commitment, opening: &Opening) -> bool {
    commitment.verify(&opening.rank.to_bytes(), &opening.salt)
}

/// Commit-reveal backend.
///
/// The dealer escrows each opening so it can serve inspection grants and
/// the round-end showdown; ordinary disclosures come from the owner.
#[derive(Default)]
pub struct CommitRevealBackend {
    escrow: Mutex<HashMap<HandleId, Opening>>,
}

impl CommitRevealBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn commitment_of(sealed: &SealedCard) -> Result<&Commitment, SecrecyError> {
        match &sealed.body {
            SealedBody::Committed { commitment } => Ok(commitment),
            _ => Err(SecrecyError::PolicyMismatch),
        }
    }

    fn escrowed(&self, handle: &HandleId) -> Result<Opening, SecrecyError> {
        self.escrow
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .ok_or(SecrecyError::UnknownHandle)
    }
}

impl HandSecrecy for CommitRevealBackend {
    fn policy(&self) -> RevealPolicy {
        RevealPolicy::CommitReveal
    }

    fn seal(
        &self,
        owner: &PlayerId,
        _owner_key: &PublicKey,
        card: Rank,
    ) -> Result<OwnerDelivery, SecrecyError> {
        let handle = HandleId::new();
        let (commitment, opening) = commit(card);
        self.escrow.lock().unwrap().insert(handle, opening.clone());

        Ok(OwnerDelivery {
            sealed: SealedCard {
                handle,
                owner: owner.clone(),
                body: SealedBody::Committed { commitment },
            },
            secret: OwnerSecret::Opening { opening },
        })
    }

    fn verify(&self, sealed: &SealedCard, proof: &HandProof) -> Result<Rank, SecrecyError> {
        ensure_same_handle(sealed, proof)?;
        let commitment = Self::commitment_of(sealed)?;
        match &proof.witness {
            Witness::Opening { opening } if verify_open(commitment, opening) => Ok(opening.rank),
            Witness::Opening { .. } => Err(SecrecyError::ProofRejected),
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
        Self::commitment_of(sealed)?;
        let opening = self.escrowed(&sealed.handle)?;
        Ok(AccessGrant {
            handle: sealed.handle,
            owner: sealed.owner.clone(),
            viewer: viewer.clone(),
            purpose: GrantPurpose::Inspect,
            valid_until_turn,
            payload: GrantPayload::Opening { opening },
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
        let commitment = Self::commitment_of(sealed)?;
        match &grant.payload {
            GrantPayload::Opening { opening } if verify_open(commitment, opening) => {
                Ok(opening.rank)
            }
            GrantPayload::Opening { .. } => Err(SecrecyError::ProofRejected),
            _ => Err(SecrecyError::PolicyMismatch),
        }
    }

    fn reveal(&self, sealed: &SealedCard) -> Result<Rank, SecrecyError> {
        let commitment = Self::commitment_of(sealed)?;
        let opening = self.escrowed(&sealed.handle)?;
        if verify_open(commitment, &opening) {
            Ok(opening.rank)
        } else {
            Err(SecrecyError::ProofRejected)
        }
    }

    fn forget(&self, handle: &HandleId) {
        self.escrow.lock().unwrap().remove(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrecy::ViewingKeypair;

    #[test]
    fn test_commitment_verification() {
        let (commitment, opening) = commit(Rank::Priest);
        assert!(verify_open(&commitment, &opening));
    }

    #[test]
    fn test_different_cards_different_commitments() {
        let salt = Salt::random();
        let commitment1 = Commitment::new(&Rank::Guard.to_bytes(), &salt);
        let commitment2 = Commitment::new(&Rank::Priest.to_bytes(), &salt);

        assert_ne!(commitment1, commitment2);
    }

    #[test]
    fn test_wrong_card_fails_verification() {
        let (commitment, opening) = commit(Rank::Baron);
        let forged = Opening {
            rank: Rank::Princess,
            salt: opening.salt,
        };
        assert!(!verify_open(&commitment, &forged));
    }

    #[test]
    fn test_wrong_salt_fails_verification() {
        let (commitment, _) = commit(Rank::Baron);
        let forged = Opening {
            rank: Rank::Baron,
            salt: Salt::random(),
        };
        assert!(!verify_open(&commitment, &forged));
    }

    #[test]
    fn test_forged_opening_rejected_by_backend() {
        let backend = CommitRevealBackend::new();
        let owner = ViewingKeypair::generate();
        let delivery = backend
            .seal(&PlayerId::from("alice"), &owner.public(), Rank::Guard)
            .unwrap();

        let forged = HandProof {
            handle: delivery.handle(),
            witness: Witness::Opening {
                opening: Opening {
                    rank: Rank::Princess,
                    salt: Salt::random(),
                },
            },
        };
        assert_eq!(
            backend.verify(&delivery.sealed, &forged),
            Err(SecrecyError::ProofRejected)
        );
    }

    #[test]
    fn test_forget_drops_escrow() {
        let backend = CommitRevealBackend::new();
        let owner = ViewingKeypair::generate();
        let delivery = backend
            .seal(&PlayerId::from("alice"), &owner.public(), Rank::King)
            .unwrap();

        backend.forget(&delivery.handle());
        assert_eq!(
            backend.reveal(&delivery.sealed),
            Err(SecrecyError::UnknownHandle)
        );
    }
}
