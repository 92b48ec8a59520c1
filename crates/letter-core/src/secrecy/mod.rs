//! Hand secrecy layer.
//!
//! Every dealt card leaves the dealer as a [`SealedCard`]: a public handle
//! plus whatever the chosen backend needs to later prove or decrypt it.
//! The owner receives an [`OwnerDelivery`] privately and is always able to
//! recover their own card from it. Anyone else learns a value only through
//! a time-boxed [`AccessGrant`] or through the referee verifying a
//! [`HandProof`] and publishing the rule-mandated outcome.
//!
//! Three interchangeable backends implement [`HandSecrecy`], selected per
//! room by [`RevealPolicy`]:
//! - `Plaintext`: trusted referee vault
//! - `CommitReveal`: SHA-256 commitments with witness openings
//! - `ThresholdEncrypted`: content keys wrapped via secp256k1 ECDH for the
//!   owner and the sealing authority, re-wrapped per viewer in grants

mod commitment;
mod keys;
mod threshold;
mod vault;

pub use commitment::{commit, verify_open, CommitRevealBackend, Commitment, Opening, Salt};
pub use keys::ViewingKeypair;
pub use threshold::{Ciphertext, ContentKey, ThresholdBackend};
pub use vault::PlaintextVault;

pub(crate) use keys::pubkey_serde;

use crate::cards::Rank;
use crate::protocol::PlayerId;
use secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors from the secrecy layer
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SecrecyError {
    #[error("Access grant expired after turn {valid_until}, current turn {current}")]
    AccessExpired { valid_until: u32, current: u32 },

    #[error("Access grant was issued to another viewer")]
    WrongViewer,

    #[error("Grant or proof refers to a different card")]
    HandleMismatch,

    #[error("Proof verification failed")]
    ProofRejected,

    #[error("Material does not match the room's reveal policy")]
    PolicyMismatch,

    #[error("Unknown sealed card")]
    UnknownHandle,

    #[error("A viewing key is required to open this card")]
    MissingKey,
}

/// Which hand secrecy strategy a room runs with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealPolicy {
    Plaintext,
    CommitReveal,
    ThresholdEncrypted,
}

impl RevealPolicy {
    /// Build the backend for this policy
    pub fn backend(self) -> Arc<dyn HandSecrecy> {
        match self {
            RevealPolicy::Plaintext => Arc::new(PlaintextVault::new()),
            RevealPolicy::CommitReveal => Arc::new(CommitRevealBackend::new()),
            RevealPolicy::ThresholdEncrypted => Arc::new(ThresholdBackend::new()),
        }
    }
}

impl std::str::FromStr for RevealPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plaintext" => Ok(RevealPolicy::Plaintext),
            "commit_reveal" => Ok(RevealPolicy::CommitReveal),
            "threshold_encrypted" | "threshold" => Ok(RevealPolicy::ThresholdEncrypted),
            other => Err(format!("unknown reveal policy: {}", other)),
        }
    }
}

/// Public identifier of one sealed card
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandleId({})", self.0)
    }
}

/// Public, opaque handle to a hidden card
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedCard {
    pub handle: HandleId,
    pub owner: PlayerId,
    pub body: SealedBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SealedBody {
    /// Value held by the referee's vault
    Vault,
    /// SHA-256 commitment to the value
    Committed { commitment: Commitment },
    /// Value encrypted under a per-card content key
    Encrypted { ciphertext: Ciphertext },
}

/// What only the owner receives when a card is dealt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnerDelivery {
    pub sealed: SealedCard,
    pub secret: OwnerSecret,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OwnerSecret {
    Plain { rank: Rank },
    Opening { opening: Opening },
    /// The owner unwraps the content key with their own viewing key
    OwnerKey,
}

impl OwnerDelivery {
    pub fn handle(&self) -> HandleId {
        self.sealed.handle
    }

    /// Recover the card value (owner only)
    pub fn card(&self, owner_key: &SecretKey) -> Result<Rank, SecrecyError> {
        match (&self.secret, &self.sealed.body) {
            (OwnerSecret::Plain { rank }, SealedBody::Vault) => Ok(*rank),
            (OwnerSecret::Opening { opening }, SealedBody::Committed { commitment }) => {
                if verify_open(commitment, opening) {
                    Ok(opening.rank)
                } else {
                    Err(SecrecyError::ProofRejected)
                }
            }
            (OwnerSecret::OwnerKey, SealedBody::Encrypted { ciphertext }) => {
                let key = ciphertext.recover_owner_key(&self.sealed.handle, owner_key);
                ciphertext.decrypt(&self.sealed.handle, &key)
            }
            _ => Err(SecrecyError::PolicyMismatch),
        }
    }

    /// Build the witness the owner hands to the referee
    pub fn proof(&self, owner_key: &SecretKey) -> Result<HandProof, SecrecyError> {
        let witness = match (&self.secret, &self.sealed.body) {
            (OwnerSecret::Plain { .. }, SealedBody::Vault) => Witness::Vault,
            (OwnerSecret::Opening { opening }, SealedBody::Committed { .. }) => Witness::Opening {
                opening: opening.clone(),
            },
            (OwnerSecret::OwnerKey, SealedBody::Encrypted { ciphertext }) => Witness::ContentKey {
                key: ciphertext.recover_owner_key(&self.sealed.handle, owner_key),
            },
            _ => return Err(SecrecyError::PolicyMismatch),
        };
        Ok(HandProof {
            handle: self.sealed.handle,
            witness,
        })
    }
}

/// A witness presented to the referee for one sealed card
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HandProof {
    pub handle: HandleId,
    pub witness: Witness,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Witness {
    Vault,
    Opening { opening: Opening },
    ContentKey { key: ContentKey },
}

/// Predicate over a hidden card; only the boolean becomes public
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Predicate {
    Equals(Rank),
    GreaterThan(Rank),
}

impl Predicate {
    pub fn holds(self, card: Rank) -> bool {
        match self {
            Predicate::Equals(rank) => card == rank,
            Predicate::GreaterThan(rank) => card > rank,
        }
    }
}

/// What an access grant is for. Grants are single-purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantPurpose {
    Inspect,
}

/// Time-boxed permission for one viewer to open one sealed card.
///
/// `valid_until_turn` is enforced by [`HandSecrecy::open`] only. Under
/// `Plaintext` and `CommitReveal` the payload itself carries the value (the
/// rank or the opening), so a viewer who keeps the grant keeps the card.
/// Only `Wrapped` payloads need the viewer's secret key to read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccessGrant {
    pub handle: HandleId,
    pub owner: PlayerId,
    pub viewer: PlayerId,
    pub purpose: GrantPurpose,
    pub valid_until_turn: u32,
    pub payload: GrantPayload,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantPayload {
    Plain {
        rank: Rank,
    },
    Opening {
        opening: Opening,
    },
    Wrapped {
        #[serde(with = "pubkey_serde")]
        ephemeral: PublicKey,
        wrapped_key: [u8; 32],
    },
}

impl AccessGrant {
    /// Common checks every backend runs before opening
    fn check(&self, sealed: &SealedCard, current_turn: u32) -> Result<(), SecrecyError> {
        if self.handle != sealed.handle {
            return Err(SecrecyError::HandleMismatch);
        }
        if current_turn > self.valid_until_turn {
            return Err(SecrecyError::AccessExpired {
                valid_until: self.valid_until_turn,
                current: current_turn,
            });
        }
        Ok(())
    }
}

/// Capability interface over the secrecy backend collaborator
pub trait HandSecrecy: Send + Sync {
    fn policy(&self) -> RevealPolicy;

    /// Seal a freshly dealt card for its owner
    fn seal(
        &self,
        owner: &PlayerId,
        owner_key: &PublicKey,
        card: Rank,
    ) -> Result<OwnerDelivery, SecrecyError>;

    /// Referee-side proof check; returns the value to the verifier only
    fn verify(&self, sealed: &SealedCard, proof: &HandProof) -> Result<Rank, SecrecyError>;

    /// Issue a single-purpose grant letting `viewer` open `sealed`
    /// through `valid_until_turn`
    fn grant_access(
        &self,
        sealed: &SealedCard,
        viewer: &PlayerId,
        viewer_key: &PublicKey,
        valid_until_turn: u32,
    ) -> Result<AccessGrant, SecrecyError>;

    /// Open a sealed card with a grant
    fn open(
        &self,
        sealed: &SealedCard,
        grant: &AccessGrant,
        viewer_secret: Option<&SecretKey>,
        current_turn: u32,
    ) -> Result<Rank, SecrecyError>;

    /// Rule-mandated public opening (round-end showdown)
    fn reveal(&self, sealed: &SealedCard) -> Result<Rank, SecrecyError>;

    /// Drop any dealer-side material once a card is out of play
    fn forget(&self, _handle: &HandleId) {}
}

fn ensure_same_handle(sealed: &SealedCard, proof: &HandProof) -> Result<(), SecrecyError> {
    if sealed.handle == proof.handle {
        Ok(())
    } else {
        Err(SecrecyError::HandleMismatch)
    }
}
