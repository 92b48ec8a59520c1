//! Encrypted hands with owner/authority key wrapping.
//!
//! Each card is masked under a fresh content key. The key is wrapped twice
//! from one ephemeral secp256k1 key: once to the owner's viewing key and
//! once to the sealing authority. Access grants re-wrap the content key to
//! the viewer, bound to the viewer and the grant's expiry turn.

use super::keys::{wrap_pad, xor32};
use super::{
    ensure_same_handle, pubkey_serde, AccessGrant, GrantPayload, GrantPurpose, HandProof,
    HandSecrecy, HandleId, OwnerDelivery, OwnerSecret, RevealPolicy, SealedBody, SealedCard,
    SecrecyError, ViewingKeypair, Witness,
};
use crate::cards::Rank;
use crate::protocol::PlayerId;
use rand::RngCore;
use secp256k1::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

const OWNER_LABEL: &[u8] = b"letter.hand.owner.v1";
const AUTHORITY_LABEL: &[u8] = b"letter.hand.authority.v1";
const GRANT_LABEL: &[u8] = b"letter.hand.grant.v1";
const MASK_LABEL: &[u8] = b"letter.hand.mask.v1";
const TAG_LABEL: &[u8] = b"letter.hand.tag.v1";

/// Per-card symmetric key
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn mask(&self, handle: &HandleId) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update(MASK_LABEL);
        hasher.update(self.0);
        hasher.update(handle.as_bytes());
        hasher.finalize()[0]
    }

    fn tag(&self, handle: &HandleId, rank: u8) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(TAG_LABEL);
        hasher.update(self.0);
        hasher.update(handle.as_bytes());
        hasher.update([rank]);
        hasher.finalize().into()
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// Public body of an encrypted card
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    #[serde(with = "pubkey_serde")]
    ephemeral: PublicKey,
    owner_wrap: [u8; 32],
    authority_wrap: [u8; 32],
    masked: u8,
    tag: [u8; 32],
}

impl Ciphertext {
    fn seal(
        handle: &HandleId,
        owner_key: &PublicKey,
        authority: &PublicKey,
        key: &ContentKey,
        card: Rank,
    ) -> Self {
        let ephemeral = ViewingKeypair::generate();
        let context: [&[u8]; 1] = [handle.as_bytes()];
        let owner_pad = wrap_pad(owner_key, ephemeral.secret(), OWNER_LABEL, &context);
        let authority_pad = wrap_pad(authority, ephemeral.secret(), AUTHORITY_LABEL, &context);

        Self {
            ephemeral: ephemeral.public(),
            owner_wrap: xor32(&key.0, &owner_pad),
            authority_wrap: xor32(&key.0, &authority_pad),
            masked: card.value() ^ key.mask(handle),
            tag: key.tag(handle, card.value()),
        }
    }

    /// Unwrap the content key with the owner's viewing key. A wrong key
    /// yields a key that fails `decrypt`.
    pub fn recover_owner_key(&self, handle: &HandleId, owner_secret: &SecretKey) -> ContentKey {
        let pad = wrap_pad(&self.ephemeral, owner_secret, OWNER_LABEL, &[handle.as_bytes()]);
        ContentKey(xor32(&self.owner_wrap, &pad))
    }

    fn recover_authority_key(&self, handle: &HandleId, authority: &SecretKey) -> ContentKey {
        let pad = wrap_pad(&self.ephemeral, authority, AUTHORITY_LABEL, &[handle.as_bytes()]);
        ContentKey(xor32(&self.authority_wrap, &pad))
    }

    pub fn decrypt(&self, handle: &HandleId, key: &ContentKey) -> Result<Rank, SecrecyError> {
        let value = self.masked ^ key.mask(handle);
        if key.tag(handle, value) != self.tag {
            return Err(SecrecyError::ProofRejected);
        }
        Rank::from_value(value).ok_or(SecrecyError::ProofRejected)
    }
}

/// Encrypted-hand backend; the referee holds the sealing authority key
pub struct ThresholdBackend {
    authority: ViewingKeypair,
}

impl ThresholdBackend {
    pub fn new() -> Self {
        Self::with_authority(ViewingKeypair::generate())
    }

    pub fn with_authority(authority: ViewingKeypair) -> Self {
        Self { authority }
    }

    pub fn authority_public(&self) -> PublicKey {
        self.authority.public()
    }

    fn ciphertext_of(sealed: &SealedCard) -> Result<&Ciphertext, SecrecyError> {
        match &sealed.body {
            SealedBody::Encrypted { ciphertext } => Ok(ciphertext),
            _ => Err(SecrecyError::PolicyMismatch),
        }
    }

    fn grant_context(grant_viewer: &PlayerId, handle: &HandleId, valid_until_turn: u32) -> Vec<u8> {
        let mut context = Vec::with_capacity(16 + grant_viewer.as_bytes().len() + 4);
        context.extend_from_slice(handle.as_bytes());
        context.extend_from_slice(grant_viewer.as_bytes());
        context.extend_from_slice(&valid_until_turn.to_be_bytes());
        context
    }
}

impl Default for ThresholdBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HandSecrecy for ThresholdBackend {
    fn policy(&self) -> RevealPolicy {
        RevealPolicy::ThresholdEncrypted
    }

    fn seal(
        &self,
        owner: &PlayerId,
        owner_key: &PublicKey,
        card: Rank,
    ) -> Result<OwnerDelivery, SecrecyError> {
        let handle = HandleId::new();
        let key = ContentKey::random();
        let ciphertext = Ciphertext::seal(&handle, owner_key, &self.authority.public(), &key, card);

        Ok(OwnerDelivery {
            sealed: SealedCard {
                handle,
                owner: owner.clone(),
                body: SealedBody::Encrypted { ciphertext },
            },
            secret: OwnerSecret::OwnerKey,
        })
    }

    fn verify(&self, sealed: &SealedCard, proof: &HandProof) -> Result<Rank, SecrecyError> {
        ensure_same_handle(sealed, proof)?;
        let ciphertext = Self::ciphertext_of(sealed)?;
        match &proof.witness {
            Witness::ContentKey { key } => ciphertext.decrypt(&sealed.handle, key),
            _ => Err(SecrecyError::PolicyMismatch),
        }
    }

    fn grant_access(
        &self,
        sealed: &SealedCard,
        viewer: &PlayerId,
        viewer_key: &PublicKey,
        valid_until_turn: u32,
    ) -> Result<AccessGrant, SecrecyError> {
        let ciphertext = Self::ciphertext_of(sealed)?;
        let key = ciphertext.recover_authority_key(&sealed.handle, self.authority.secret());
        ciphertext.decrypt(&sealed.handle, &key)?;

        let ephemeral = ViewingKeypair::generate();
        let context = Self::grant_context(viewer, &sealed.handle, valid_until_turn);
        let pad = wrap_pad(viewer_key, ephemeral.secret(), GRANT_LABEL, &[context.as_slice()]);

        Ok(AccessGrant {
            handle: sealed.handle,
            owner: sealed.owner.clone(),
            viewer: viewer.clone(),
            purpose: GrantPurpose::Inspect,
            valid_until_turn,
            payload: GrantPayload::Wrapped {
                ephemeral: ephemeral.public(),
                wrapped_key: xor32(&key.0, &pad),
            },
        })
    }

    fn open(
        &self,
        sealed: &SealedCard,
        grant: &AccessGrant,
        viewer_secret: Option<&SecretKey>,
        current_turn: u32,
    ) -> Result<Rank, SecrecyError> {
        grant.check(sealed, current_turn)?;
        let ciphertext = Self::ciphertext_of(sealed)?;
        let (ephemeral, wrapped_key) = match &grant.payload {
            GrantPayload::Wrapped {
                ephemeral,
                wrapped_key,
            } => (ephemeral, wrapped_key),
            _ => return Err(SecrecyError::PolicyMismatch),
        };
        let viewer_secret = viewer_secret.ok_or(SecrecyError::MissingKey)?;

        let context = Self::grant_context(&grant.viewer, &grant.handle, grant.valid_until_turn);
        let pad = wrap_pad(ephemeral, viewer_secret, GRANT_LABEL, &[context.as_slice()]);
        let key = ContentKey(xor32(wrapped_key, &pad));
        ciphertext
            .decrypt(&sealed.handle, &key)
            .map_err(|_| SecrecyError::WrongViewer)
    }

    fn reveal(&self, sealed: &SealedCard) -> Result<Rank, SecrecyError> {
        let ciphertext = Self::ciphertext_of(sealed)?;
        let key = ciphertext.recover_authority_key(&sealed.handle, self.authority.secret());
        ciphertext.decrypt(&sealed.handle, &key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed_for(backend: &ThresholdBackend, owner: &ViewingKeypair, rank: Rank) -> OwnerDelivery {
        backend
            .seal(&PlayerId::from("alice"), &owner.public(), rank)
            .unwrap()
    }

    #[test]
    fn test_other_key_cannot_decrypt() {
        let backend = ThresholdBackend::new();
        let owner = ViewingKeypair::generate();
        let eve = ViewingKeypair::generate();
        let delivery = sealed_for(&backend, &owner, Rank::Princess);

        assert_eq!(
            delivery.card(eve.secret()),
            Err(SecrecyError::ProofRejected)
        );
    }

    #[test]
    fn test_grant_is_bound_to_viewer_key() {
        let backend = ThresholdBackend::new();
        let owner = ViewingKeypair::generate();
        let viewer = ViewingKeypair::generate();
        let eve = ViewingKeypair::generate();
        let delivery = sealed_for(&backend, &owner, Rank::Baron);

        let grant = backend
            .grant_access(&delivery.sealed, &PlayerId::from("bob"), &viewer.public(), 3)
            .unwrap();
        assert_eq!(
            backend.open(&delivery.sealed, &grant, Some(eve.secret()), 3),
            Err(SecrecyError::WrongViewer)
        );
        assert_eq!(
            backend.open(&delivery.sealed, &grant, None, 3),
            Err(SecrecyError::MissingKey)
        );
    }

    #[test]
    fn test_extending_grant_breaks_it() {
        let backend = ThresholdBackend::new();
        let owner = ViewingKeypair::generate();
        let viewer = ViewingKeypair::generate();
        let delivery = sealed_for(&backend, &owner, Rank::King);

        let mut grant = backend
            .grant_access(&delivery.sealed, &PlayerId::from("bob"), &viewer.public(), 3)
            .unwrap();
        grant.valid_until_turn = 10;
        assert_eq!(
            backend.open(&delivery.sealed, &grant, Some(viewer.secret()), 5),
            Err(SecrecyError::WrongViewer)
        );
    }

    #[test]
    fn test_ciphertext_is_serializable() {
        let backend = ThresholdBackend::new();
        let owner = ViewingKeypair::generate();
        let delivery = sealed_for(&backend, &owner, Rank::Guard);

        let json = serde_json::to_string(&delivery.sealed).unwrap();
        let back: SealedCard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, delivery.sealed);
        assert_eq!(delivery.card(owner.secret()).unwrap(), Rank::Guard);
    }

    #[test]
    fn test_content_key_debug_hides_bytes() {
        let key = ContentKey([0xab; 32]);
        assert!(!format!("{:?}", key).contains("ab"));
    }
}
