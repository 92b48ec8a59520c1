//! Viewing keys and key-wrapping helpers.

use secp256k1::ecdh::SharedSecret;
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use sha2::{Digest, Sha256};
use std::fmt;

/// A player's (or the sealing authority's) viewing keypair
#[derive(Clone)]
pub struct ViewingKeypair {
    secret: SecretKey,
    public: PublicKey,
}

impl ViewingKeypair {
    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut rand::thread_rng());
        Self::from_secret(secret)
    }

    pub fn from_secret(secret: SecretKey) -> Self {
        let public = PublicKey::from_secret_key(SECP256K1, &secret);
        Self { secret, public }
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public(&self) -> PublicKey {
        self.public
    }
}

impl fmt::Debug for ViewingKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ViewingKeypair({})", hex::encode(self.public.serialize()))
    }
}

/// Pad derived from an ECDH secret, bound to a label and context
pub(crate) fn wrap_pad(
    their_public: &PublicKey,
    our_secret: &SecretKey,
    label: &[u8],
    context: &[&[u8]],
) -> [u8; 32] {
    let shared = SharedSecret::new(their_public, our_secret);
    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update(shared.secret_bytes());
    for part in context {
        hasher.update(part);
    }
    hasher.finalize().into()
}

pub(crate) fn xor32(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a[i] ^ b[i];
    }
    out
}

/// Compressed-hex serde for public keys
pub(crate) mod pubkey_serde {
    use secp256k1::PublicKey;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(key.serialize()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PublicKey, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        PublicKey::from_slice(&bytes).map_err(D::Error::custom)
    }
}
