// SPDX-License-Identifier: MPL-2.0

//! Diffie-Hellman key agreement over the Ristretto255 group.
//!
//! Clients publish a [`DhPublicKey`] and keep the matching [`DhSecretKey`]. Any two clients
//! derive the same [`SEED_LENGTH`]-byte seed from their own secret and the peer's public key.

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
};
use rand_core::TryCryptoRng;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt::{self, Debug, Formatter};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

use crate::{sample::SEED_LENGTH, PsaError};

/// Length in bytes of an encoded public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// A client's Diffie-Hellman secret. Never leaves the client.
pub struct DhSecretKey(Scalar);

impl DhSecretKey {
    /// Sample a uniform scalar.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::Sampling`] if the RNG fails.
    pub fn generate<R>(rng: &mut R) -> Result<Self, PsaError>
    where
        R: TryCryptoRng + ?Sized,
    {
        let mut wide = [0u8; 64];
        rng.try_fill_bytes(&mut wide)
            .map_err(|e| PsaError::Sampling(e.to_string()))?;
        let scalar = Scalar::from_bytes_mod_order_wide(&wide);
        wide.zeroize();
        Ok(Self(scalar))
    }

    /// The public key `secret * G`.
    pub fn public_key(&self) -> DhPublicKey {
        DhPublicKey(RISTRETTO_BASEPOINT_POINT * self.0)
    }

    /// Hash the shared element `peer * secret` into a seed.
    pub(crate) fn agree(&self, peer: &DhPublicKey) -> [u8; SEED_LENGTH] {
        let shared = peer.0 * self.0;
        Sha3_256::digest(shared.compress().as_bytes()).into()
    }
}

impl Drop for DhSecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Debug for DhSecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("DhSecretKey(..)")
    }
}

/// A client's published Diffie-Hellman key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DhPublicKey(RistrettoPoint);

impl DhPublicKey {
    /// Canonical compressed encoding.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.0.compress().to_bytes()
    }

    /// Decode a compressed point.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::InvalidPublicKey`] if `bytes` is not the canonical encoding of a
    /// group element.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PsaError> {
        CompressedRistretto::from_slice(bytes)
            .ok()
            .and_then(|compressed| compressed.decompress())
            .map(Self)
            .ok_or(PsaError::InvalidPublicKey)
    }
}

impl ConstantTimeEq for DhPublicKey {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.ct_eq(&other.0)
    }
}

impl Serialize for DhPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for DhPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(de::Error::custom)
    }
}
