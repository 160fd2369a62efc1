// SPDX-License-Identifier: MPL-2.0

//! The PSA client.
//!
//! A [`Client`] is created with fresh key material, learns the public keys of the whole roster
//! through [`Client::compute_share`], discloses a [`RevealedKeyShare`] once, and then produces a
//! [`Ciphertext`] per label with [`Client::encrypt`].

#[cfg(feature = "multithreaded")]
use rayon::prelude::*;

use num_bigint::BigUint;
use rand_core::{OsRng, TryCryptoRng};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Formatter};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::{
    encoding::preprocess,
    group::{DhPublicKey, DhSecretKey},
    params::Parameters,
    prf::Prf,
    sample::{random_vector, sample_vector},
    PsaError,
};

/// A client's masked reading for one label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(BigUint);

impl Ciphertext {
    /// The ciphertext as an integer modulo the message modulus.
    pub fn value(&self) -> &BigUint {
        &self.0
    }
}

impl From<BigUint> for Ciphertext {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

/// The masking key of a client, one-time padded with its pairwise share.
///
/// Adding up the revealed key shares of a whole roster cancels the pairwise shares and leaves
/// the sum of all masking keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedKeyShare(Vec<BigUint>);

impl RevealedKeyShare {
    /// Coordinates of the key share.
    pub fn as_slice(&self) -> &[BigUint] {
        &self.0
    }
}

impl From<Vec<BigUint>> for RevealedKeyShare {
    fn from(values: Vec<BigUint>) -> Self {
        Self(values)
    }
}

/// Weights of the aggregate. Only uniform summation is supported, so the only value of this
/// type is the all-ones vector of some non-zero length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregationVector {
    len: usize,
}

impl AggregationVector {
    /// The all-ones vector of length `len`.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::UnsupportedVector`] if `len == 0`.
    pub fn all_ones(len: usize) -> Result<Self, PsaError> {
        if len == 0 {
            return Err(PsaError::UnsupportedVector);
        }
        Ok(Self { len })
    }

    /// Number of coordinates, i.e. the roster size.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false; an empty aggregation vector can not be constructed.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl TryFrom<&[u64]> for AggregationVector {
    type Error = PsaError;

    fn try_from(weights: &[u64]) -> Result<Self, PsaError> {
        if weights.iter().any(|w| *w != 1) {
            return Err(PsaError::UnsupportedVector);
        }
        Self::all_ones(weights.len())
    }
}

impl<const N: usize> TryFrom<&[u64; N]> for AggregationVector {
    type Error = PsaError;

    fn try_from(weights: &[u64; N]) -> Result<Self, PsaError> {
        Self::try_from(&weights[..])
    }
}

/// Pairwise share of a client together with the roster it was computed for.
struct PairwiseShare {
    roster_size: usize,
    values: Vec<BigUint>,
}

/// Compute the pairwise zero-sum share of client `index`.
///
/// For every peer `k`, both clients of the pair hash their Diffie-Hellman shared element into a
/// seed and expand it into the same mask. Client `index` adds the mask if `k < index` and
/// subtracts it otherwise, so every mask cancels once all shares of the roster are added up.
///
/// # Errors
///
/// Fails with [`PsaError::Roster`] if the roster has fewer than two keys or `index` is not a
/// position in it.
pub fn pairwise_share(
    index: usize,
    dh_secret: &DhSecretKey,
    public_keys: &[DhPublicKey],
    parameters: &Parameters,
) -> Result<Vec<BigUint>, PsaError> {
    if public_keys.len() < 2 {
        return Err(PsaError::Roster(format!(
            "need at least two clients, got {}",
            public_keys.len()
        )));
    }
    if index >= public_keys.len() {
        return Err(PsaError::Roster(format!(
            "client index {index} is outside a roster of {}",
            public_keys.len()
        )));
    }

    let modulus = parameters.key_modulus();
    let dimension = parameters.dimension();
    let peer_mask = |(k, public_key): (usize, &DhPublicKey)| {
        let seed = dh_secret.agree(public_key);
        (k < index, sample_vector(dimension, modulus, &seed))
    };

    #[cfg(feature = "multithreaded")]
    let masks: Vec<(bool, Vec<BigUint>)> = public_keys
        .par_iter()
        .enumerate()
        .filter(|(k, _)| *k != index)
        .map(peer_mask)
        .collect();
    #[cfg(not(feature = "multithreaded"))]
    let masks: Vec<(bool, Vec<BigUint>)> = public_keys
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != index)
        .map(peer_mask)
        .collect();

    let mut share = vec![BigUint::default(); dimension];
    for (add, mask) in masks {
        for (s, m) in share.iter_mut().zip(mask) {
            *s = if add {
                (&*s + m) % modulus
            } else {
                (&*s + modulus - m) % modulus
            };
        }
    }
    Ok(share)
}

/// A participant of the aggregation.
pub struct Client {
    index: usize,
    parameters: Parameters,
    dh_secret: DhSecretKey,
    dh_public: DhPublicKey,
    masking_key: Vec<BigUint>,
    share: Option<PairwiseShare>,
}

impl Client {
    /// Create the client at roster position `index`, sampling its keys from the operating
    /// system's RNG.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::Sampling`] if the RNG fails.
    pub fn new(index: usize, parameters: Parameters) -> Result<Self, PsaError> {
        Self::with_rng(index, parameters, &mut OsRng)
    }

    /// Create the client at roster position `index`, sampling its keys from `rng`.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::Sampling`] if the RNG fails.
    pub fn with_rng<R>(index: usize, parameters: Parameters, rng: &mut R) -> Result<Self, PsaError>
    where
        R: TryCryptoRng + ?Sized,
    {
        let masking_key =
            random_vector(&mut *rng, parameters.dimension(), parameters.key_modulus())?;
        let dh_secret = DhSecretKey::generate(rng)?;
        let dh_public = dh_secret.public_key();
        Ok(Self {
            index,
            parameters,
            dh_secret,
            dh_public,
            masking_key,
            share: None,
        })
    }

    /// Position of this client in the roster.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The public key to publish to the rest of the roster.
    pub fn public_key(&self) -> &DhPublicKey {
        &self.dh_public
    }

    /// Parameters this client was created with.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Compute the pairwise share from the public keys of the complete roster, ordered by
    /// roster position. Calling this again replaces the share, e.g. after the roster changed.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::Roster`] if the roster has fewer than two keys, does not contain
    /// this client's position, holds a different key at this client's position, or repeats this
    /// client's key at another position.
    pub fn compute_share(&mut self, public_keys: &[DhPublicKey]) -> Result<(), PsaError> {
        for (k, public_key) in public_keys.iter().enumerate() {
            let own = bool::from(public_key.ct_eq(&self.dh_public));
            if k == self.index && !own {
                return Err(PsaError::Roster(format!(
                    "position {k} does not hold this client's public key"
                )));
            }
            if k != self.index && own {
                return Err(PsaError::Roster(format!(
                    "this client's public key also appears at position {k}"
                )));
            }
        }
        let values = pairwise_share(self.index, &self.dh_secret, public_keys, &self.parameters)?;
        debug!(
            index = self.index,
            roster_size = public_keys.len(),
            "computed pairwise share"
        );
        self.share = Some(PairwiseShare {
            roster_size: public_keys.len(),
            values,
        });
        Ok(())
    }

    /// Disclose the masking key, padded with the pairwise share.
    ///
    /// `vector` must be the all-ones vector over the roster; anything else would let the
    /// aggregator learn more than the sum. The result is computed once per roster and reused
    /// for every label.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::UnsupportedVector`] for any other weights, with
    /// [`PsaError::UninitializedShare`] before [`Client::compute_share`], and with
    /// [`PsaError::Roster`] if the vector length differs from the roster size.
    pub fn derive_key_share<V>(&self, vector: V) -> Result<RevealedKeyShare, PsaError>
    where
        V: TryInto<AggregationVector>,
        PsaError: From<V::Error>,
    {
        let vector = vector.try_into()?;
        let share = self.share.as_ref().ok_or(PsaError::UninitializedShare)?;
        if vector.len() != share.roster_size {
            return Err(PsaError::Roster(format!(
                "aggregation vector has length {}, roster has {} clients",
                vector.len(),
                share.roster_size
            )));
        }
        let modulus = self.parameters.key_modulus();
        Ok(RevealedKeyShare(
            share
                .values
                .iter()
                .zip(&self.masking_key)
                .map(|(s, k)| (s + k) % modulus)
                .collect(),
        ))
    }

    /// Mask `reading` for `label` in a roster of `roster_size` clients.
    ///
    /// Each label must be used at most once; reusing one breaks the masking. A reading is
    /// accepted only if `roster_size` readings of the same size would still decrypt exactly.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::CapacityExceeded`] if `reading` exceeds
    /// [`Parameters::max_aggregate`] divided by `roster_size`, and with [`PsaError::Roster`] if
    /// `roster_size == 0`.
    pub fn encrypt(
        &self,
        reading: u64,
        label: &str,
        roster_size: usize,
    ) -> Result<Ciphertext, PsaError> {
        self.parameters.check_capacity(roster_size, reading)?;
        let mask = Prf::new(&self.parameters).evaluate(label, &self.masking_key)?;
        let modulus = self.parameters.message_modulus();
        let encoded = preprocess(&BigUint::from(reading), roster_size, modulus)?;
        Ok(Ciphertext((mask + encoded) % modulus))
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("index", &self.index)
            .field("dh_public", &self.dh_public)
            .field(
                "roster_size",
                &self.share.as_ref().map(|share| share.roster_size),
            )
            .finish_non_exhaustive()
    }
}
