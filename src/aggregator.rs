// SPDX-License-Identifier: MPL-2.0

//! Decryption of the aggregate.
//!
//! The revealed key shares of a roster add up to the sum of all masking keys, and the
//! ciphertexts of one label add up to the encoded readings plus the masks under those keys.
//! Evaluating the PRF under the combined key removes the masks up to rounding noise, which
//! [`postprocess`] strips.

use num_bigint::BigUint;
use tracing::{debug, trace};

use crate::{
    client::{Ciphertext, RevealedKeyShare},
    encoding::postprocess,
    params::Parameters,
    prf::Prf,
    PsaError,
};

/// Add up revealed key shares coordinatewise modulo the key modulus.
fn combine_key_shares(
    parameters: &Parameters,
    key_shares: &[RevealedKeyShare],
) -> Result<Vec<BigUint>, PsaError> {
    if key_shares.is_empty() {
        return Err(PsaError::Roster("no key shares".into()));
    }
    let modulus = parameters.key_modulus();
    let mut combined = vec![BigUint::default(); parameters.dimension()];
    for (i, key_share) in key_shares.iter().enumerate() {
        if key_share.as_slice().len() != parameters.dimension() {
            return Err(PsaError::Roster(format!(
                "key share {i} has length {}, expected {}",
                key_share.as_slice().len(),
                parameters.dimension()
            )));
        }
        for (c, k) in combined.iter_mut().zip(key_share.as_slice()) {
            *c = (&*c + k) % modulus;
        }
    }
    Ok(combined)
}

fn decrypt_with_key(
    parameters: &Parameters,
    combined_key: &[BigUint],
    ciphertexts: &[Ciphertext],
    label: &str,
    roster_size: usize,
) -> Result<BigUint, PsaError> {
    if roster_size != ciphertexts.len() {
        return Err(PsaError::Roster(format!(
            "roster size {roster_size} does not match {} ciphertexts",
            ciphertexts.len()
        )));
    }
    trace!(label, roster_size, "decrypting aggregate");

    let modulus = parameters.message_modulus();
    let cipher_sum = ciphertexts
        .iter()
        .fold(BigUint::default(), |acc, c| (acc + c.value()) % modulus);
    let mask = Prf::new(parameters).evaluate(label, combined_key)?;

    // A difference of zero or less is lifted into (0, p] rather than [0, p).
    let diff = if cipher_sum > mask {
        cipher_sum - mask
    } else {
        cipher_sum + modulus - mask
    };
    Ok(postprocess(&diff, roster_size)? % modulus)
}

/// Decrypt the sum of the readings of a roster for `label`.
///
/// # Errors
///
/// Fails with [`PsaError::CountMismatch`] if the number of ciphertexts and key shares differ,
/// and with [`PsaError::Roster`] if `roster_size` is not the number of ciphertexts or a key
/// share has the wrong length.
pub fn decrypt(
    parameters: &Parameters,
    ciphertexts: &[Ciphertext],
    key_shares: &[RevealedKeyShare],
    label: &str,
    roster_size: usize,
) -> Result<BigUint, PsaError> {
    if ciphertexts.len() != key_shares.len() {
        return Err(PsaError::CountMismatch {
            ciphertexts: ciphertexts.len(),
            key_shares: key_shares.len(),
        });
    }
    let combined_key = combine_key_shares(parameters, key_shares)?;
    decrypt_with_key(parameters, &combined_key, ciphertexts, label, roster_size)
}

/// An aggregator for one roster.
///
/// The revealed key shares are combined once and the combined key is reused for every label.
#[derive(Clone, Debug)]
pub struct Aggregator {
    parameters: Parameters,
    combined_key: Vec<BigUint>,
    roster_size: usize,
}

impl Aggregator {
    /// Combine the revealed key shares of every client of the roster.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::Roster`] if `key_shares` is empty or a key share has the wrong
    /// length.
    pub fn new(parameters: Parameters, key_shares: &[RevealedKeyShare]) -> Result<Self, PsaError> {
        let combined_key = combine_key_shares(&parameters, key_shares)?;
        debug!(roster_size = key_shares.len(), "combined key shares");
        Ok(Self {
            parameters,
            combined_key,
            roster_size: key_shares.len(),
        })
    }

    /// Number of clients whose key shares were combined.
    pub fn roster_size(&self) -> usize {
        self.roster_size
    }

    /// Decrypt the sum of the readings for `label`.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::CountMismatch`] unless there is exactly one ciphertext per client.
    pub fn decrypt(&self, ciphertexts: &[Ciphertext], label: &str) -> Result<BigUint, PsaError> {
        if ciphertexts.len() != self.roster_size {
            return Err(PsaError::CountMismatch {
                ciphertexts: ciphertexts.len(),
                key_shares: self.roster_size,
            });
        }
        decrypt_with_key(
            &self.parameters,
            &self.combined_key,
            ciphertexts,
            label,
            self.roster_size,
        )
    }
}
