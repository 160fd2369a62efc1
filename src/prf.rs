// SPDX-License-Identifier: MPL-2.0

//! The almost key-homomorphic PRF used to mask readings.
//!
//! The PRF is an inner product between the masking key and a public vector derived from the
//! label, computed modulo the key modulus and then rounded down to the message modulus. Because
//! of the rounding, `F(k1 + k2, x)` and `F(k1, x) + F(k2, x)` may differ by one; see
//! [`crate::encoding`] for how decryption absorbs this.

use num_bigint::BigUint;
use num_traits::Zero;
use sha3::{Digest, Sha3_256};

use crate::{params::Parameters, PsaError};

/// Hash `position` and `label` to an integer.
///
/// The input to SHA3-256 is the decimal rendering of `position`, a space, then the label. The
/// digest is read as a big-endian unsigned integer.
pub fn hash(label: &str, position: usize) -> BigUint {
    let mut hasher = Sha3_256::new();
    hasher.update(position.to_string().as_bytes());
    hasher.update(b" ");
    hasher.update(label.as_bytes());
    BigUint::from_bytes_be(&hasher.finalize())
}

/// Evaluate the PRF keyed by `key` on `label`.
///
/// # Errors
///
/// Fails with [`PsaError::InvalidModuli`] unless `key_modulus > message_modulus`.
pub fn evaluate(
    label: &str,
    key: &[BigUint],
    key_modulus: &BigUint,
    message_modulus: &BigUint,
) -> Result<BigUint, PsaError> {
    let mut sum = BigUint::zero();
    for (i, k) in key.iter().enumerate() {
        let h = hash(label, i) % key_modulus;
        sum += (h * k) % key_modulus;
        sum %= key_modulus;
    }
    round(&sum, key_modulus, message_modulus)
}

/// Switch `value` from the ring modulo `upper` to the ring modulo `lower`:
/// `floor((value mod upper) * lower / upper)`.
///
/// # Errors
///
/// Fails with [`PsaError::InvalidModuli`] if `lower >= upper`.
pub fn round(value: &BigUint, upper: &BigUint, lower: &BigUint) -> Result<BigUint, PsaError> {
    if lower >= upper {
        return Err(PsaError::InvalidModuli {
            upper: upper.clone(),
            lower: lower.clone(),
        });
    }
    Ok((value % upper) * lower / upper)
}

/// The PRF instantiated with a parameter set.
#[derive(Clone, Copy, Debug)]
pub struct Prf<'a> {
    parameters: &'a Parameters,
}

impl<'a> Prf<'a> {
    /// Bind the PRF to `parameters`.
    pub fn new(parameters: &'a Parameters) -> Self {
        Self { parameters }
    }

    /// Evaluate on `label` with the configured moduli.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::InvalidParameter`] if `key` does not have the configured
    /// dimension.
    pub fn evaluate(&self, label: &str, key: &[BigUint]) -> Result<BigUint, PsaError> {
        if key.len() != self.parameters.dimension() {
            return Err(PsaError::InvalidParameter(format!(
                "key has length {}, expected {}",
                key.len(),
                self.parameters.dimension()
            )));
        }
        evaluate(
            label,
            key,
            self.parameters.key_modulus(),
            self.parameters.message_modulus(),
        )
    }
}
