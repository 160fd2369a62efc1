// SPDX-License-Identifier: MPL-2.0

//! Protocol parameters.
//!
//! A [`Parameters`] value fixes the two rings the protocol works in and the length of the
//! masking keys. Every client and the aggregator of one roster must use the same parameters.
//!
//! # Exact-sum capacity
//!
//! Decryption recovers `n * (X + 1) - d` where `X` is the sum of the readings, `n` the roster
//! size and `d` the accumulated rounding error of the PRF. Writing `e_i` for the fractional
//! part dropped when client `i`'s mask is rounded, `d = floor(sum(e_i))`, so `0 <= d <= n - 1`
//! whatever the dimension or the ratio of the two moduli. The difference is lifted into
//! `(0, message_modulus]` before rounding up to the next multiple of `n`, so the sum is exact
//! whenever `n * (X + 1) <= message_modulus`. [`Parameters::max_aggregate`] and
//! [`Parameters::check_capacity`] enforce that bound, and [`crate::client::Client::encrypt`]
//! refuses readings that could break it.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::Serialize;

use crate::PsaError;

/// Default message modulus exponent: the plaintext ring is `Z / 2^64`.
pub const DEFAULT_MESSAGE_BITS: u32 = 64;
/// Default key modulus exponent: masking keys live in `Z / 2^84`.
pub const DEFAULT_KEY_BITS: u32 = 84;
/// Default length of a masking key.
pub const DEFAULT_DIMENSION: usize = 2;

/// Moduli and key length shared by all participants of a roster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Parameters {
    message_modulus: BigUint,
    key_modulus: BigUint,
    dimension: usize,
}

impl Parameters {
    /// Construct a parameter set.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::InvalidModuli`] unless `key_modulus > message_modulus`, and with
    /// [`PsaError::InvalidParameter`] if `message_modulus < 2` or `dimension == 0`.
    pub fn new(
        message_modulus: BigUint,
        key_modulus: BigUint,
        dimension: usize,
    ) -> Result<Self, PsaError> {
        if message_modulus <= BigUint::one() {
            return Err(PsaError::InvalidParameter(
                "message modulus must be at least 2".into(),
            ));
        }
        if key_modulus <= message_modulus {
            return Err(PsaError::InvalidModuli {
                upper: key_modulus,
                lower: message_modulus,
            });
        }
        if dimension == 0 {
            return Err(PsaError::InvalidParameter(
                "dimension must be positive".into(),
            ));
        }
        Ok(Self {
            message_modulus,
            key_modulus,
            dimension,
        })
    }

    /// Modulus of the plaintext and ciphertext ring.
    pub fn message_modulus(&self) -> &BigUint {
        &self.message_modulus
    }

    /// Modulus of the masking-key ring.
    pub fn key_modulus(&self) -> &BigUint {
        &self.key_modulus
    }

    /// Length of every masking key, pairwise share and revealed key share.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Largest sum of readings that decrypts exactly for a roster of `roster_size` clients.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::Roster`] for an empty roster and with
    /// [`PsaError::CapacityExceeded`] if not even an all-zero aggregate can be recovered.
    pub fn max_aggregate(&self, roster_size: usize) -> Result<BigUint, PsaError> {
        if roster_size == 0 {
            return Err(PsaError::Roster("roster is empty".into()));
        }
        let n = BigUint::from(roster_size);
        let limit = &self.message_modulus / &n;
        if limit.is_zero() {
            return Err(PsaError::CapacityExceeded {
                roster_size,
                required: n,
                message_modulus: self.message_modulus.clone(),
            });
        }
        Ok(limit - 1u32)
    }

    /// Check that `roster_size` clients, each reporting at most `max_reading`, always produce
    /// an exactly recoverable aggregate, i.e. that `roster_size * max_reading` does not exceed
    /// [`Parameters::max_aggregate`].
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::CapacityExceeded`] if the worst-case aggregate does not fit.
    pub fn check_capacity(&self, roster_size: usize, max_reading: u64) -> Result<(), PsaError> {
        let max_aggregate = self.max_aggregate(roster_size)?;
        let worst_case = BigUint::from(roster_size) * max_reading;
        if worst_case > max_aggregate {
            return Err(PsaError::CapacityExceeded {
                roster_size,
                required: (worst_case + 1u32) * roster_size,
                message_modulus: self.message_modulus.clone(),
            });
        }
        Ok(())
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            message_modulus: BigUint::one() << DEFAULT_MESSAGE_BITS,
            key_modulus: BigUint::one() << DEFAULT_KEY_BITS,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

/// Deserialization goes through [`Parameters::new`] so that an invalid configuration can not be
/// loaded.
mod parameters_serde {
    use num_bigint::BigUint;
    use serde::{de, Deserialize};

    #[derive(Deserialize)]
    pub struct Parameters {
        message_modulus: BigUint,
        key_modulus: BigUint,
        dimension: usize,
    }

    impl<'de> Deserialize<'de> for super::Parameters {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            let helper = Parameters::deserialize(deserializer)?;
            super::Parameters::new(helper.message_modulus, helper.key_modulus, helper.dimension)
                .map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_parameters() {
        let params = Parameters::default();
        assert_eq!(params.message_modulus(), &(BigUint::one() << 64));
        assert_eq!(params.key_modulus(), &(BigUint::one() << 84));
        assert_eq!(params.dimension(), 2);
        assert_eq!(
            Parameters::new(
                params.message_modulus().clone(),
                params.key_modulus().clone(),
                2
            )
            .unwrap(),
            params
        );
    }

    #[test]
    fn bad_parameters() {
        assert_matches!(
            Parameters::new(BigUint::from(1024u32), BigUint::from(1024u32), 2),
            Err(PsaError::InvalidModuli { .. })
        );
        assert_matches!(
            Parameters::new(BigUint::from(2048u32), BigUint::from(1024u32), 2),
            Err(PsaError::InvalidModuli { .. })
        );
        assert_matches!(
            Parameters::new(BigUint::from(1u32), BigUint::from(1024u32), 2),
            Err(PsaError::InvalidParameter(_))
        );
        assert_matches!(
            Parameters::new(BigUint::from(16u32), BigUint::from(1024u32), 0),
            Err(PsaError::InvalidParameter(_))
        );
    }

    #[test]
    fn parameters_deserialization() {
        let params = Parameters::default();
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            serde_json::from_value::<Parameters>(json.clone()).unwrap(),
            params
        );

        let mut swapped = json.clone();
        swapped["message_modulus"] = json["key_modulus"].clone();
        swapped["key_modulus"] = json["message_modulus"].clone();
        serde_json::from_value::<Parameters>(swapped).unwrap_err();

        let mut flat = json;
        flat["dimension"] = 0.into();
        serde_json::from_value::<Parameters>(flat).unwrap_err();
    }

    #[test]
    fn capacity() {
        // p = 101: a roster of 5 recovers X as long as 5 * (X + 1) <= 101.
        let params = Parameters::new(BigUint::from(101u32), BigUint::from(1u32 << 20), 2).unwrap();
        assert_eq!(params.max_aggregate(5).unwrap(), BigUint::from(19u32));
        assert_eq!(params.max_aggregate(1).unwrap(), BigUint::from(100u32));
        assert_eq!(params.max_aggregate(101).unwrap(), BigUint::zero());
        assert_matches!(
            params.max_aggregate(102),
            Err(PsaError::CapacityExceeded { roster_size: 102, .. })
        );

        // When n divides p the bound is met with equality.
        let params = Parameters::new(BigUint::from(100u32), BigUint::from(1u32 << 20), 2).unwrap();
        assert_eq!(params.max_aggregate(5).unwrap(), BigUint::from(19u32));
        assert_eq!(params.max_aggregate(4).unwrap(), BigUint::from(24u32));
        assert_matches!(params.max_aggregate(0), Err(PsaError::Roster(_)));

        let params = Parameters::new(BigUint::from(101u32), BigUint::from(1u32 << 20), 2).unwrap();
        params.check_capacity(5, 3).unwrap();
        assert_matches!(
            params.check_capacity(5, 4),
            Err(PsaError::CapacityExceeded { roster_size: 5, .. })
        );

        Parameters::default()
            .check_capacity(100, 100_000_000)
            .unwrap();
    }
}
