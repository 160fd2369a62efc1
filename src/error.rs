// SPDX-License-Identifier: MPL-2.0

//! Errors returned by the PSA core.

use num_bigint::BigUint;
use std::convert::Infallible;

/// Errors propagated by client, PRF and aggregator operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PsaError {
    /// The randomness source failed while sampling key material.
    #[error("failed to sample randomness: {0}")]
    Sampling(String),

    /// The roster of public keys, or a roster size, is malformed.
    #[error("invalid roster: {0}")]
    Roster(String),

    /// A key share was requested before the pairwise share was computed.
    #[error("pairwise share has not been computed")]
    UninitializedShare,

    /// The aggregation vector is not the all-ones vector.
    #[error("unsupported aggregation vector: only the all-ones vector is allowed")]
    UnsupportedVector,

    /// A value does not fit in the ring it has to be encoded into.
    #[error("value {value} is outside the encodable range below {bound}")]
    OutOfRange {
        /// The offending value.
        value: BigUint,
        /// Exclusive upper bound of the range.
        bound: BigUint,
    },

    /// Modulus switching was asked to map into a modulus that is not strictly smaller.
    #[error("cannot round from modulus {upper} to modulus {lower}")]
    InvalidModuli {
        /// Modulus of the source ring.
        upper: BigUint,
        /// Modulus of the target ring.
        lower: BigUint,
    },

    /// Number of ciphertexts and number of key shares differ.
    #[error("got {ciphertexts} ciphertexts but {key_shares} key shares")]
    CountMismatch {
        /// Number of ciphertexts supplied.
        ciphertexts: usize,
        /// Number of key shares supplied.
        key_shares: usize,
    },

    /// The message modulus is too small to recover the aggregate exactly.
    #[error(
        "a roster of {roster_size} clients needs a message modulus of at least {required}, \
         got {message_modulus}"
    )]
    CapacityExceeded {
        /// Number of clients in the roster.
        roster_size: usize,
        /// Smallest message modulus that would suffice.
        required: BigUint,
        /// The configured message modulus.
        message_modulus: BigUint,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A byte string does not encode a valid public key.
    #[error("invalid public key encoding")]
    InvalidPublicKey,
}

impl From<Infallible> for PsaError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
