// SPDX-License-Identifier: MPL-2.0 AND Apache-2.0
//
// Portions of this file are derived from the num-bigint crate
// (https://docs.rs/num-bigint/0.4.6/)
// Copyright 2013-2014 The Rust Project Developers
// Licensed under the Apache 2.0 license
//
// This file contains code covered by the following copyright and permission notice
// and has been modified.
//
// Copyright 2013-2014 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Uniform sampling of big integers below a modulus.
//!
//! Fresh key material is drawn from a fallible randomness source. Pairwise masks are instead
//! expanded from a seed with [`SeedStream`], so that both clients of a pair obtain the same
//! vector.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;
use rand_core::{
    impls::{next_u32_via_fill, next_u64_via_fill},
    RngCore, TryRngCore,
};
use sha3::{
    digest::{ExtendableOutput, Update, XofReader},
    Shake128, Shake128Reader,
};
use std::fmt::{self, Debug, Formatter};

use crate::PsaError;

/// Length in bytes of the seed expanded by [`SeedStream`].
pub const SEED_LENGTH: usize = 32;

/// Domain separation tag absorbed before the seed.
const SEED_STREAM_DST: &[u8] = b"psa pairwise mask";

/// Fill `data` with random bits.
///
/// If `rem` is greater than zero, then only the lowest `rem` bits of the last u32 are kept.
fn random_bits<R>(rng: &mut R, data: &mut [u32], rem: u64) -> Result<(), R::Error>
where
    R: TryRngCore + ?Sized,
{
    let mut bytes = vec![0u8; data.len() * 4];
    rng.try_fill_bytes(&mut bytes)?;
    for (digit, chunk) in data.iter_mut().zip(bytes.chunks_exact(4)) {
        *digit = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    if rem > 0 {
        let last = data.len() - 1;
        data[last] >>= 32 - rem;
    }
    Ok(())
}

/// Uniformly generate a random [`BigUint`] in the range \[0, 2^`bit_size`).
fn random_biguint<R>(rng: &mut R, bit_size: u64) -> Result<BigUint, R::Error>
where
    R: TryRngCore + ?Sized,
{
    let (digits, rem) = bit_size.div_rem(&32);
    let len = (digits + u64::from(rem > 0)) as usize;
    let mut data = vec![0u32; len];
    if len > 0 {
        random_bits(rng, &mut data, rem)?;
    }
    Ok(BigUint::new(data))
}

/// Uniformly generate a random [`BigUint`] in the range \[0, `bound`).
///
/// Candidates have as many bits as `bound - 1`, so a power-of-two bound never rejects.
pub(crate) fn random_below<R>(rng: &mut R, bound: &BigUint) -> Result<BigUint, R::Error>
where
    R: TryRngCore + ?Sized,
{
    debug_assert!(!bound.is_zero());
    let bits = (bound - 1u32).bits();
    loop {
        let n = random_biguint(rng, bits)?;
        if n < *bound {
            return Ok(n);
        }
    }
}

/// Sample `length` independent uniform integers modulo `modulus` from a fallible RNG.
///
/// # Errors
///
/// Fails with [`PsaError::Sampling`] if the RNG fails.
pub fn random_vector<R>(
    rng: &mut R,
    length: usize,
    modulus: &BigUint,
) -> Result<Vec<BigUint>, PsaError>
where
    R: TryRngCore + ?Sized,
{
    (0..length)
        .map(|_| {
            random_below(&mut *rng, modulus).map_err(|e| PsaError::Sampling(e.to_string()))
        })
        .collect()
}

/// Deterministically expand `seed` into `length` integers modulo `modulus`.
///
/// Equal seeds give equal vectors, which is what lets two clients agree on a pairwise mask
/// without talking to each other.
pub fn sample_vector(length: usize, modulus: &BigUint, seed: &[u8; SEED_LENGTH]) -> Vec<BigUint> {
    let mut stream = SeedStream::new(seed);
    (0..length)
        .map(|_| {
            let Ok(value) = random_below(&mut stream, modulus);
            value
        })
        .collect()
}

/// Pseudorandom byte stream: SHAKE128 over a domain separation tag and a seed.
pub struct SeedStream(Shake128Reader);

impl SeedStream {
    /// Absorb `seed` and start squeezing.
    pub fn new(seed: &[u8; SEED_LENGTH]) -> Self {
        let mut xof = Shake128::default();
        Update::update(&mut xof, SEED_STREAM_DST);
        Update::update(&mut xof, seed);
        Self(xof.finalize_xof())
    }
}

impl RngCore for SeedStream {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        XofReader::read(&mut self.0, dest);
    }

    fn next_u32(&mut self) -> u32 {
        next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        next_u64_via_fill(self)
    }
}

impl Debug for SeedStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::test_utils::FailingRng;
    use num_traits::One;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn seed_stream_is_deterministic() {
        let modulus = BigUint::one() << 84;
        let a = sample_vector(16, &modulus, &[7; SEED_LENGTH]);
        let b = sample_vector(16, &modulus, &[7; SEED_LENGTH]);
        let c = sample_vector(16, &modulus, &[8; SEED_LENGTH]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|x| *x < modulus));
    }

    #[test]
    fn prefix_stable() {
        // A longer vector starts with the shorter one.
        let modulus = BigUint::from(1_000_003u32);
        let short = sample_vector(3, &modulus, &[1; SEED_LENGTH]);
        let long = sample_vector(10, &modulus, &[1; SEED_LENGTH]);
        assert_eq!(short[..], long[..3]);
    }

    #[test]
    fn random_below_bound() {
        let mut rng = StdRng::seed_from_u64(0);
        for bound in [1u32, 2, 3, 255, 256, 257, 1 << 31] {
            let bound = BigUint::from(bound);
            for _ in 0..50 {
                let Ok(x) = random_below(&mut rng, &bound);
                assert!(x < bound);
            }
        }
    }

    #[test]
    fn random_vector_covers_range() {
        // With a small modulus every residue shows up.
        let mut rng = StdRng::seed_from_u64(1);
        let modulus = BigUint::from(5u32);
        let values = random_vector(&mut rng, 200, &modulus).unwrap();
        for r in 0u32..5 {
            assert!(values.contains(&BigUint::from(r)));
        }
    }

    #[test]
    fn sampling_failure() {
        let err = random_vector(&mut FailingRng, 2, &(BigUint::one() << 84)).unwrap_err();
        assert!(matches!(err, PsaError::Sampling(msg) if msg.contains("entropy exhausted")));
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use rand_core::{TryCryptoRng, TryRngCore};

    /// Randomness source that always fails.
    pub(crate) struct FailingRng;

    impl TryRngCore for FailingRng {
        type Error = std::io::Error;

        fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
            Err(std::io::Error::other("entropy exhausted"))
        }

        fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
            Err(std::io::Error::other("entropy exhausted"))
        }

        fn try_fill_bytes(&mut self, _dst: &mut [u8]) -> Result<(), Self::Error> {
            Err(std::io::Error::other("entropy exhausted"))
        }
    }

    impl TryCryptoRng for FailingRng {}
}
