// SPDX-License-Identifier: MPL-2.0

//! Encoding of readings around the PRF mask.
//!
//! Each reading `x` of a roster of `n` clients is encoded as `n * x + 1`, so the noiseless sum
//! of all encodings is `n * (X + 1)`, a multiple of `n`. The rounding error of the PRF only ever
//! subtracts less than `n` from that sum, so rounding up to the next multiple of `n` recovers it.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;

use crate::PsaError;

fn roster_size(n: usize) -> Result<BigUint, PsaError> {
    if n == 0 {
        return Err(PsaError::Roster("roster is empty".into()));
    }
    Ok(BigUint::from(n))
}

/// Encode `x` for a roster of `n` clients as `n * x + 1`.
///
/// # Errors
///
/// Fails with [`PsaError::OutOfRange`] if the encoding is not below `message_modulus`, and with
/// [`PsaError::Roster`] if `n == 0`.
pub fn preprocess(x: &BigUint, n: usize, message_modulus: &BigUint) -> Result<BigUint, PsaError> {
    let encoded = x * roster_size(n)? + 1u32;
    if encoded >= *message_modulus {
        return Err(PsaError::OutOfRange {
            value: encoded,
            bound: message_modulus.clone(),
        });
    }
    Ok(encoded)
}

/// Recover the sum of `n` readings from a decrypted value.
///
/// `value` is rounded up to the nearest multiple of `n` (and left alone if it already is one),
/// then `n` is subtracted and the result divided by `n`.
///
/// # Errors
///
/// Fails with [`PsaError::Roster`] if `n == 0` and with [`PsaError::OutOfRange`] if `value` is
/// zero, which no sum of encoded readings can decrypt to.
pub fn postprocess(value: &BigUint, n: usize) -> Result<BigUint, PsaError> {
    let n = roster_size(n)?;
    if value.is_zero() {
        return Err(PsaError::OutOfRange {
            value: value.clone(),
            bound: n,
        });
    }
    let rounded = value.next_multiple_of(&n);
    Ok((rounded - &n) / n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameters;
    use assert_matches::assert_matches;

    #[test]
    fn test_preprocess() {
        let p = Parameters::default().message_modulus().clone();
        assert_eq!(
            preprocess(&BigUint::from(7u32), 5, &p).unwrap(),
            BigUint::from(36u32)
        );
        assert_eq!(
            preprocess(&BigUint::zero(), 1, &p).unwrap(),
            BigUint::from(1u32)
        );

        let small = BigUint::from(36u32);
        assert_matches!(
            preprocess(&BigUint::from(7u32), 5, &small),
            Err(PsaError::OutOfRange { .. })
        );
        assert_eq!(
            preprocess(&BigUint::from(7u32), 5, &(small + 1u32)).unwrap(),
            BigUint::from(36u32)
        );
        assert_matches!(
            preprocess(&BigUint::from(7u32), 0, &p),
            Err(PsaError::Roster(_))
        );
    }

    #[test]
    fn test_postprocess() {
        // n = 5, X = 7: noiseless sum is 40, noise removes up to 4.
        for value in 36u32..=40 {
            assert_eq!(
                postprocess(&BigUint::from(value), 5).unwrap(),
                BigUint::from(7u32)
            );
        }
        assert_eq!(
            postprocess(&BigUint::from(41u32), 5).unwrap(),
            BigUint::from(8u32)
        );
        assert_eq!(
            postprocess(&BigUint::from(3u32), 5).unwrap(),
            BigUint::zero()
        );
        assert_matches!(
            postprocess(&BigUint::zero(), 5),
            Err(PsaError::OutOfRange { .. })
        );
        assert_matches!(
            postprocess(&BigUint::from(3u32), 0),
            Err(PsaError::Roster(_))
        );
    }

    #[test]
    fn noiseless_round_trip() {
        let p = Parameters::default().message_modulus().clone();
        for n in [1usize, 2, 3, 10, 100] {
            for x in [0u64, 1, 17, 1_000_000] {
                let encoded = preprocess(&BigUint::from(x), n, &p).unwrap();
                assert_eq!(postprocess(&encoded, n).unwrap(), BigUint::from(x));
            }

            // The encodings of n readings add up to n * X + n.
            let readings = (0..n as u64).map(|i| (i * 7919) % 1000).collect::<Vec<_>>();
            let sum = readings
                .iter()
                .map(|x| preprocess(&BigUint::from(*x), n, &p).unwrap())
                .sum::<BigUint>();
            let expected = readings.iter().sum::<u64>();
            assert_eq!(postprocess(&sum, n).unwrap(), BigUint::from(expected));
        }
    }
}
