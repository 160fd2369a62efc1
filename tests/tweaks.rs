// SPDX-License-Identifier: MPL-2.0

use assert_matches::assert_matches;
use num_bigint::BigUint;
use psa::{
    aggregator::{decrypt, Aggregator},
    client::Client,
    params::Parameters,
    PsaError,
};
use rand::{rngs::StdRng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tweak {
    None,
    WrongLabel,
    ReorderedKeyShares,
    StaleRoster,
    MissingCiphertext,
    ShiftedCiphertext,
}

const ROSTER_SIZE: usize = 6;
const READINGS: [u64; ROSTER_SIZE] = [12, 0, 7, 1_000, 5, 31];

fn tweaks(tweak: Tweak) -> Result<BigUint, PsaError> {
    let parameters = Parameters::default();
    let mut rng = StdRng::seed_from_u64(2020);
    let mut clients = (0..ROSTER_SIZE)
        .map(|i| Client::with_rng(i, parameters.clone(), &mut rng).unwrap())
        .collect::<Vec<_>>();
    let public_keys = clients.iter().map(|c| *c.public_key()).collect::<Vec<_>>();
    for client in &mut clients {
        client.compute_share(&public_keys).unwrap();
    }

    if let Tweak::StaleRoster = tweak {
        // Client 0 still holds a share for a roster where position 3 had another key.
        let replaced = Client::with_rng(3, parameters.clone(), &mut rng).unwrap();
        let mut stale = public_keys.clone();
        stale[3] = *replaced.public_key();
        clients[0].compute_share(&stale).unwrap();
    }

    let ones = [1u64; ROSTER_SIZE];
    let mut key_shares = clients
        .iter()
        .map(|c| c.derive_key_share(&ones))
        .collect::<Result<Vec<_>, _>>()?;
    if let Tweak::ReorderedKeyShares = tweak {
        key_shares.reverse();
    }

    let mut ciphertexts = clients
        .iter()
        .zip(READINGS)
        .map(|(c, x)| c.encrypt(x, "t0", ROSTER_SIZE))
        .collect::<Result<Vec<_>, _>>()?;
    match tweak {
        Tweak::MissingCiphertext => {
            ciphertexts.pop();
        }
        Tweak::ShiftedCiphertext => {
            // Adding the roster size to a ciphertext adds one to the encoded reading.
            let modulus = parameters.message_modulus();
            ciphertexts[2] = ((ciphertexts[2].value() + ROSTER_SIZE) % modulus).into();
        }
        _ => {}
    }

    let label = if tweak == Tweak::WrongLabel { "t1" } else { "t0" };
    let aggregator = Aggregator::new(parameters.clone(), &key_shares)?;
    let sum = aggregator.decrypt(&ciphertexts, label)?;
    assert_eq!(
        sum,
        decrypt(&parameters, &ciphertexts, &key_shares, label, ROSTER_SIZE)?
    );
    Ok(sum)
}

fn reference_sum() -> BigUint {
    BigUint::from(READINGS.iter().sum::<u64>())
}

#[test]
fn tweak_none() {
    assert_eq!(tweaks(Tweak::None).unwrap(), reference_sum());
}

#[test]
fn tweak_wrong_label() {
    assert_ne!(tweaks(Tweak::WrongLabel).unwrap(), reference_sum());
}

#[test]
fn tweak_reordered_key_shares() {
    assert_eq!(tweaks(Tweak::ReorderedKeyShares).unwrap(), reference_sum());
}

#[test]
fn tweak_stale_roster() {
    assert_ne!(tweaks(Tweak::StaleRoster).unwrap(), reference_sum());
}

#[test]
fn tweak_missing_ciphertext() {
    assert_matches!(
        tweaks(Tweak::MissingCiphertext),
        Err(PsaError::CountMismatch {
            ciphertexts: 5,
            key_shares: 6
        })
    );
}

#[test]
fn tweak_shifted_ciphertext() {
    assert_eq!(
        tweaks(Tweak::ShiftedCiphertext).unwrap(),
        reference_sum() + 1u32
    );
}
