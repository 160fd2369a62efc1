// SPDX-License-Identifier: MPL-2.0

//! Generation and checking of aggregation transcripts.
//!
//! A [`PsaTestVector`] records everything an aggregator sees for one label together with the
//! readings it was produced from. Integers are written as decimal strings and public keys as
//! hex, so the JSON encoding can be consumed without big-integer support.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    aggregator::decrypt,
    client::{Ciphertext, Client, RevealedKeyShare},
    group::DhPublicKey,
    params::Parameters,
    PsaError,
};

/// Transcript of one aggregation round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsaTestVector {
    /// Message modulus, in decimal.
    pub message_modulus: String,
    /// Key modulus, in decimal.
    pub key_modulus: String,
    /// Length of the masking keys.
    pub dimension: usize,
    /// Label the readings were encrypted under.
    pub label: String,
    /// One reading per client, in roster order.
    pub readings: Vec<u64>,
    /// Hex-encoded public keys of the roster.
    pub public_keys: Vec<String>,
    /// Revealed key shares, coordinates in decimal.
    pub key_shares: Vec<Vec<String>>,
    /// Ciphertexts, in decimal.
    pub ciphertexts: Vec<String>,
    /// Decrypted sum of the readings, in decimal.
    pub sum: String,
}

fn parse(value: &str) -> Result<BigUint, PsaError> {
    BigUint::from_str(value)
        .map_err(|e| PsaError::InvalidParameter(format!("bad integer {value:?}: {e}")))
}

impl PsaTestVector {
    /// Run a roster of `roster_size` clients, each reporting a uniform reading in
    /// `[0, max_reading]`, through one round under `label`.
    ///
    /// # Errors
    ///
    /// Fails with [`PsaError::CapacityExceeded`] if the worst-case sum would not decrypt
    /// exactly, and propagates any client or aggregator failure.
    pub fn new(
        parameters: &Parameters,
        roster_size: usize,
        label: &str,
        max_reading: u64,
    ) -> Result<Self, PsaError> {
        parameters.check_capacity(roster_size, max_reading)?;

        let mut clients = (0..roster_size)
            .map(|i| Client::new(i, parameters.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let public_keys = clients.iter().map(|c| *c.public_key()).collect::<Vec<_>>();
        for client in &mut clients {
            client.compute_share(&public_keys)?;
        }

        let ones = vec![1u64; roster_size];
        let key_shares = clients
            .iter()
            .map(|c| c.derive_key_share(&ones[..]))
            .collect::<Result<Vec<_>, _>>()?;
        let readings = (0..roster_size)
            .map(|_| rand::random_range(0..=max_reading))
            .collect::<Vec<_>>();
        let ciphertexts = clients
            .iter()
            .zip(&readings)
            .map(|(c, x)| c.encrypt(*x, label, roster_size))
            .collect::<Result<Vec<_>, _>>()?;
        let sum = decrypt(parameters, &ciphertexts, &key_shares, label, roster_size)?;

        Ok(Self {
            message_modulus: parameters.message_modulus().to_string(),
            key_modulus: parameters.key_modulus().to_string(),
            dimension: parameters.dimension(),
            label: label.to_string(),
            readings,
            public_keys: public_keys
                .iter()
                .map(|pk| hex::encode(pk.to_bytes()))
                .collect(),
            key_shares: key_shares
                .iter()
                .map(|share| share.as_slice().iter().map(ToString::to_string).collect())
                .collect(),
            ciphertexts: ciphertexts.iter().map(|c| c.value().to_string()).collect(),
            sum: sum.to_string(),
        })
    }

    /// Parameters the transcript was produced with.
    ///
    /// # Errors
    ///
    /// Fails if the moduli do not parse or do not form a valid parameter set.
    pub fn parameters(&self) -> Result<Parameters, PsaError> {
        Parameters::new(
            parse(&self.message_modulus)?,
            parse(&self.key_modulus)?,
            self.dimension,
        )
    }

    /// Decrypt the recorded ciphertexts and check that both the recorded sum and the sum of the
    /// recorded readings match.
    ///
    /// # Errors
    ///
    /// Fails if a field does not decode or decryption fails.
    pub fn verify(&self) -> Result<bool, PsaError> {
        let parameters = self.parameters()?;
        for public_key in &self.public_keys {
            let bytes = hex::decode(public_key).map_err(|_| PsaError::InvalidPublicKey)?;
            DhPublicKey::from_bytes(&bytes)?;
        }
        let key_shares = self
            .key_shares
            .iter()
            .map(|share| {
                share
                    .iter()
                    .map(|v| parse(v))
                    .collect::<Result<Vec<_>, _>>()
                    .map(RevealedKeyShare::from)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ciphertexts = self
            .ciphertexts
            .iter()
            .map(|c| parse(c).map(Ciphertext::from))
            .collect::<Result<Vec<_>, _>>()?;

        let decrypted = decrypt(
            &parameters,
            &ciphertexts,
            &key_shares,
            &self.label,
            self.readings.len(),
        )?;
        let expected = self.readings.iter().map(|x| BigUint::from(*x)).sum::<BigUint>();
        Ok(decrypted == expected && parse(&self.sum)? == expected)
    }
}
