// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # psa
//!
//! Private stream aggregation: an untrusted aggregator learns the sum of the readings of a
//! roster of clients for each label, and nothing else.
//!
//! Every [`client::Client`] masks its reading with an almost key-homomorphic PRF
//! ([`prf`]) under a private masking key. Once per roster the clients run a Diffie-Hellman
//! exchange ([`group`]) to build pairwise shares that add up to zero, and disclose their masking
//! key padded with that share. The [`aggregator::Aggregator`] adds up the disclosed values to
//! obtain the sum of all masking keys, which removes the masks from the sum of the ciphertexts.
//! The rounding noise the PRF introduces is stripped by the encoding in [`encoding`].
//!
//! ```
//! use num_bigint::BigUint;
//! use psa::{aggregator::Aggregator, client::Client, params::Parameters};
//!
//! let parameters = Parameters::default();
//! let mut clients = (0..3)
//!     .map(|i| Client::new(i, parameters.clone()))
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! let public_keys = clients.iter().map(|c| *c.public_key()).collect::<Vec<_>>();
//! for client in &mut clients {
//!     client.compute_share(&public_keys).unwrap();
//! }
//!
//! let key_shares = clients
//!     .iter()
//!     .map(|c| c.derive_key_share(&[1u64, 1, 1]))
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! let aggregator = Aggregator::new(parameters, &key_shares).unwrap();
//!
//! let ciphertexts = clients
//!     .iter()
//!     .zip([10u64, 20, 30])
//!     .map(|(c, reading)| c.encrypt(reading, "2024-01-01", 3))
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! assert_eq!(
//!     aggregator.decrypt(&ciphertexts, "2024-01-01").unwrap(),
//!     BigUint::from(60u32)
//! );
//! ```

pub mod aggregator;
pub mod client;
pub mod encoding;
mod error;
pub mod group;
pub mod params;
pub mod prf;
pub mod sample;
#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_vector;

pub use error::PsaError;
