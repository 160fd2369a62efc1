// SPDX-License-Identifier: MPL-2.0

use color_eyre::eyre::{Result, WrapErr};
use num_bigint::BigUint;
use psa::{params::Parameters, test_vector::PsaTestVector};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "generate-test-vector",
    about = "Generate a PSA aggregation transcript",
    rename_all = "kebab-case",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Options {
    /// Number of clients in the roster
    #[structopt(short, long, required = true)]
    roster_size: usize,
    /// Label the readings are encrypted under
    #[structopt(short, long, default_value = "t0")]
    label: String,
    /// Largest reading a client may report
    #[structopt(short, long, default_value = "1000000")]
    max_reading: u64,
    /// The message modulus is 2 to this power
    #[structopt(long, default_value = "64")]
    message_bits: u32,
    /// The key modulus is 2 to this power
    #[structopt(long, default_value = "84")]
    key_bits: u32,
    /// Length of the masking keys
    #[structopt(short, long, default_value = "2")]
    dimension: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let options = Options::from_args();

    let parameters = Parameters::new(
        BigUint::from(1u32) << options.message_bits,
        BigUint::from(1u32) << options.key_bits,
        options.dimension,
    )
    .wrap_err("invalid parameters")?;

    let test_vector = PsaTestVector::new(
        &parameters,
        options.roster_size,
        &options.label,
        options.max_reading,
    )
    .wrap_err("failed to create test vector")?;
    let json =
        serde_json::to_string(&test_vector).wrap_err("failed to encode test vector to JSON")?;
    println!("{}", json);

    Ok(())
}
