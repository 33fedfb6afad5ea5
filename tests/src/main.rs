// Copyright (c) 2022-2023 The MobileCoin Foundation

use clap::Parser;
use log::{debug, info, LevelFilter};
use rand::{rngs::StdRng, Rng, SeedableRng};
use strum::{Display, EnumString, EnumVariantNames};

use secel_core::{
    auth::{Auth, Secrets},
    Config,
};
use secel_sim::{Fault, SimHandle};

use secel_tests::*;

/// Secure element protocol test CLI
///
/// Runs protocol scenarios against the simulated chip, optionally
/// injecting link faults to exercise retry handling.
#[derive(Clone, Debug, Parser)]
pub struct Opts {
    #[clap(subcommand)]
    pub test: Tests,

    /// Seed for host and simulator rngs
    #[clap(long, default_value = "1", env = "SECEL_SEED")]
    pub seed: u64,

    /// Number of random response faults to inject
    #[clap(long, default_value = "0")]
    pub faults: usize,

    /// Use bootloader timing
    #[clap(long)]
    pub bootloader: bool,

    /// Log level
    #[clap(long, default_value = "debug", env)]
    pub log_level: LevelFilter,
}

/// Test modes
#[derive(Clone, PartialEq, Debug, Parser, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum Tests {
    /// Check TempKey agreement
    Tempkey,
    /// Unlock pairing and refuse a wrong secret
    Pairing,
    /// Encrypted write and verification
    Storage {
        /// Number of bytes to write (up to 96)
        #[clap(long, default_value = "96")]
        len: usize,
    },
    /// Read revision and configuration zone
    Config,
    /// Run all tests
    All,
}

fn main() -> anyhow::Result<()> {
    // Load command line options
    let opts = Opts::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(opts.log_level, simplelog::Config::default());

    debug!("options: {:?}", opts);

    let mut rng = StdRng::seed_from_u64(opts.seed);

    // Provision simulated chip
    let sim = SimHandle::new(opts.seed);
    let pairing: [u8; 32] = rng.gen();
    let write_key: [u8; 32] = rng.gen();
    let secrets = provision(&sim, &pairing, &write_key);

    for _ in 0..opts.faults {
        let f = match rng.gen_range(0..4) {
            0 => Fault::Silent,
            1 => Fault::CorruptCrc,
            2 => Fault::Truncate,
            _ => Fault::Short,
        };
        debug!("injecting fault: {}", f);
        sim.inject(f);
    }

    let link_config = match opts.bootloader {
        true => Config::bootloader(),
        false => Config::firmware(),
    };

    debug!(
        "uart: {} baud, rx timeout {} us",
        link_config.link.baud_rate,
        link_config.link.rx_timeout_us()
    );

    let transport = sim.transport(link_config);
    let serial = *secrets.serial_number();
    let mut a = Auth::new_with_rng(transport, secrets, StdRng::seed_from_u64(opts.seed + 1))
        .with_config(&link_config);

    info!("Running test '{}'", opts.test);

    match opts.test {
        Tests::Tempkey => tempkey::test(&mut a, &mut rng)?,
        Tests::Pairing => pairing::test(&mut a)?,
        Tests::Storage { len } => {
            let data: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            storage::test(&mut a, &write_key, &data)?;
        }
        Tests::Config => {
            let c = config::test(&mut a, &serial)?;
            info!("config: {}", hex::encode(c));
        }
        Tests::All => {
            tempkey::test(&mut a, &mut rng)?;
            pairing::test(&mut a)?;
            storage::test(&mut a, &write_key, &[0x5a; 40])?;
            config::test(&mut a, &serial)?;
        }
    }

    info!("link stats: {}", a.exchange().metrics());
    info!("Test OK!");

    Ok(())
}
