// Copyright (c) 2022-2023 The MobileCoin Foundation

#![allow(unused)]

use log::LevelFilter;
use rand::{rngs::StdRng, Rng, SeedableRng};

use secel_core::{
    auth::{Auth, RomSecrets},
    proto::Opcode,
    Config, Transport,
};
use secel_sim::{SimClock, SimHandle, SimUart};

pub type TestTransport = Transport<SimUart, SimClock>;

pub type TestAuth = Auth<TestTransport, RomSecrets, StdRng>;

pub struct Setup {
    pub sim: SimHandle,
    pub auth: TestAuth,
    pub pairing: [u8; 32],
    pub write_key: [u8; 32],
    pub rng: StdRng,
}

/// Provision a simulated chip and attach an [Auth] engine
pub fn setup(seed: u64) -> Setup {
    let _ = simplelog::SimpleLogger::init(LevelFilter::Debug, Default::default());

    let mut rng = StdRng::seed_from_u64(seed);
    let pairing: [u8; 32] = rng.gen();
    let write_key: [u8; 32] = rng.gen();

    let sim = SimHandle::new(seed);
    let secrets = secel_tests::provision(&sim, &pairing, &write_key);

    let auth = Auth::new_with_rng(
        sim.transport(Config::firmware()),
        secrets,
        StdRng::seed_from_u64(seed.wrapping_add(1)),
    );

    Setup {
        sim,
        auth,
        pairing,
        write_key,
        rng,
    }
}

/// Count executed commands with the provided opcode
pub fn executed(sim: &SimHandle, op: Opcode) -> usize {
    sim.with(|c| c.history().iter().filter(|o| **o == op).count())
}
