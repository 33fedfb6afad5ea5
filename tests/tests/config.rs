// Copyright (c) 2022-2023 The MobileCoin Foundation

use secel_core::{
    proto::{
        zone::{data_address, CONFIG_SIZE},
        Opcode, Zone,
    },
    Error,
};
use secel_sim::{Power, REVISION};

mod helpers;
use helpers::*;

#[test]
fn config_scenario() {
    let mut s = setup(40);
    let serial = s.sim.with(|c| c.host_serial());

    let c = secel_tests::config::test(&mut s.auth, &serial).unwrap();

    assert_eq!(c, s.sim.with(|c| c.config_zone()));
}

#[test]
fn config_read_block_by_block() {
    let mut s = setup(41);

    let mut c = [0u8; CONFIG_SIZE];
    s.auth.config_read(&mut c).unwrap();

    assert_eq!(executed(&s.sim, Opcode::Read), 4);
    // Final read leaves the chip idle, the sleep that follows is ignored
    assert_eq!(s.sim.with(|c| c.power()), Power::Idle);
}

#[test]
fn info_revision() {
    let mut s = setup(42);

    assert_eq!(s.auth.info(), Ok(REVISION));
}

#[test]
fn read32_public_slot() {
    let mut s = setup(43);

    s.sim.with(|c| {
        c.set_slot_config(3, Default::default());
    });

    let b = s
        .auth
        .read32(Zone::Data, data_address(3, 0))
        .unwrap();
    assert_eq!(b, [0u8; 32]);

    // Secret slots are refused by the chip
    let r = s.auth.read32(
        Zone::Data,
        data_address(secel_tests::DATA_SLOT, 0),
    );
    assert_eq!(r, Err(Error::Chip(0x0F)));
}
