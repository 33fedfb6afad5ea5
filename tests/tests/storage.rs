// Copyright (c) 2022-2023 The MobileCoin Foundation

use rand::Rng;

use secel_core::{
    auth::MAX_WRITE_LEN,
    proto::{ChipStatus, Opcode},
    Error,
};
use secel_tests::{DATA_SLOT, WRITE_KEY_SLOT};

mod helpers;
use helpers::*;

#[test]
fn storage_scenario() {
    let mut s = setup(10);

    let data: Vec<u8> = (0..MAX_WRITE_LEN).map(|_| s.rng.gen()).collect();
    secel_tests::storage::test(&mut s.auth, &s.write_key, &data).unwrap();

    assert_eq!(&s.sim.with(|c| *c.slot(DATA_SLOT))[..], &data[..]);
}

#[test]
fn partial_block_is_zero_padded() {
    let mut s = setup(11);

    let data = [0xa5u8; 40];
    s.auth
        .encrypted_write(DATA_SLOT, WRITE_KEY_SLOT, &s.write_key, &data)
        .unwrap();

    let slot = s.sim.with(|c| *c.slot(DATA_SLOT));
    assert_eq!(&slot[..40], &data[..]);
    assert!(slot[40..].iter().all(|b| *b == 0));

    assert_eq!(executed(&s.sim, Opcode::Write), 2);
}

#[test]
fn block_addressing() {
    let mut s = setup(12);

    s.auth
        .encrypted_write32(DATA_SLOT, 2, WRITE_KEY_SLOT, &s.write_key, &[0x77; 32])
        .unwrap();

    let slot = s.sim.with(|c| *c.slot(DATA_SLOT));
    assert!(slot[..64].iter().all(|b| *b == 0));
    assert_eq!(&slot[64..], &[0x77; 32]);
}

#[test]
fn wrong_write_key_is_refused() {
    let mut s = setup(13);

    let mut wrong = s.write_key;
    wrong[0] ^= 0x01;

    let r = s
        .auth
        .encrypted_write32(DATA_SLOT, 0, WRITE_KEY_SLOT, &wrong, &[0x42; 32]);

    assert_eq!(r, Err(Error::Chip(ChipStatus::CheckMacFail as u8)));
    assert!(s.sim.with(|c| c.slot(DATA_SLOT).iter().all(|b| *b == 0)));
}

#[test]
fn oversized_write_is_rejected() {
    let mut s = setup(14);

    let r = s.auth.encrypted_write(
        DATA_SLOT,
        WRITE_KEY_SLOT,
        &s.write_key,
        &[0u8; MAX_WRITE_LEN + 1],
    );

    assert_eq!(r, Err(Error::InvalidLength));
    assert!(s.sim.with(|c| c.history().is_empty()));
}
