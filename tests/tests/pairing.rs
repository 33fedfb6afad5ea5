// Copyright (c) 2022-2023 The MobileCoin Foundation

use secel_core::{
    auth::{Auth, RomSecrets},
    proto::{ChipStatus, Opcode, KEYNUM_PAIRING},
    Config, Error,
};
use secel_sim::Fault;

mod helpers;
use helpers::*;

#[test]
fn pairing_scenario() {
    let mut s = setup(1);

    secel_tests::pairing::test(&mut s.auth).unwrap();
}

#[test]
fn pair_unlock_first_attempt() {
    let mut s = setup(2);

    s.auth.pair_unlock().unwrap();

    assert_eq!(executed(&s.sim, Opcode::CheckMac), 1);
    assert_eq!(executed(&s.sim, Opcode::Nonce), 1);
}

#[test]
fn pair_unlock_third_attempt() {
    let mut s = setup(3);

    // Reject the first two CheckMac responses (nonce responses pass)
    for _ in 0..2 {
        s.sim.inject(Fault::Clean);
        s.sim.inject(Fault::Status(ChipStatus::CheckMacFail as u8));
    }

    s.auth.pair_unlock().unwrap();

    assert_eq!(executed(&s.sim, Opcode::CheckMac), 3);
}

#[test]
fn pair_unlock_wrong_secret() {
    let s = setup(4);

    let serial = s.sim.with(|c| c.host_serial());
    let wrong = RomSecrets::new([0x11; 32], serial);
    let mut a = Auth::new(s.sim.transport(Config::firmware()), wrong);

    assert_eq!(a.pair_unlock(), Err(Error::AuthMismatch));
    assert_eq!(executed(&s.sim, Opcode::CheckMac), 3);
}

#[test]
fn checkmac_against_pairing_slot() {
    let mut s = setup(5);

    s.auth.checkmac(KEYNUM_PAIRING, &s.pairing).unwrap();

    let mut wrong = s.pairing;
    wrong[31] ^= 0x80;
    assert_eq!(
        s.auth.checkmac(KEYNUM_PAIRING, &wrong),
        Err(Error::AuthMismatch)
    );
}

#[test]
fn checkmac_hard_probes_secret() {
    let mut s = setup(6);

    s.auth.checkmac_hard(KEYNUM_PAIRING, &s.pairing).unwrap();
    assert_eq!(
        s.auth.checkmac_hard(KEYNUM_PAIRING, &[0u8; 32]),
        Err(Error::AuthMismatch)
    );
}

#[test]
fn checkmac_transport_failure_is_distinct() {
    let mut s = setup(7);

    // Nonce ok, then the CheckMac response never arrives
    s.sim.inject(Fault::Clean);
    for _ in 0..Config::firmware().attempts() {
        s.sim.inject(Fault::Silent);
    }

    let e = s.auth.checkmac(KEYNUM_PAIRING, &s.pairing).unwrap_err();

    assert_eq!(e, Error::Exhausted);
    assert!(e.is_transport());
}
