// Copyright (c) 2022-2023 The MobileCoin Foundation

use secel_core::auth::TempKey;

mod helpers;
use helpers::*;

#[test]
fn tempkey_scenario() {
    let mut s = setup(20);

    secel_tests::tempkey::test(&mut s.auth, &mut s.rng).unwrap();
}

#[test]
fn nonce_matches_chip() {
    let mut s = setup(21);

    let tk = s.auth.pick_nonce(&[0x3c; 20]).unwrap();

    // The trailing sleep is ignored by the idle chip
    assert_eq!(s.sim.with(|c| c.tempkey()), Some(*tk.as_bytes()));
}

#[test]
fn sleep_clears_tempkey() {
    let mut s = setup(22);

    let tk = s.auth.pick_nonce(&[0x3c; 20]).unwrap();

    // Wake then sleep discards volatile state
    s.auth.exchange().wake();
    s.auth.exchange().sleep();

    assert!(!s.auth.is_correct_tempkey(&tk));
    assert_eq!(s.sim.with(|c| c.tempkey()), None);
}

#[test]
fn gendig_digest_matches_chip() {
    let mut s = setup(23);

    let d = s
        .auth
        .gendig_slot(secel_tests::WRITE_KEY_SLOT, &s.write_key)
        .unwrap();

    assert_eq!(s.sim.with(|c| c.tempkey()), Some(*d.as_bytes()));
    assert!(s.auth.is_correct_tempkey(&TempKey::from(d)));
}
