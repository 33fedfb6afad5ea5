// Copyright (c) 2022-2023 The MobileCoin Foundation

//! TempKey agreement tests

use log::{debug, info};
use rand_core::CryptoRngCore;

use secel_core::{
    auth::{Auth, Secrets, TempKey, NUM_IN_LEN},
    Exchange,
};

/// Load a nonce and check the chip agrees on the resulting TempKey
pub fn test<X: Exchange, S: Secrets, R: CryptoRngCore>(
    a: &mut Auth<X, S, R>,
    rng: &mut impl CryptoRngCore,
) -> anyhow::Result<()> {
    let mut num_in = [0u8; NUM_IN_LEN];
    rng.fill_bytes(&mut num_in);

    info!("picking nonce (num_in: {})", hex::encode(num_in));

    let tk = a.pick_nonce(&num_in)?;

    anyhow::ensure!(a.is_correct_tempkey(&tk), "chip tempkey mismatch");

    // TempKey survives the MAC, so a wrong guess must now be refused
    let mut wrong = *tk.as_bytes();
    wrong[0] ^= 0x01;

    debug!("checking modified tempkey is refused");
    anyhow::ensure!(
        !a.is_correct_tempkey(&TempKey::new(wrong)),
        "modified tempkey accepted"
    );

    Ok(())
}
