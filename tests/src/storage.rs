// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Encrypted storage tests

use log::info;
use rand_core::CryptoRngCore;

use secel_core::{
    auth::{Auth, Secrets, KEY_LEN},
    proto::zone::BLOCK_SIZE,
    Error, Exchange,
};

use crate::{DATA_SLOT, WRITE_KEY_SLOT};

/// Write `data` to [DATA_SLOT] then verify the first block via GenDig
pub fn test<X: Exchange, S: Secrets, R: CryptoRngCore>(
    a: &mut Auth<X, S, R>,
    write_key: &[u8; KEY_LEN],
    data: &[u8],
) -> anyhow::Result<()> {
    info!(
        "writing {} bytes to slot {} (key {})",
        data.len(),
        DATA_SLOT,
        WRITE_KEY_SLOT
    );

    a.encrypted_write(DATA_SLOT, WRITE_KEY_SLOT, write_key, data)?;

    // Slot digests cover the first block, zero padded
    let mut first = [0u8; BLOCK_SIZE];
    let n = data.len().min(BLOCK_SIZE);
    first[..n].copy_from_slice(&data[..n]);

    info!("verifying slot contents");

    a.checkmac_hard(DATA_SLOT, &first)?;

    first[0] ^= 0xff;
    match a.checkmac_hard(DATA_SLOT, &first) {
        Err(Error::AuthMismatch) => Ok(()),
        Ok(_) => anyhow::bail!("modified contents accepted"),
        Err(e) => Err(e.into()),
    }
}
