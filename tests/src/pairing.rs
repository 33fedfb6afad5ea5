// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Pairing secret tests

use log::info;
use rand_core::CryptoRngCore;

use secel_core::{
    auth::{Auth, Secrets},
    proto::KEYNUM_PAIRING,
    Error, Exchange,
};

/// Unlock pairing, then check a wrong secret is refused
pub fn test<X: Exchange, S: Secrets, R: CryptoRngCore>(a: &mut Auth<X, S, R>) -> anyhow::Result<()> {
    info!("unlocking pairing");

    a.pair_unlock()?;

    info!("checking wrong secret is refused");

    match a.checkmac(KEYNUM_PAIRING, &[0u8; 32]) {
        Err(Error::AuthMismatch) => (),
        Ok(_) => anyhow::bail!("zero secret accepted by checkmac"),
        Err(e) => return Err(e.into()),
    }

    match a.checkmac_hard(KEYNUM_PAIRING, &[0u8; 32]) {
        Err(Error::AuthMismatch) => Ok(()),
        Ok(_) => anyhow::bail!("zero secret accepted by checkmac_hard"),
        Err(e) => Err(e.into()),
    }
}
