// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol scenarios for single-wire secure elements
//!
//! Scenarios are generic over [Exchange][secel_core::Exchange] for reuse
//! against hardware or the [simulator][secel_sim], with [provision]
//! preparing a simulated chip in the slot layout the scenarios expect.

use secel_core::{
    auth::{RomSecrets, KEY_LEN},
    proto::KEYNUM_PAIRING,
};
use secel_sim::{SimHandle, SlotConfig};


pub mod pairing;

pub mod storage;

pub mod tempkey;

/// Key slot authorising writes to [DATA_SLOT]
pub const WRITE_KEY_SLOT: u8 = 14;

/// Secret slot written by the storage scenario
pub const DATA_SLOT: u8 = 9;

/// Provision a simulated chip with pairing and write keys, returning the
/// matching host secrets
pub fn provision(sim: &SimHandle, pairing: &[u8; KEY_LEN], write_key: &[u8; KEY_LEN]) -> RomSecrets {
    sim.with(|c| {
        c.provision_key(KEYNUM_PAIRING, pairing, KEYNUM_PAIRING);
        c.provision_key(WRITE_KEY_SLOT, write_key, WRITE_KEY_SLOT);
        c.set_slot_config(
            DATA_SLOT,
            SlotConfig {
                secret: true,
                write_key: WRITE_KEY_SLOT,
            },
        );

        RomSecrets::new(*pairing, c.host_serial())
    })
}
