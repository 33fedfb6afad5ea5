// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Memory zones and addressing for [Read][crate::Opcode::Read] /
//! [Write][crate::Opcode::Write] / [GenDig][crate::Opcode::GenDig] commands

use num_enum::TryFromPrimitive;
use strum::{Display, EnumString};

/// Param1 flag selecting a 32-byte (rather than 4-byte) access
pub const SIZE_32: u8 = 0x80;

/// Size of a zone block in bytes
pub const BLOCK_SIZE: usize = 32;

/// Size of the configuration zone in bytes
pub const CONFIG_SIZE: usize = 128;

/// Number of data slots
pub const NUM_SLOTS: usize = 16;

/// Secure element memory zones
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, TryFromPrimitive)]
#[repr(u8)]
pub enum Zone {
    Config = 0x00,
    Otp = 0x01,
    Data = 0x02,
}

impl Zone {
    /// Param1 for a 32-byte access to this zone
    pub const fn block_param(self) -> u8 {
        self as u8 | SIZE_32
    }

    /// Decode the zone from a Param1 value
    pub fn from_param(p1: u8) -> Option<Self> {
        Self::try_from(p1 & 0x03).ok()
    }
}

/// Param2 address of a 32-byte block in the configuration zone
pub const fn config_address(block: u8) -> u16 {
    (block as u16) << 3
}

/// Param2 address of a 32-byte block within a data slot
pub const fn data_address(slot: u8, block: u8) -> u16 {
    ((block as u16) << 8) | ((slot as u16) << 3)
}

/// Split a data zone Param2 address into `(slot, block)`
pub const fn split_data_address(p2: u16) -> (u8, u8) {
    (((p2 >> 3) & 0x0f) as u8, (p2 >> 8) as u8)
}
