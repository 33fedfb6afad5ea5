// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol definitions for single-wire secure element communication
//!
//! This crate provides the wire-level vocabulary shared by the host driver
//! ([secel-core](https://docs.rs/secel-core)) and the software chip model
//! ([secel-sim](https://docs.rs/secel-sim)).
//!
//! The secure element is attached to a half-duplex UART running at 230400 baud
//! where each logical bit is carried by one UART character (see [pulse]),
//! with commands and responses protected by a chained CRC-16 (see [crc]) and
//! framed as described in [frame].
//!
//! All multi-byte fields are little-endian, matching the chip.
//!

#![no_std]

use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

pub mod crc;
pub mod frame;
pub mod pulse;
pub mod zone;

pub use frame::{Command, CommandHeader, FrameError};
pub use zone::Zone;

/// Key slot holding the pairing secret shared between host and chip
pub const KEYNUM_PAIRING: u8 = 1;

/// Fixed serial number byte SN\[8\], included in chip-side digests
pub const SN8: u8 = 0xEE;

/// Fixed serial number bytes SN\[0..2\], included in chip-side digests
pub const SN01: [u8; 2] = [0x01, 0x23];

/// Secure element command opcodes
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum Opcode {
    /// Compute a MAC over a key and TempKey
    Mac = 0x08,
    /// Write to a zone (plain or encrypted)
    Write = 0x12,
    /// Mix a slot into TempKey
    GenDig = 0x15,
    /// Load TempKey from a combined host / chip nonce
    Nonce = 0x16,
    /// Read from a zone
    Read = 0x02,
    /// Verify a host computed MAC
    CheckMac = 0x28,
    /// Fetch device revision (unframed response)
    Info = 0x30,
}

/// Bus direction / power control flags, sent as the first byte of every transaction
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum IoFlag {
    /// A command frame follows
    Cmd = 0x77,
    /// Request the chip transmit its response
    Tx = 0x88,
    /// Enter idle mode (watchdog paused, TempKey retained)
    Idle = 0xBB,
    /// Enter sleep mode (watchdog stopped, volatile state cleared)
    Sleep = 0xCC,
}

/// Status codes returned by the chip in a 4-byte response
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter, TryFromPrimitive)]
#[repr(u8)]
pub enum ChipStatus {
    /// Command executed successfully
    Success = 0x00,
    /// CheckMac or verify miscompare
    CheckMacFail = 0x01,
    /// Command was properly received but the length, opcode or parameters are illegal
    ParseError = 0x03,
    /// Computation error during ECC processing
    EccFault = 0x05,
    /// Chip is in self-test failure mode
    SelfTestError = 0x07,
    /// Command could not be executed due to chip state
    ExecutionError = 0x0F,
    /// Chip received a wake token
    AfterWake = 0x11,
    /// Insufficient time to execute before the watchdog expires
    WatchdogExpiring = 0xEE,
    /// Command was not properly received (CRC or framing error)
    CommsError = 0xFF,
}

bitflags! {
    /// Mode byte for [Opcode::Mac] and [Opcode::CheckMac] commands
    pub struct MacMode: u8 {
        /// Second 32 bytes of the message are taken from TempKey
        const TEMPKEY_SECOND = 1 << 0;
        /// First 32 bytes of the message are taken from TempKey
        const TEMPKEY_FIRST = 1 << 1;
        /// Value of TempKey.SourceFlag (0 = random nonce)
        const SOURCE_FLAG = 1 << 2;
        /// Include the full serial number in the message
        const INCLUDE_SN = 1 << 6;
    }
}
