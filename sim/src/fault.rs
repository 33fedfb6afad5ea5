// Copyright (c) 2022-2023 The MobileCoin Foundation

use strum::{Display, EnumString, EnumVariantNames};

/// Faults applied to transmitted responses, consumed one per transmit
/// request in the order injected
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum Fault {
    /// Transmit normally, used to schedule later faults
    Clean,
    /// Ignore the transmit request (response retained for the next request)
    Silent,
    /// Flip a bit in the response CRC
    CorruptCrc,
    /// Drop the final response byte
    Truncate,
    /// Send only the first two response bytes
    Short,
    /// Replace the response with a status-only frame
    #[strum(disabled)]
    Status(u8),
}
