// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Pulse encoding for the single-wire bus
//!
//! Each logical bit is sent as one UART character, LSB first, so a logical
//! byte occupies eight characters on the wire.
//!
//! ```text
//!   bit 0 -> 0x7D    bit 1 -> 0x7F
//! ```
//!
//! On receive the UART only keeps 7 bits, and a pulse is accepted as a `1`
//! when it is within one bit of `0x7F` (`0x7E` or `0x7F`).

/// Pulse pattern for a logical zero
pub const BIT0: u8 = 0x7D;

/// Pulse pattern for a logical one
pub const BIT1: u8 = 0x7F;

/// Number of pulses per logical byte
pub const PULSES_PER_BYTE: usize = 8;

/// Encode a logical byte as pulses, LSB first
pub const fn serialize(b: u8) -> [u8; PULSES_PER_BYTE] {
    let mut p = [BIT0; PULSES_PER_BYTE];

    let mut i = 0;
    while i < PULSES_PER_BYTE {
        if b & (1 << i) != 0 {
            p[i] = BIT1;
        }
        i += 1;
    }

    p
}

/// Decode a single received pulse
pub const fn decode_pulse(p: u8) -> bool {
    (p ^ BIT1) < 2
}

/// Decode one group of pulses to a logical byte
pub fn decode(pulses: &[u8; PULSES_PER_BYTE]) -> u8 {
    pulses
        .iter()
        .enumerate()
        .filter(|(_, p)| decode_pulse(**p))
        .fold(0u8, |v, (i, _)| v | (1 << i))
}

/// Reconstruct logical bytes from received pulses, returning the number of bytes written
///
/// Trailing pulses that do not form a complete byte are ignored, decoding
/// stops once `into` is full.
pub fn deserialize(from: &[u8], into: &mut [u8]) -> usize {
    let mut n = 0;

    for (chunk, out) in from.chunks_exact(PULSES_PER_BYTE).zip(into.iter_mut()) {
        let mut p = [0u8; PULSES_PER_BYTE];
        p.copy_from_slice(chunk);

        *out = decode(&p);
        n += 1;
    }

    n
}
