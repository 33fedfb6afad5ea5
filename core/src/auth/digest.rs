// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Host-side replicas of the chip's SHA-256 derivations
//!
//! Each function reproduces the message the chip hashes for the matching
//! command, so host and chip arrive at the same value without it crossing
//! the bus.

use core::fmt;

use constant_time_eq::constant_time_eq_32;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use secel_proto::{MacMode, Opcode, Zone, SN01, SN8};

/// Length of digests / keys / blocks handled by the protocol
pub const KEY_LEN: usize = 32;

/// Host contribution to a nonce
pub const NUM_IN_LEN: usize = 20;

/// CheckMac "other data" length
pub const OTHER_DATA_LEN: usize = 13;

/// Zero padding in GenDig / Write MAC messages
const ZEROS_25: [u8; 25] = [0u8; 25];

macro_rules! secret_digest {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; KEY_LEN]);

        impl $name {
            pub const fn new(value: [u8; KEY_LEN]) -> Self {
                Self(value)
            }

            pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
                &self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        /// Constant time comparison
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                constant_time_eq_32(&self.0, &other.0)
            }
        }

        impl Eq for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(..)"))
            }
        }
    };
}

secret_digest!(
    /// Expected contents of the chip's TempKey register
    TempKey
);

secret_digest!(
    /// Digest binding a slot's contents to a fresh nonce, matching TempKey
    /// following [Opcode::GenDig]
    SlotDigest
);

impl From<SlotDigest> for TempKey {
    fn from(d: SlotDigest) -> Self {
        TempKey::new(*d.as_bytes())
    }
}

fn finalize(h: Sha256) -> [u8; KEY_LEN] {
    h.finalize().into()
}

/// TempKey following a [Opcode::Nonce] with host input `num_in`
/// and chip output `rand_out`
pub fn nonce_tempkey(rand_out: &[u8; KEY_LEN], num_in: &[u8; NUM_IN_LEN]) -> TempKey {
    let mut h = Sha256::new();

    h.update(rand_out);
    h.update(num_in);
    h.update([Opcode::Nonce as u8, 0x00, 0x00]);

    TempKey::new(finalize(h))
}

/// TempKey following a [Opcode::GenDig] over data slot `slot`
pub fn gendig(contents: &[u8; KEY_LEN], slot: u8, tempkey: &TempKey) -> SlotDigest {
    let mut h = Sha256::new();

    h.update(contents);
    h.update([Opcode::GenDig as u8, Zone::Data as u8, slot, 0x00]);
    h.update([SN8, SN01[0], SN01[1]]);
    h.update(ZEROS_25);
    h.update(tempkey.as_bytes());

    SlotDigest::new(finalize(h))
}

/// Response to [Opcode::Mac] for `key` in slot `keynum`, with TempKey as the
/// second message block and the full serial number included
pub fn mac(
    key: &[u8; KEY_LEN],
    challenge: &[u8; KEY_LEN],
    mode: MacMode,
    keynum: u8,
    serial: &[u8; 8],
) -> [u8; KEY_LEN] {
    let mut h = Sha256::new();

    h.update(key);
    h.update(challenge);
    h.update([Opcode::Mac as u8, mode.bits(), keynum, 0x00]);
    h.update([0u8; 11]);
    h.update([SN8]);
    h.update(&serial[4..8]);
    h.update(&serial[0..4]);

    finalize(h)
}

/// Expected response for [Opcode::CheckMac] against `secret`
pub fn checkmac_response(
    secret: &[u8; KEY_LEN],
    tempkey: &TempKey,
    other: &[u8; OTHER_DATA_LEN],
) -> [u8; KEY_LEN] {
    let mut h = Sha256::new();

    h.update(secret);
    h.update(tempkey.as_bytes());
    h.update(&other[0..4]);
    h.update([0u8; 8]);
    h.update(&other[4..7]);
    h.update([SN8]);
    h.update(&other[7..11]);
    h.update(SN01);
    h.update(&other[11..13]);

    finalize(h)
}

/// Authenticating MAC for an encrypted [Opcode::Write] of `data`
pub fn write_mac(digest: &SlotDigest, p1: u8, p2: u16, data: &[u8; KEY_LEN]) -> [u8; KEY_LEN] {
    let [p2_lsb, p2_msb] = p2.to_le_bytes();
    let mut h = Sha256::new();

    h.update(digest.as_bytes());
    h.update([Opcode::Write as u8, p1, p2_lsb, p2_msb]);
    h.update([SN8, SN01[0], SN01[1]]);
    h.update(ZEROS_25);
    h.update(data);

    finalize(h)
}

/// Encrypt (or decrypt) a block against a slot digest
pub fn xor_block(digest: &SlotDigest, data: &[u8; KEY_LEN]) -> [u8; KEY_LEN] {
    let mut out = *data;
    for (o, k) in out.iter_mut().zip(digest.as_bytes()) {
        *o ^= k;
    }
    out
}
