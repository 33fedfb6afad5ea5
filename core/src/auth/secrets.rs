// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::KEY_LEN;

/// Length of the chip serial number
pub const SERIAL_LEN: usize = 8;

/// Host-held secrets shared with a paired secure element
pub trait Secrets {
    /// Pairing secret, matching the contents of the pairing key slot
    fn pairing_secret(&self) -> &[u8; KEY_LEN];

    /// Chip serial number
    fn serial_number(&self) -> &[u8; SERIAL_LEN];
}

impl<T: Secrets> Secrets for &T {
    fn pairing_secret(&self) -> &[u8; KEY_LEN] {
        T::pairing_secret(self)
    }

    fn serial_number(&self) -> &[u8; SERIAL_LEN] {
        T::serial_number(self)
    }
}

/// In-memory secrets, typically loaded from protected flash at boot
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RomSecrets {
    pub pairing_secret: [u8; KEY_LEN],
    pub serial_number: [u8; SERIAL_LEN],
}

impl RomSecrets {
    pub const fn new(pairing_secret: [u8; KEY_LEN], serial_number: [u8; SERIAL_LEN]) -> Self {
        Self {
            pairing_secret,
            serial_number,
        }
    }
}

impl Secrets for RomSecrets {
    fn pairing_secret(&self) -> &[u8; KEY_LEN] {
        &self.pairing_secret
    }

    fn serial_number(&self) -> &[u8; SERIAL_LEN] {
        &self.serial_number
    }
}

impl fmt::Debug for RomSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RomSecrets")
            .field("serial_number", &self.serial_number)
            .finish_non_exhaustive()
    }
}
