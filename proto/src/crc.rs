// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chained CRC-16 used to protect command and response frames
//!
//! Polynomial `0x8005`, zero seed, data bits consumed LSB first while the
//! register shifts left. The register is exposed as a little-endian byte
//! pair so a frame can be checksummed in fragments.

/// CRC polynomial
pub const POLYNOMIAL: u16 = 0x8005;

/// Chainable CRC-16 register
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Crc16(u16);

impl Crc16 {
    /// Create a new (zero seeded) register
    pub const fn new() -> Self {
        Self(0)
    }

    /// Restore a register from a previously emitted byte pair
    pub const fn from_bytes(b: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(b))
    }

    /// Feed data through the register
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        let mut reg = self.0;

        for d in data {
            for i in 0..8 {
                let data_bit = (d >> i) & 1;
                let crc_bit = (reg >> 15) as u8;

                reg <<= 1;

                if data_bit != crc_bit {
                    reg ^= POLYNOMIAL;
                }
            }
        }

        self.0 = reg;
        self
    }

    /// Consume data returning the updated register
    pub fn chain(mut self, data: &[u8]) -> Self {
        self.update(data);
        self
    }

    /// Register value
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// Register as a little-endian byte pair (wire order)
    pub const fn to_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

/// Continue a CRC computation over `data`, reading and updating the register in `crc`
pub fn crc16_chain(data: &[u8], crc: &mut [u8; 2]) {
    *crc = Crc16::from_bytes(*crc).chain(data).to_bytes();
}

/// Compute a zero-seeded CRC over `data`
pub fn crc16(data: &[u8]) -> [u8; 2] {
    Crc16::new().chain(data).to_bytes()
}
