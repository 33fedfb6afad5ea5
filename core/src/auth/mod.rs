// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Authentication and protected storage protocols
//!
//! The [Auth] engine composes [Exchange] commands with host-side digest
//! computation to:
//!
//! - establish a TempKey known to both host and chip ([Auth::pick_nonce])
//! - bind a slot's contents to that TempKey ([Auth::gendig_slot])
//! - prove possession of a shared secret to the chip ([Auth::checkmac],
//!   [Auth::pair_unlock])
//! - verify the chip holds the expected secret and state
//!   ([Auth::is_correct_tempkey], [Auth::checkmac_hard])
//! - write encrypted and authenticated data to protected slots
//!   ([Auth::encrypted_write32], [Auth::encrypted_write])
//!
//! Every operation ends by putting the chip to sleep. A chip that has just
//! returned a good response is idle and ignores that sleep, which is what
//! allows TempKey to carry from one command to the next.
//!
//! Note that single-byte status responses are not authenticated, an
//! active attacker on the bus can replace them. [Auth::checkmac] is
//! suitable for authorising actions inside the chip, not for
//! authenticating the chip to the host.

use constant_time_eq::constant_time_eq_32;
use rand_core::{CryptoRngCore, OsRng};
use zeroize::Zeroizing;

use secel_proto::{
    zone::{config_address, data_address, BLOCK_SIZE, CONFIG_SIZE},
    ChipStatus, Command, MacMode, Opcode, Zone, KEYNUM_PAIRING,
};

use crate::{Config, Error, Exchange};

pub mod digest;
pub use digest::{SlotDigest, TempKey, KEY_LEN, NUM_IN_LEN, OTHER_DATA_LEN};

mod secrets;
pub use secrets::{RomSecrets, Secrets, SERIAL_LEN};

/// Maximum length accepted by [Auth::encrypted_write]
pub const MAX_WRITE_LEN: usize = 3 * BLOCK_SIZE;

/// Info response length
pub const INFO_LEN: usize = 4;

/// Placeholder first block of a CheckMac body, ignored by the chip when
/// TempKey supplies the challenge
pub const CHECKMAC_FILLER: [u8; KEY_LEN] = *b"secel checkmac challenge filler.";

/// CheckMac body length (filler, response, other data)
const CHECKMAC_BODY_LEN: usize = 2 * KEY_LEN + OTHER_DATA_LEN;

/// MAC mode used to verify TempKey, key slot first then TempKey, full serial
const TEMPKEY_MAC_MODE: MacMode = MacMode::from_bits_truncate(
    MacMode::INCLUDE_SN.bits() | MacMode::TEMPKEY_SECOND.bits(),
);

/// Map a single byte status response
fn check_status(rc: u8) -> Result<(), Error> {
    match rc {
        0 => Ok(()),
        c => Err(Error::Chip(c)),
    }
}

/// Authentication protocol engine
pub struct Auth<X: Exchange, S: Secrets, R: CryptoRngCore = OsRng> {
    exchange: X,
    secrets: S,
    rng: R,
    pair_attempts: u8,
}

impl<X: Exchange, S: Secrets> Auth<X, S> {
    /// Create a new engine using the OS rng
    pub fn new(exchange: X, secrets: S) -> Self {
        Self::new_with_rng(exchange, secrets, OsRng {})
    }
}

impl<X: Exchange, S: Secrets, R: CryptoRngCore> Auth<X, S, R> {
    /// Create a new engine with the provided rng
    pub fn new_with_rng(exchange: X, secrets: S, rng: R) -> Self {
        Self {
            exchange,
            secrets,
            rng,
            pair_attempts: Config::default().pair_attempts,
        }
    }

    /// Apply attempt limits from the provided configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.pair_attempts = config.pair_attempts;
        self
    }

    /// Fetch the underlying exchange
    pub fn exchange(&mut self) -> &mut X {
        &mut self.exchange
    }

    /// Split the engine into its components
    pub fn into_inner(self) -> (X, S, R) {
        (self.exchange, self.secrets, self.rng)
    }

    /// Load TempKey from a nonce combining `num_in` with chip randomness,
    /// returning the TempKey value the chip now holds
    pub fn pick_nonce(&mut self, num_in: &[u8; NUM_IN_LEN]) -> Result<TempKey, Error> {
        let mut rand_out = [0u8; KEY_LEN];

        let p = self
            .exchange
            .write(&Command::new(Opcode::Nonce, 0, 0).with_body(num_in))?;
        let r = self.exchange.read(p, &mut rand_out);
        self.exchange.sleep();
        r?;

        Ok(digest::nonce_tempkey(&rand_out, num_in))
    }

    /// Run GenDig over data slot `slot`, expected to hold `contents`,
    /// returning the resulting TempKey
    ///
    /// The chip gives no indication whether `contents` was correct, see
    /// [Auth::is_correct_tempkey].
    pub fn gendig_slot(&mut self, slot: u8, contents: &[u8; KEY_LEN]) -> Result<SlotDigest, Error> {
        let mut num_in = [0u8; NUM_IN_LEN];
        self.rng.fill_bytes(&mut num_in);

        let tempkey = self.pick_nonce(&num_in)?;

        let p = self.exchange.write(&Command::new(
            Opcode::GenDig,
            Zone::Data as u8,
            slot as u16,
        ))?;
        let rc = self.exchange.read1(p);
        self.exchange.sleep();
        check_status(rc?)?;

        Ok(digest::gendig(contents, slot, &tempkey))
    }

    /// Check the chip TempKey matches `expected`, via a MAC over the pairing
    /// secret and TempKey
    ///
    /// Any failure (including transport errors) reports `false`.
    pub fn is_correct_tempkey(&mut self, expected: &TempKey) -> bool {
        let mut resp = [0u8; KEY_LEN];

        let r = self
            .exchange
            .write(&Command::new(
                Opcode::Mac,
                TEMPKEY_MAC_MODE.bits(),
                KEYNUM_PAIRING as u16,
            ))
            .and_then(|p| self.exchange.read(p, &mut resp));
        self.exchange.sleep();

        if let Err(_e) = r {
            #[cfg(feature = "log")]
            log::debug!("tempkey mac failed: {:?}", _e);

            return false;
        }

        let actual = Zeroizing::new(digest::mac(
            self.secrets.pairing_secret(),
            expected.as_bytes(),
            TEMPKEY_MAC_MODE,
            KEYNUM_PAIRING,
            self.secrets.serial_number(),
        ));

        constant_time_eq_32(&actual, &resp)
    }

    /// Prove possession of `secret`, held by the chip in key slot `keynum`
    pub fn checkmac(&mut self, keynum: u8, secret: &[u8; KEY_LEN]) -> Result<(), Error> {
        let mut other = [0u8; OTHER_DATA_LEN];
        let mut num_in = [0u8; NUM_IN_LEN];

        self.rng.fill_bytes(&mut other);
        self.rng.fill_bytes(&mut num_in);

        let tempkey = self.pick_nonce(&num_in)?;

        let mut body = Zeroizing::new([0u8; CHECKMAC_BODY_LEN]);
        body[..KEY_LEN].copy_from_slice(&CHECKMAC_FILLER);
        body[KEY_LEN..][..KEY_LEN]
            .copy_from_slice(&digest::checkmac_response(secret, &tempkey, &other));
        body[2 * KEY_LEN..].copy_from_slice(&other);

        // TempKey holds the second block, the first is the key slot
        let p = self.exchange.write(
            &Command::new(
                Opcode::CheckMac,
                MacMode::TEMPKEY_SECOND.bits(),
                keynum as u16,
            )
            .with_body(&body[..]),
        )?;
        let rc = self.exchange.read1(p);
        self.exchange.sleep();

        match rc? {
            0 => Ok(()),
            c if c == ChipStatus::CheckMacFail as u8 => {
                #[cfg(feature = "log")]
                log::debug!("checkmac mismatch (key {})", keynum);

                Err(Error::AuthMismatch)
            }
            _c => {
                #[cfg(feature = "log")]
                log::warn!("checkmac failed with status 0x{:02x}", _c);

                Err(Error::AuthMismatch)
            }
        }
    }

    /// Check the chip derives the same digest as the host over `secret` in
    /// key slot `keynum`
    ///
    /// Used to probe candidate secrets, so a mismatch is an expected outcome.
    pub fn checkmac_hard(&mut self, keynum: u8, secret: &[u8; KEY_LEN]) -> Result<(), Error> {
        let d = self.gendig_slot(keynum, secret)?;

        match self.is_correct_tempkey(&d.into()) {
            true => Ok(()),
            false => {
                #[cfg(feature = "log")]
                log::debug!("tempkey mismatch (key {})", keynum);

                Err(Error::AuthMismatch)
            }
        }
    }

    /// Unlock pairing, proving possession of the pairing secret
    pub fn pair_unlock(&mut self) -> Result<(), Error> {
        let secret = Zeroizing::new(*self.secrets.pairing_secret());
        let mut err = Error::AuthMismatch;

        for _i in 0..self.pair_attempts {
            match self.checkmac(KEYNUM_PAIRING, &secret) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    #[cfg(feature = "log")]
                    log::debug!("pair attempt {} failed: {:?}", _i, e);

                    err = e;
                }
            }
        }

        #[cfg(feature = "log")]
        log::error!("pairing failed after {} attempts", self.pair_attempts);

        Err(err)
    }

    /// Write one 32-byte block to data slot `slot`, encrypted and
    /// authenticated against the slot's write key
    pub fn encrypted_write32(
        &mut self,
        slot: u8,
        block: u8,
        write_keynum: u8,
        write_key: &[u8; KEY_LEN],
        data: &[u8; KEY_LEN],
    ) -> Result<(), Error> {
        self.pair_unlock()?;

        let d = self.gendig_slot(write_keynum, write_key)?;

        let p1 = Zone::Data.block_param();
        let p2 = data_address(slot, block);

        let mut body = [0u8; 2 * KEY_LEN];
        body[..KEY_LEN].copy_from_slice(&digest::xor_block(&d, data));
        body[KEY_LEN..].copy_from_slice(&digest::write_mac(&d, p1, p2, data));

        let p = self
            .exchange
            .write(&Command::new(Opcode::Write, p1, p2).with_body(&body))?;
        let rc = self.exchange.read1(p);
        self.exchange.sleep();

        check_status(rc?)
    }

    /// Write up to three blocks to data slot `slot`, zero padding the final block
    pub fn encrypted_write(
        &mut self,
        slot: u8,
        write_keynum: u8,
        write_key: &[u8; KEY_LEN],
        data: &[u8],
    ) -> Result<(), Error> {
        if data.len() > MAX_WRITE_LEN {
            return Err(Error::InvalidLength);
        }

        for (block, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            let mut b = Zeroizing::new([0u8; KEY_LEN]);
            b[..chunk.len()].copy_from_slice(chunk);

            self.encrypted_write32(slot, block as u8, write_keynum, write_key, &b)?;
        }

        Ok(())
    }

    fn read_block(&mut self, zone: Zone, address: u16, buff: &mut [u8]) -> Result<(), Error> {
        let p = self
            .exchange
            .write(&Command::new(Opcode::Read, zone.block_param(), address))?;
        self.exchange.read(p, buff)
    }

    /// Read a 32-byte block from a readable zone / slot
    pub fn read32(&mut self, zone: Zone, address: u16) -> Result<[u8; KEY_LEN], Error> {
        let mut b = [0u8; KEY_LEN];

        let r = self.read_block(zone, address, &mut b);
        self.exchange.sleep();
        r?;

        Ok(b)
    }

    /// Read the complete configuration zone
    pub fn config_read(&mut self, config: &mut [u8; CONFIG_SIZE]) -> Result<(), Error> {
        let mut r = Ok(());

        for (blk, b) in config.chunks_exact_mut(BLOCK_SIZE).enumerate() {
            r = self.read_block(Zone::Config, config_address(blk as u8), b);
            if r.is_err() {
                break;
            }
        }

        self.exchange.sleep();
        r
    }

    /// Fetch the device revision
    pub fn info(&mut self) -> Result<[u8; INFO_LEN], Error> {
        let mut b = [0u8; INFO_LEN];

        let p = self.exchange.write(&Command::new(Opcode::Info, 0, 0))?;
        let r = self.exchange.read(p, &mut b);
        self.exchange.sleep();
        r?;

        Ok(b)
    }
}
