// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Secure element behavioural model
//!
//! Receives host characters (pulses and wake tokens), assembles command
//! frames, executes them against modelled TempKey / slot state, and stages
//! framed responses for transmission.

use std::collections::VecDeque;

use log::{debug, trace, warn};
use rand::{rngs::StdRng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use strum::Display;

use secel_proto::{
    frame::{encode_response, encode_status, FRAME_OVERHEAD, MAX_COMMAND_LEN},
    pulse::{self, PULSES_PER_BYTE},
    zone::{split_data_address, BLOCK_SIZE, CONFIG_SIZE, NUM_SLOTS, SIZE_32},
    ChipStatus, Command, FrameError, IoFlag, MacMode, Opcode, Zone,
};

use crate::Fault;

/// Size of a modelled data slot (three blocks)
pub const SLOT_SIZE: usize = 3 * BLOCK_SIZE;

/// Device revision returned by [Opcode::Info]
pub const REVISION: [u8; 4] = [0x00, 0x00, 0x60, 0x02];

/// Default chip serial number, SN\[0..2\] and SN\[8\] are fixed
pub const DEFAULT_SERIAL: [u8; 9] = [0x01, 0x23, 0xa1, 0xb2, 0xc3, 0xd4, 0xe5, 0xf6, 0xee];

/// Offset of slot configuration words in the config zone
const SLOT_CONFIG_OFFSET: usize = 20;

/// Chip power state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum Power {
    Sleep,
    Idle,
    Awake,
}

/// Per-slot access policy
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct SlotConfig {
    /// Slot is secret, reads are refused and writes must be encrypted
    pub secret: bool,
    /// Key slot authorising encrypted writes
    pub write_key: u8,
}

impl SlotConfig {
    /// Encode to the config zone SlotConfig word
    pub const fn to_bits(&self) -> u16 {
        let mut v = ((self.write_key as u16) & 0x0f) << 8;
        if self.secret {
            // IsSecret, WriteConfig = Encrypt
            v |= (1 << 7) | (0b0100 << 12);
        }
        v
    }
}

/// TempKey register
#[derive(Clone, PartialEq, Eq, Debug)]
struct TempKey {
    value: [u8; 32],
    /// Slot digested by the most recent GenDig
    gendig: Option<u8>,
}

/// Modelled secure element
pub struct SimChip {
    power: Power,
    pulses: Vec<u8>,
    command: Option<Vec<u8>>,
    response: Option<Vec<u8>>,
    outgoing: VecDeque<u8>,
    tempkey: Option<TempKey>,

    serial: [u8; 9],
    slots: [[u8; SLOT_SIZE]; NUM_SLOTS],
    slot_config: [SlotConfig; NUM_SLOTS],

    rng: StdRng,
    faults: VecDeque<Fault>,
    history: Vec<Opcode>,
}

impl SimChip {
    /// Create a new (asleep, blank) chip with a seeded rng
    pub fn new(seed: u64) -> Self {
        Self {
            power: Power::Sleep,
            pulses: Vec::with_capacity(PULSES_PER_BYTE),
            command: None,
            response: None,
            outgoing: VecDeque::new(),
            tempkey: None,
            serial: DEFAULT_SERIAL,
            slots: [[0u8; SLOT_SIZE]; NUM_SLOTS],
            slot_config: [SlotConfig::default(); NUM_SLOTS],
            rng: StdRng::seed_from_u64(seed),
            faults: VecDeque::new(),
            history: Vec::new(),
        }
    }

    /// Store a secret key in `slot`, writable only under `write_key`
    pub fn provision_key(&mut self, slot: u8, key: &[u8; 32], write_key: u8) {
        let s = slot as usize;

        self.slots[s] = [0u8; SLOT_SIZE];
        self.slots[s][..32].copy_from_slice(key);
        self.slot_config[s] = SlotConfig {
            secret: true,
            write_key,
        };
    }

    /// Set the access policy for `slot`
    pub fn set_slot_config(&mut self, slot: u8, config: SlotConfig) {
        self.slot_config[slot as usize] = config;
    }

    /// Fetch slot contents
    pub fn slot(&self, slot: u8) -> &[u8; SLOT_SIZE] {
        &self.slots[slot as usize]
    }

    /// Serial number as held by the host (SN\[0..8\])
    pub fn host_serial(&self) -> [u8; 8] {
        let mut s = [0u8; 8];
        s.copy_from_slice(&self.serial[..8]);
        s
    }

    /// Current power state
    pub fn power(&self) -> Power {
        self.power
    }

    /// Current TempKey value, if valid
    pub fn tempkey(&self) -> Option<[u8; 32]> {
        self.tempkey.as_ref().map(|t| t.value)
    }

    /// Commands executed, in order
    pub fn history(&self) -> &[Opcode] {
        &self.history
    }

    /// Queue a fault against future transmit requests
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push_back(fault);
    }

    /// Build the configuration zone
    pub fn config_zone(&self) -> [u8; CONFIG_SIZE] {
        let mut c = [0u8; CONFIG_SIZE];

        c[0..4].copy_from_slice(&self.serial[0..4]);
        c[4..8].copy_from_slice(&REVISION);
        c[8..13].copy_from_slice(&self.serial[4..9]);

        for (i, s) in self.slot_config.iter().enumerate() {
            let o = SLOT_CONFIG_OFFSET + i * 2;
            c[o..o + 2].copy_from_slice(&s.to_bits().to_le_bytes());
        }

        c
    }

    /// Check whether response pulses are staged for transmission
    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Take staged response pulses
    pub fn take_outgoing(&mut self) -> Vec<u8> {
        self.outgoing.drain(..).collect()
    }

    /// Handle a character written by the host
    pub fn on_char(&mut self, c: u8) {
        if c == secel_core::WAKE_TOKEN {
            self.wake();
            return;
        }

        // Nothing but a wake token is seen while idle or asleep
        if self.power != Power::Awake {
            return;
        }

        self.pulses.push(c);
        if self.pulses.len() < PULSES_PER_BYTE {
            return;
        }

        let mut p = [0u8; PULSES_PER_BYTE];
        p.copy_from_slice(&self.pulses);
        self.pulses.clear();

        self.on_byte(pulse::decode(&p));
    }

    fn wake(&mut self) {
        trace!("wake from {}", self.power);

        self.pulses.clear();
        self.command = None;

        if self.power == Power::Sleep {
            self.response = Some(status_frame(ChipStatus::AfterWake as u8));
        }
        self.power = Power::Awake;
    }

    fn on_byte(&mut self, b: u8) {
        if let Some(cmd) = self.command.as_mut() {
            cmd.push(b);

            let total = cmd[1] as usize + 1;
            if total < FRAME_OVERHEAD + 1 || total > MAX_COMMAND_LEN + 1 {
                warn!("invalid command length {}", cmd[1]);
                self.command = None;
                self.response = Some(status_frame(ChipStatus::CommsError as u8));
            } else if cmd.len() == total {
                if let Some(frame) = self.command.take() {
                    self.response = Some(self.process(&frame));
                }
            }

            return;
        }

        match IoFlag::try_from(b) {
            Ok(IoFlag::Cmd) => self.command = Some(vec![b]),
            Ok(IoFlag::Tx) => self.transmit(),
            Ok(IoFlag::Idle) => {
                self.power = Power::Idle;
                self.response = None;
            }
            Ok(IoFlag::Sleep) => {
                self.power = Power::Sleep;
                self.response = None;
                self.tempkey = None;
            }
            Err(_) => debug!("ignoring byte 0x{:02x}", b),
        }
    }

    fn transmit(&mut self) {
        let mut frame = match &self.response {
            Some(r) => r.clone(),
            None => return,
        };

        match self.faults.pop_front() {
            None | Some(Fault::Clean) => (),
            Some(Fault::Silent) => return,
            Some(Fault::CorruptCrc) => {
                if let Some(b) = frame.last_mut() {
                    *b ^= 0x01;
                }
            }
            Some(Fault::Truncate) => {
                frame.pop();
            }
            Some(Fault::Short) => frame.truncate(2),
            Some(Fault::Status(code)) => frame = status_frame(code),
        }

        self.outgoing = frame.iter().flat_map(|b| pulse::serialize(*b)).collect();
    }

    fn process(&mut self, frame: &[u8]) -> Vec<u8> {
        let cmd = match Command::decode(frame) {
            Ok(c) => c,
            Err(FrameError::Opcode(op)) => {
                warn!("unsupported opcode 0x{:02x}", op);
                return status_frame(ChipStatus::ParseError as u8);
            }
            Err(e) => {
                warn!("command decode failed: {:?}", e);
                return status_frame(ChipStatus::CommsError as u8);
            }
        };

        debug!(
            "exec {} p1: 0x{:02x} p2: 0x{:04x} ({} byte body)",
            cmd.opcode,
            cmd.p1,
            cmd.p2,
            cmd.body.len()
        );
        self.history.push(cmd.opcode);

        let r = match cmd.opcode {
            Opcode::Nonce => self.nonce(&cmd),
            Opcode::GenDig => self.gendig(&cmd),
            Opcode::Mac => self.mac(&cmd),
            Opcode::CheckMac => self.checkmac(&cmd),
            Opcode::Write => self.write(&cmd),
            Opcode::Read => self.read(&cmd),
            Opcode::Info => self.info(&cmd),
        };

        match r {
            Ok(payload) => {
                let mut b = [0u8; 128];
                match encode_response(&payload, &mut b) {
                    Ok(n) => b[..n].to_vec(),
                    Err(_) => status_frame(ChipStatus::ExecutionError as u8),
                }
            }
            Err(s) => {
                debug!("{} failed: {}", cmd.opcode, s);
                status_frame(s as u8)
            }
        }
    }

    fn tempkey_valid(&self) -> Result<&TempKey, ChipStatus> {
        self.tempkey.as_ref().ok_or(ChipStatus::ExecutionError)
    }

    fn key(&self, keynum: u16) -> Result<&[u8], ChipStatus> {
        self.slots
            .get(keynum as usize)
            .map(|s| &s[..32])
            .ok_or(ChipStatus::ParseError)
    }

    fn nonce(&mut self, cmd: &Command) -> Result<Vec<u8>, ChipStatus> {
        if cmd.p1 != 0 || cmd.body.len() != 20 {
            return Err(ChipStatus::ParseError);
        }

        let mut rand_out = [0u8; 32];
        self.rng.fill_bytes(&mut rand_out);

        let mut h = Sha256::new();
        h.update(rand_out);
        h.update(cmd.body);
        h.update([cmd.opcode as u8, cmd.p1, cmd.p2 as u8]);

        self.tempkey = Some(TempKey {
            value: h.finalize().into(),
            gendig: None,
        });

        Ok(rand_out.to_vec())
    }

    fn gendig(&mut self, cmd: &Command) -> Result<Vec<u8>, ChipStatus> {
        if cmd.p1 != Zone::Data as u8 {
            return Err(ChipStatus::ParseError);
        }

        let key = self.key(cmd.p2)?;
        let tk = self.tempkey_valid()?;
        let [p2_lsb, p2_msb] = cmd.p2.to_le_bytes();

        let mut h = Sha256::new();
        h.update(key);
        h.update([cmd.opcode as u8, cmd.p1, p2_lsb, p2_msb]);
        h.update([self.serial[8], self.serial[0], self.serial[1]]);
        h.update([0u8; 25]);
        h.update(tk.value);

        self.tempkey = Some(TempKey {
            value: h.finalize().into(),
            gendig: Some(cmd.p2 as u8),
        });

        Ok(vec![ChipStatus::Success as u8])
    }

    fn mac(&mut self, cmd: &Command) -> Result<Vec<u8>, ChipStatus> {
        let mode = MacMode::from_bits(cmd.p1).ok_or(ChipStatus::ParseError)?;
        if mode != MacMode::INCLUDE_SN | MacMode::TEMPKEY_SECOND || !cmd.body.is_empty() {
            return Err(ChipStatus::ParseError);
        }

        let key = self.key(cmd.p2)?;
        let tk = self.tempkey_valid()?;
        let [p2_lsb, p2_msb] = cmd.p2.to_le_bytes();

        let mut h = Sha256::new();
        h.update(key);
        h.update(tk.value);
        h.update([cmd.opcode as u8, cmd.p1, p2_lsb, p2_msb]);
        h.update([0u8; 11]);
        h.update([self.serial[8]]);
        h.update(&self.serial[4..8]);
        h.update(&self.serial[0..4]);

        let r: [u8; 32] = h.finalize().into();
        Ok(r.to_vec())
    }

    fn checkmac(&mut self, cmd: &Command) -> Result<Vec<u8>, ChipStatus> {
        if cmd.p1 != MacMode::TEMPKEY_SECOND.bits() || cmd.body.len() != 77 {
            return Err(ChipStatus::ParseError);
        }

        let key = self.key(cmd.p2)?;
        let tk = self.tempkey_valid()?;
        let (resp, od) = (&cmd.body[32..64], &cmd.body[64..77]);

        let mut h = Sha256::new();
        h.update(key);
        h.update(tk.value);
        h.update(&od[0..4]);
        h.update([0u8; 8]);
        h.update(&od[4..7]);
        h.update([self.serial[8]]);
        h.update(&od[7..11]);
        h.update(&self.serial[0..2]);
        h.update(&od[11..13]);
        let expected: [u8; 32] = h.finalize().into();

        self.tempkey = None;

        match expected[..] == resp[..] {
            true => Ok(vec![ChipStatus::Success as u8]),
            false => Ok(vec![ChipStatus::CheckMacFail as u8]),
        }
    }

    fn write(&mut self, cmd: &Command) -> Result<Vec<u8>, ChipStatus> {
        if Zone::from_param(cmd.p1) != Some(Zone::Data) || cmd.p1 & SIZE_32 == 0 {
            // Config and OTP zones are locked
            return Err(ChipStatus::ExecutionError);
        }

        let (slot, block) = split_data_address(cmd.p2);
        let (s, b) = (slot as usize, block as usize);
        if b >= SLOT_SIZE / BLOCK_SIZE {
            return Err(ChipStatus::ParseError);
        }

        let config = self.slot_config[s];
        let mut data = [0u8; 32];

        match (config.secret, cmd.body.len()) {
            (false, 32) => data.copy_from_slice(cmd.body),
            (true, 64) => {
                let tk = self.tempkey.take().ok_or(ChipStatus::ExecutionError)?;
                if tk.gendig != Some(config.write_key) {
                    warn!("write to slot {} without write key digest", slot);
                    return Err(ChipStatus::ExecutionError);
                }

                for (d, (c, k)) in data.iter_mut().zip(cmd.body[..32].iter().zip(tk.value)) {
                    *d = c ^ k;
                }

                let [p2_lsb, p2_msb] = cmd.p2.to_le_bytes();
                let mut h = Sha256::new();
                h.update(tk.value);
                h.update([cmd.opcode as u8, cmd.p1, p2_lsb, p2_msb]);
                h.update([self.serial[8], self.serial[0], self.serial[1]]);
                h.update([0u8; 25]);
                h.update(data);
                let mac: [u8; 32] = h.finalize().into();

                if mac[..] != cmd.body[32..] {
                    warn!("write mac mismatch (slot {})", slot);
                    return Err(ChipStatus::CheckMacFail);
                }
            }
            _ => return Err(ChipStatus::ExecutionError),
        }

        self.slots[s][b * BLOCK_SIZE..][..BLOCK_SIZE].copy_from_slice(&data);

        Ok(vec![ChipStatus::Success as u8])
    }

    fn read(&mut self, cmd: &Command) -> Result<Vec<u8>, ChipStatus> {
        let zone = Zone::from_param(cmd.p1).ok_or(ChipStatus::ParseError)?;
        let len = if cmd.p1 & SIZE_32 != 0 { 32 } else { 4 };

        match zone {
            Zone::Config => {
                let block = ((cmd.p2 >> 3) & 0x03) as usize;
                let word = if len == 4 { (cmd.p2 & 0x07) as usize } else { 0 };

                let c = self.config_zone();
                Ok(c[block * BLOCK_SIZE + word * 4..][..len].to_vec())
            }
            Zone::Data => {
                let (slot, block) = split_data_address(cmd.p2);
                let (s, b) = (slot as usize, block as usize);

                if self.slot_config[s].secret {
                    return Err(ChipStatus::ExecutionError);
                }
                if b >= SLOT_SIZE / BLOCK_SIZE {
                    return Err(ChipStatus::ParseError);
                }

                Ok(self.slots[s][b * BLOCK_SIZE..][..len].to_vec())
            }
            Zone::Otp => Ok(vec![0xff; len]),
        }
    }

    fn info(&mut self, cmd: &Command) -> Result<Vec<u8>, ChipStatus> {
        match cmd.p1 {
            0 => Ok(REVISION.to_vec()),
            _ => Err(ChipStatus::ParseError),
        }
    }
}

/// Encode a status-only response frame
fn status_frame(code: u8) -> Vec<u8> {
    let mut b = [0u8; 4];
    // Single byte payload always fits
    let _ = encode_status(code, &mut b);
    b.to_vec()
}
