// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command and response framing
//!
//! ## Command encoding:
//! ```text
//! +--------+------------+--------+----+--------+--------+------ ~ ------+-------+-------+
//! | IOFLAG | FRAMED_LEN | OPCODE | P1 | P2_LSB | P2_MSB |  BODY (0..N)  | CRC_0 | CRC_1 |
//! +--------+------------+--------+----+--------+--------+------ ~ ------+-------+-------+
//!           |<------------------- FRAMED_LEN = N + 7 ------------------------------->|
//! ```
//!
//! The CRC covers `FRAMED_LEN..=BODY` (everything after the ioflag, excluding
//! the CRC itself).
//!
//! ## Response encoding:
//! ```text
//! +--------+------ ~ ------+-------+-------+
//! | LENGTH | PAYLOAD (N)   | CRC_0 | CRC_1 |      LENGTH = N + 3
//! +--------+------ ~ ------+-------+-------+
//! ```
//!
//! A 4-byte response carries a single [ChipStatus][crate::ChipStatus] byte.

use encdec::{Decode, Encode};
use static_assertions::const_assert_eq;

use crate::{crc::Crc16, IoFlag, Opcode};

/// Command header length (including the ioflag)
pub const HEADER_LEN: usize = 6;

/// Framing overhead included in `framed_len` (length, opcode, p1, p2, crc)
pub const FRAME_OVERHEAD: usize = 7;

/// Response framing overhead (length, crc)
pub const RESP_OVERHEAD: usize = 3;

/// Length of a status-only response
pub const STATUS_LEN: usize = 4;

/// Maximum framed command length accepted by the chip
pub const MAX_COMMAND_LEN: usize = 155;

/// Maximum command body length
pub const MAX_BODY_LEN: usize = MAX_COMMAND_LEN - FRAME_OVERHEAD;

/// CRC length
pub const CRC_LEN: usize = 2;

/// Framing errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FrameError {
    /// Invalid or mismatched length
    Length,
    /// CRC mismatch
    Crc,
    /// Unrecognised ioflag
    IoFlag(u8),
    /// Unrecognised opcode
    Opcode(u8),
}

impl From<encdec::Error> for FrameError {
    fn from(_: encdec::Error) -> Self {
        FrameError::Length
    }
}

/// Fixed command header
#[derive(Copy, Clone, PartialEq, Eq, Debug, Encode, Decode)]
pub struct CommandHeader {
    pub ioflag: u8,
    pub framed_len: u8,
    pub opcode: u8,
    pub p1: u8,
    pub p2_lsb: u8,
    pub p2_msb: u8,
}

const_assert_eq!(core::mem::size_of::<CommandHeader>(), HEADER_LEN);

impl CommandHeader {
    /// Param2 value
    pub const fn p2(&self) -> u16 {
        u16::from_le_bytes([self.p2_lsb, self.p2_msb])
    }

    /// Encode header to wire bytes
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut b = [0u8; HEADER_LEN];

        // Fixed-size fields into a fixed-size buffer, encoding cannot fail
        let _ = self.encode(&mut b);

        b
    }
}

/// Secure element command
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Command<'a> {
    pub opcode: Opcode,
    pub p1: u8,
    pub p2: u16,
    pub body: &'a [u8],
}

impl<'a> Command<'a> {
    /// Create a new command with no body
    pub const fn new(opcode: Opcode, p1: u8, p2: u16) -> Self {
        Self {
            opcode,
            p1,
            p2,
            body: &[],
        }
    }

    /// Attach a body to the command
    pub fn with_body(self, body: &'a [u8]) -> Self {
        Self { body, ..self }
    }

    /// Compute the `framed_len` field, checking the command fits a frame
    pub fn framed_len(&self) -> Result<u8, FrameError> {
        let n = self.body.len() + FRAME_OVERHEAD;
        if n > MAX_COMMAND_LEN {
            return Err(FrameError::Length);
        }
        Ok(n as u8)
    }

    /// Build the command header
    pub fn header(&self) -> Result<CommandHeader, FrameError> {
        Ok(CommandHeader {
            ioflag: IoFlag::Cmd as u8,
            framed_len: self.framed_len()?,
            opcode: self.opcode as u8,
            p1: self.p1,
            p2_lsb: self.p2 as u8,
            p2_msb: (self.p2 >> 8) as u8,
        })
    }

    /// Compute the frame CRC (header after the ioflag, chained over the body)
    pub fn crc(&self) -> Result<[u8; CRC_LEN], FrameError> {
        let h = self.header()?.to_bytes();

        let mut c = Crc16::new();
        c.update(&h[1..]);
        c.update(self.body);

        Ok(c.to_bytes())
    }

    /// Encoded frame length (including ioflag)
    pub fn encode_len(&self) -> usize {
        HEADER_LEN + self.body.len() + CRC_LEN
    }

    /// Encode the complete frame (ioflag through CRC)
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, FrameError> {
        let n = self.encode_len();
        if buff.len() < n {
            return Err(FrameError::Length);
        }

        let h = self.header()?;
        let mut i = h.encode(buff)?;

        buff[i..][..self.body.len()].copy_from_slice(self.body);
        i += self.body.len();

        buff[i..][..CRC_LEN].copy_from_slice(&self.crc()?);
        i += CRC_LEN;

        Ok(i)
    }

    /// Decode a complete frame (ioflag through CRC), validating length and CRC
    pub fn decode(buff: &'a [u8]) -> Result<Self, FrameError> {
        let (h, _) = CommandHeader::decode(buff)?;

        if h.ioflag != IoFlag::Cmd as u8 {
            return Err(FrameError::IoFlag(h.ioflag));
        }

        // Check declared length against what was received
        let framed_len = h.framed_len as usize;
        if framed_len < FRAME_OVERHEAD || buff.len() != framed_len + 1 {
            return Err(FrameError::Length);
        }

        // Check CRC over everything after the ioflag
        let (data, crc) = buff[1..].split_at(framed_len - CRC_LEN);
        if crc != Crc16::new().chain(data).to_bytes() {
            return Err(FrameError::Crc);
        }

        let opcode = Opcode::try_from(h.opcode).map_err(|_| FrameError::Opcode(h.opcode))?;

        Ok(Self {
            opcode,
            p1: h.p1,
            p2: h.p2(),
            body: &buff[HEADER_LEN..][..framed_len - FRAME_OVERHEAD],
        })
    }
}

/// Check a received response frame, the length byte must match the
/// number of bytes received and the trailing CRC must match
pub fn check_response(frame: &[u8]) -> bool {
    let n = frame.len();

    if n < RESP_OVERHEAD || frame[0] as usize != n {
        return false;
    }

    let (data, crc) = frame.split_at(n - CRC_LEN);
    crc == Crc16::new().chain(data).to_bytes()
}

/// Fetch the status code from a status-only response
pub fn status_code(frame: &[u8]) -> Option<u8> {
    match frame {
        [l, code, ..] if *l as usize == STATUS_LEN => Some(*code),
        _ => None,
    }
}

/// Encode a response frame wrapping `payload`
pub fn encode_response(payload: &[u8], buff: &mut [u8]) -> Result<usize, FrameError> {
    let n = payload.len() + RESP_OVERHEAD;
    if n > u8::MAX as usize || buff.len() < n {
        return Err(FrameError::Length);
    }

    buff[0] = n as u8;
    buff[1..][..payload.len()].copy_from_slice(payload);

    let crc = Crc16::new().chain(&buff[..n - CRC_LEN]).to_bytes();
    buff[n - CRC_LEN..n].copy_from_slice(&crc);

    Ok(n)
}

/// Encode a status-only response
pub fn encode_status(status: u8, buff: &mut [u8]) -> Result<usize, FrameError> {
    encode_response(&[status], buff)
}
