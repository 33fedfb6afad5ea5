// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Framed command / response exchange with retry
//!
//! Commands are sent as a single transaction following a wake token, the
//! response is then polled by repeatedly issuing [IoFlag::Tx] until a
//! well-formed frame is received or the retry budget is spent.
//!
//! Each attempt is classified as follows:
//!
//! - fewer than 4 bytes: chip not ready (or a short read), retry
//! - length byte mismatch: retry, unless the chip sent a 4-byte status frame
//!   in place of the expected response in which case the status is returned
//! - CRC mismatch: retry
//!
//! [Opcode::Info] responses bypass length and CRC validation.

use heapless::Vec;
use secel_proto::{
    frame::{self, RESP_OVERHEAD, STATUS_LEN},
    pulse::{self, PULSES_PER_BYTE},
    crc::Crc16,
    ChipStatus, Command, IoFlag, Opcode,
};

use crate::{
    link::{Link, Rx},
    Clock, Config, Counter, Error, Metrics, Stats, Uart,
};

/// Maximum response payload accepted by [Exchange::read]
pub const MAX_READ: usize = 64;

/// Maximum response frame length
const MAX_FRAME: usize = MAX_READ + RESP_OVERHEAD;

/// Maximum number of pulses captured per response (one spare byte for framing slop)
const MAX_PULSES: usize = (MAX_FRAME + 1) * PULSES_PER_BYTE;

/// Handle for an issued command, consumed when the response is read
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct Pending {
    opcode: Opcode,
}

impl Pending {
    /// Create a pending handle for the provided opcode
    pub const fn new(opcode: Opcode) -> Self {
        Self { opcode }
    }

    /// Opcode of the issued command
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }
}

/// Command exchange with a secure element
pub trait Exchange {
    /// Wake the chip and send a command, returning a handle for the response
    fn write(&mut self, cmd: &Command) -> Result<Pending, Error>;

    /// Read the response to a pending command, filling `buff` with the payload
    fn read(&mut self, pending: Pending, buff: &mut [u8]) -> Result<(), Error>;

    /// Read a single byte (status) response
    fn read1(&mut self, pending: Pending) -> Result<u8, Error> {
        let mut b = [0u8; 1];
        self.read(pending, &mut b)?;
        Ok(b[0])
    }

    /// Send a wake token
    fn wake(&mut self);

    /// Place the chip in idle mode (TempKey retained)
    fn idle(&mut self);

    /// Place the chip in sleep mode (volatile state cleared)
    fn sleep(&mut self);

    /// Keep the chip from sleeping between commands
    fn keep_alive(&mut self) {
        self.idle()
    }

    /// Reset chip volatile state
    fn reset_chip(&mut self) {
        self.sleep()
    }
}

impl<T: Exchange> Exchange for &mut T {
    fn write(&mut self, cmd: &Command) -> Result<Pending, Error> {
        T::write(self, cmd)
    }

    fn read(&mut self, pending: Pending, buff: &mut [u8]) -> Result<(), Error> {
        T::read(self, pending, buff)
    }

    fn read1(&mut self, pending: Pending) -> Result<u8, Error> {
        T::read1(self, pending)
    }

    fn wake(&mut self) {
        T::wake(self)
    }

    fn idle(&mut self) {
        T::idle(self)
    }

    fn sleep(&mut self) {
        T::sleep(self)
    }

    fn keep_alive(&mut self) {
        T::keep_alive(self)
    }

    fn reset_chip(&mut self) {
        T::reset_chip(self)
    }
}

/// Activity indicator, signalled once a command has been sent
pub trait Indicator {
    fn busy(&mut self);
}

/// No-op indicator
impl Indicator for () {
    fn busy(&mut self) {}
}

/// Outcome of a failed attempt
enum Attempt {
    /// Try again
    Retry,
    /// Chip returned an error status
    Status(u8),
}

/// Framed transport over a [Link]
pub struct Transport<U, C, M = Stats, I = ()> {
    pub(crate) link: Link<U, C, M>,
    indicator: I,
}

impl<U: Uart, C: Clock> Transport<U, C> {
    /// Create a new transport collecting [Stats]
    pub fn new(uart: U, clock: C, config: Config) -> Self {
        Self::new_with(uart, clock, Stats::new(), (), config)
    }
}

impl<U: Uart, C: Clock, M: Metrics, I: Indicator> Transport<U, C, M, I> {
    /// Create a new transport with the provided metrics sink and indicator
    pub fn new_with(uart: U, clock: C, metrics: M, indicator: I, config: Config) -> Self {
        Self {
            link: Link::new(uart, clock, metrics, config),
            indicator,
        }
    }

    /// Fetch metrics
    pub fn metrics(&self) -> &M {
        self.link.metrics()
    }

    /// Fetch mutable metrics
    pub fn metrics_mut(&mut self) -> &mut M {
        self.link.metrics_mut()
    }

    /// Fetch the underlying link
    pub fn link(&self) -> &Link<U, C, M> {
        &self.link
    }

    /// Fetch transport configuration
    pub fn config(&self) -> &Config {
        self.link.config()
    }

    /// Split the transport into its components
    pub fn into_inner(self) -> (U, C, M, I) {
        let (u, c, m) = self.link.into_inner();
        (u, c, m, self.indicator)
    }

    /// Request a response and capture it into `buff`, returning the number
    /// of whole bytes received
    ///
    /// Byte count may exceed `buff.len()`, in which case excess bytes are
    /// dropped.
    pub fn read_response(&mut self, buff: &mut [u8]) -> usize {
        let max_pulses = ((buff.len() + 1) * PULSES_PER_BYTE).min(MAX_PULSES);
        let mut raw = Vec::<u8, MAX_PULSES>::new();

        self.link.send_flag(IoFlag::Tx);
        self.link.flush_rx();

        let mut actual = 0;
        while let Rx::Byte(b) = self.link.read_byte() {
            if raw.len() < max_pulses {
                let _ = raw.push(b);
            }
            actual += 1;
        }

        // Trailing partial byte is framing noise
        actual &= !(PULSES_PER_BYTE - 1);

        pulse::deserialize(&raw[..actual.min(raw.len())], buff);

        actual / PULSES_PER_BYTE
    }

    /// Classify a received frame
    fn check(&mut self, opcode: Opcode, frame: &[u8], actual: usize) -> Result<(), Attempt> {
        let metrics = self.link.metrics_mut();

        if actual < STATUS_LEN {
            if actual == 0 {
                metrics.inc(Counter::NotReady);
            } else {
                metrics.inc(Counter::ShortRead);
            }
            return Err(Attempt::Retry);
        }

        if opcode == Opcode::Info {
            return Ok(());
        }

        if frame[0] as usize != frame.len() {
            metrics.inc(Counter::LengthError);

            if let Some(code) = frame::status_code(frame) {
                metrics.inc(Counter::ErrorCode);
                if code == ChipStatus::WatchdogExpiring as u8 {
                    metrics.inc(Counter::WatchdogTimeout);
                }

                return Err(Attempt::Status(code));
            }

            return Err(Attempt::Retry);
        }

        if actual != frame.len() || !frame::check_response(frame) {
            metrics.inc(Counter::CrcError);
            return Err(Attempt::Retry);
        }

        Ok(())
    }

    pub(crate) fn delay_us(&mut self, us: u32) {
        self.link.delay_us(us);
    }
}

impl<U: Uart, C: Clock, M: Metrics, I: Indicator> Exchange for Transport<U, C, M, I> {
    fn write(&mut self, cmd: &Command) -> Result<Pending, Error> {
        let header = cmd.header()?.to_bytes();

        #[cfg(feature = "log")]
        log::debug!(
            "cmd {} p1: 0x{:02x} p2: 0x{:04x} ({} byte body)",
            cmd.opcode,
            cmd.p1,
            cmd.p2,
            cmd.body.len()
        );

        self.wake();

        self.link.send_serialized(&header);

        let mut crc = Crc16::new();
        crc.update(&header[1..]).update(cmd.body);

        self.link.send_serialized(cmd.body);
        self.link.send_serialized(&crc.to_bytes());

        self.indicator.busy();

        Ok(Pending::new(cmd.opcode))
    }

    fn read(&mut self, pending: Pending, buff: &mut [u8]) -> Result<(), Error> {
        let len = buff.len();
        if len > MAX_READ {
            return Err(Error::InvalidLength);
        }

        let mut frame = [0u8; MAX_FRAME];
        let frame = &mut frame[..len + RESP_OVERHEAD];

        for _ in 0..self.config().attempts() {
            let actual = self.read_response(frame);

            match self.check(pending.opcode, frame, actual) {
                Ok(()) => {
                    // Info payloads are copied as received
                    let n = match pending.opcode {
                        Opcode::Info => actual.min(frame.len()) - RESP_OVERHEAD,
                        _ => len,
                    };
                    buff[..n].copy_from_slice(&frame[1..][..n]);

                    self.idle();

                    return Ok(());
                }
                Err(Attempt::Status(code)) => {
                    #[cfg(feature = "log")]
                    log::warn!("{} failed with status 0x{:02x}", pending.opcode, code);

                    return Err(Error::Chip(code));
                }
                Err(Attempt::Retry) => {
                    self.link.metrics_mut().inc(Counter::Retry);
                }
            }
        }

        #[cfg(feature = "log")]
        log::warn!("{} no response after {} attempts", pending.opcode, self.config().attempts());

        self.link.metrics_mut().inc(Counter::RetryExhausted);

        Err(Error::Exhausted)
    }

    fn wake(&mut self) {
        Transport::wake(self)
    }

    fn idle(&mut self) {
        Transport::idle(self)
    }

    fn sleep(&mut self) {
        Transport::sleep(self)
    }
}
