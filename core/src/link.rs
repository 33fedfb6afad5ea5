// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Pulse level access to the single-wire bus
//!
//! The [Link] drives a half-duplex [Uart] where every character written is
//! also received (echoed) by the host. Logical bytes are expanded to pulse
//! groups via [secel_proto::pulse], and all waits are bounded by [Clock]
//! tick failsafes so a broken peripheral can never hang the caller.

use secel_proto::{pulse, IoFlag};

use crate::{Config, Counter, Metrics};

/// Single-wire UART peripheral
pub trait Uart {
    /// Transmit register empty (ready to accept a character)
    fn tx_ready(&mut self) -> bool;

    /// Transmission complete (shift register idle)
    fn tx_complete(&mut self) -> bool;

    /// Write a character to the transmit register
    fn write(&mut self, value: u8);

    /// Receive register not empty
    fn rx_ready(&mut self) -> bool;

    /// Receiver timeout (idle line) flag set
    fn rx_timeout(&mut self) -> bool;

    /// Read a character from the receive register
    fn read(&mut self) -> u8;

    /// Clear the receiver timeout flag
    fn clear_rx_timeout(&mut self);

    /// Discard any pending received characters
    fn discard_rx(&mut self);

    /// Clear overrun / framing / timeout error flags
    fn clear_errors(&mut self);
}

/// Tick source and busy-wait delays
pub trait Clock {
    /// Start a new measurement interval
    fn mark(&mut self);

    /// Ticks elapsed since the last [Clock::mark]
    fn elapsed(&mut self) -> u32;

    /// Busy-wait for the provided number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: Uart> Uart for &mut T {
    fn tx_ready(&mut self) -> bool {
        T::tx_ready(self)
    }

    fn tx_complete(&mut self) -> bool {
        T::tx_complete(self)
    }

    fn write(&mut self, value: u8) {
        T::write(self, value)
    }

    fn rx_ready(&mut self) -> bool {
        T::rx_ready(self)
    }

    fn rx_timeout(&mut self) -> bool {
        T::rx_timeout(self)
    }

    fn read(&mut self) -> u8 {
        T::read(self)
    }

    fn clear_rx_timeout(&mut self) {
        T::clear_rx_timeout(self)
    }

    fn discard_rx(&mut self) {
        T::discard_rx(self)
    }

    fn clear_errors(&mut self) {
        T::clear_errors(self)
    }
}

impl<T: Clock> Clock for &mut T {
    fn mark(&mut self) {
        T::mark(self)
    }

    fn elapsed(&mut self) -> u32 {
        T::elapsed(self)
    }

    fn delay_us(&mut self, us: u32) {
        T::delay_us(self, us)
    }
}

/// Mask applied to received characters (7-bit reception)
pub const RX_MASK: u8 = 0x7F;

/// Result of a single receive
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Rx {
    /// Character received (masked to 7 bits)
    Byte(u8),
    /// Idle line detected, the sender has finished
    Idle,
    /// Nothing received before the failsafe expired
    Failsafe,
}

/// Pulse level link over a [Uart]
pub struct Link<U, C, M> {
    uart: U,
    clock: C,
    metrics: M,
    config: Config,
}

impl<U: Uart, C: Clock, M: Metrics> Link<U, C, M> {
    /// Create a new link
    pub fn new(uart: U, clock: C, metrics: M, config: Config) -> Self {
        Self {
            uart,
            clock,
            metrics,
            config,
        }
    }

    /// Write a raw character, waiting (bounded) for the transmitter
    ///
    /// On failsafe expiry the character is written anyway.
    pub fn send_byte(&mut self, value: u8) {
        self.clock.mark();

        while !self.uart.tx_ready() {
            if self.clock.elapsed() > self.config.tx_timeout_ticks {
                #[cfg(feature = "log")]
                log::warn!("transmit failsafe");

                self.metrics.inc(Counter::TxFailsafe);
                break;
            }
        }

        self.uart.write(value);
    }

    /// Write a logical byte as a pulse group
    pub fn send_bits(&mut self, value: u8) {
        for p in pulse::serialize(value) {
            self.send_byte(p);
        }
    }

    /// Write a sequence of logical bytes
    pub fn send_serialized(&mut self, data: &[u8]) {
        for b in data {
            self.send_bits(*b);
        }
    }

    /// Write an io flag
    pub fn send_flag(&mut self, flag: IoFlag) {
        self.send_bits(flag as u8);
    }

    /// Receive a single character
    pub fn read_byte(&mut self) -> Rx {
        self.clock.mark();

        loop {
            if self.uart.rx_ready() {
                self.metrics.inc(Counter::RxByte);
                return Rx::Byte(self.uart.read() & RX_MASK);
            }

            if self.uart.rx_timeout() {
                self.uart.clear_rx_timeout();
                self.metrics.inc(Counter::RxIdle);
                return Rx::Idle;
            }

            if self.clock.elapsed() >= self.config.rx_timeout_ticks {
                self.metrics.inc(Counter::Failsafe);
                return Rx::Failsafe;
            }
        }
    }

    /// Wait for transmission to finish then discard the echo of our own
    /// characters along with any receive errors
    pub fn flush_rx(&mut self) {
        self.clock.mark();

        while !self.uart.tx_complete() {
            if self.clock.elapsed() > self.config.flush_timeout_ticks {
                break;
            }
        }

        self.clock.delay_us(self.config.flush_settle_us);

        self.uart.discard_rx();
        self.uart.clear_errors();
    }

    /// Busy-wait for the provided number of microseconds
    pub fn delay_us(&mut self, us: u32) {
        self.clock.delay_us(us);
    }

    /// Fetch link configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch metrics
    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Fetch mutable metrics
    pub fn metrics_mut(&mut self) -> &mut M {
        &mut self.metrics
    }

    /// Fetch the underlying UART
    pub fn uart(&self) -> &U {
        &self.uart
    }

    /// Fetch the underlying UART mutably
    pub fn uart_mut(&mut self) -> &mut U {
        &mut self.uart
    }

    /// Fetch the underlying clock
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Split the link into its components
    pub fn into_inner(self) -> (U, C, M) {
        (self.uart, self.clock, self.metrics)
    }
}
