// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Driver timing and retry configuration
//!
//! Timeouts are expressed in [Clock][crate::Clock] ticks and delays in
//! microseconds. The UART itself is configured by the platform as
//! described by [Config::link] (see [LinkConfig]).

/// Line rate for the single-wire UART
pub const BAUD_RATE: u32 = 230_400;

/// Receiver timeout in bit periods (idle line detection)
pub const RX_TIMEOUT_BITS: u32 = 24;

/// Delay following a wake token in normal (firmware) operation
pub const WAKE_DELAY_US: u32 = 100;

/// Delay following a wake token when running from the bootloader
pub const BOOTLOADER_WAKE_DELAY_US: u32 = 2500;

/// Default number of response retries
pub const RETRIES: u8 = 100;

/// Default number of pairing attempts
pub const PAIR_ATTEMPTS: u8 = 3;

/// UART settings required by the single-wire bus
///
/// The driver does not program the peripheral, platforms apply these when
/// constructing their [Uart][crate::Uart].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LinkConfig {
    /// Line rate
    pub baud_rate: u32,
    /// Transmit and receive share the data line
    pub half_duplex: bool,
    /// Sample each bit once rather than majority voting
    pub one_bit_sampling: bool,
    /// Receiver timeout (idle line detection) in bit periods
    pub rx_timeout_bits: u32,
}

impl LinkConfig {
    /// Settings for the chip's single-wire interface
    pub const fn single_wire() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            half_duplex: true,
            one_bit_sampling: true,
            rx_timeout_bits: RX_TIMEOUT_BITS,
        }
    }

    /// Receiver timeout in microseconds, rounded up
    pub const fn rx_timeout_us(&self) -> u32 {
        let n = self.rx_timeout_bits as u64 * 1_000_000;
        let b = self.baud_rate as u64;
        ((n + b - 1) / b) as u32
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::single_wire()
    }
}

/// Secure element driver configuration
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Config {
    /// Peripheral settings
    pub link: LinkConfig,

    /// Delay following a wake token (µs)
    pub wake_delay_us: u32,

    /// Response retries, each read makes `retries + 1` attempts
    pub retries: u8,

    /// Ticks to wait for the transmitter before giving up on a byte
    pub tx_timeout_ticks: u32,

    /// Ticks to wait for a received byte before declaring failsafe
    pub rx_timeout_ticks: u32,

    /// Ticks to wait for transmit completion when flushing
    pub flush_timeout_ticks: u32,

    /// Settling delay between transmit completion and discarding the echo (µs)
    pub flush_settle_us: u32,

    /// CheckMac attempts made when unlocking the pairing secret
    pub pair_attempts: u8,
}

impl Config {
    /// Configuration for normal (firmware) operation
    pub const fn firmware() -> Self {
        Self {
            link: LinkConfig::single_wire(),
            wake_delay_us: WAKE_DELAY_US,
            retries: RETRIES,
            tx_timeout_ticks: 10,
            rx_timeout_ticks: 5,
            flush_timeout_ticks: 1,
            flush_settle_us: 1,
            pair_attempts: PAIR_ATTEMPTS,
        }
    }

    /// Configuration for bootloader operation (longer wake delay)
    pub const fn bootloader() -> Self {
        Self {
            wake_delay_us: BOOTLOADER_WAKE_DELAY_US,
            ..Self::firmware()
        }
    }

    /// Number of read attempts made before giving up
    pub const fn attempts(&self) -> usize {
        self.retries as usize + 1
    }
}

impl Default for Config {
    #[cfg(not(feature = "bootloader"))]
    fn default() -> Self {
        Self::firmware()
    }

    #[cfg(feature = "bootloader")]
    fn default() -> Self {
        Self::bootloader()
    }
}
