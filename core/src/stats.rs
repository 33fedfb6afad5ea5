// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Link diagnostics
//!
//! Counters are incremented as the transport observes link events, these
//! are informational only and never affect protocol behaviour.

use core::fmt;

use strum::{Display, EnumIter, EnumString, EnumVariantNames, IntoEnumIterator};

/// Link diagnostic counters
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Counter {
    /// Response failed CRC or length-byte check
    CrcError,
    /// No response bytes received
    NotReady,
    /// Response shorter than a status frame
    ShortRead,
    /// Response length byte did not match the expected length
    LengthError,
    /// Chip returned an error status
    ErrorCode,
    /// Chip reported imminent watchdog expiry
    WatchdogTimeout,
    /// Response attempt retried
    Retry,
    /// Retry budget exhausted
    RetryExhausted,
    /// Byte received
    RxByte,
    /// Receive ended on idle line detection
    RxIdle,
    /// Receive ended on failsafe timeout
    Failsafe,
    /// Transmitter not ready before the failsafe expired
    TxFailsafe,
}

/// Sink for link diagnostic counters
pub trait Metrics {
    /// Increment the provided counter
    fn inc(&mut self, counter: Counter);
}

/// No-op metrics
impl Metrics for () {
    fn inc(&mut self, _counter: Counter) {}
}

impl<T: Metrics> Metrics for &mut T {
    fn inc(&mut self, counter: Counter) {
        T::inc(self, counter)
    }
}

/// Link statistics, one wrapping counter per [Counter]
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Stats {
    pub crc_errors: u32,
    pub not_ready: u32,
    pub short_reads: u32,
    pub len_errors: u32,
    pub error_codes: u32,
    pub watchdog_timeouts: u32,
    pub retries: u32,
    pub retries_exhausted: u32,
    pub rx_bytes: u32,
    pub rx_idle: u32,
    pub failsafe: u32,
    pub tx_failsafe: u32,
}

impl Stats {
    /// Create a new zeroed stats object
    pub const fn new() -> Self {
        Self {
            crc_errors: 0,
            not_ready: 0,
            short_reads: 0,
            len_errors: 0,
            error_codes: 0,
            watchdog_timeouts: 0,
            retries: 0,
            retries_exhausted: 0,
            rx_bytes: 0,
            rx_idle: 0,
            failsafe: 0,
            tx_failsafe: 0,
        }
    }

    fn slot(&mut self, counter: Counter) -> &mut u32 {
        match counter {
            Counter::CrcError => &mut self.crc_errors,
            Counter::NotReady => &mut self.not_ready,
            Counter::ShortRead => &mut self.short_reads,
            Counter::LengthError => &mut self.len_errors,
            Counter::ErrorCode => &mut self.error_codes,
            Counter::WatchdogTimeout => &mut self.watchdog_timeouts,
            Counter::Retry => &mut self.retries,
            Counter::RetryExhausted => &mut self.retries_exhausted,
            Counter::RxByte => &mut self.rx_bytes,
            Counter::RxIdle => &mut self.rx_idle,
            Counter::Failsafe => &mut self.failsafe,
            Counter::TxFailsafe => &mut self.tx_failsafe,
        }
    }

    /// Fetch the value of a counter
    pub fn get(&self, counter: Counter) -> u32 {
        match counter {
            Counter::CrcError => self.crc_errors,
            Counter::NotReady => self.not_ready,
            Counter::ShortRead => self.short_reads,
            Counter::LengthError => self.len_errors,
            Counter::ErrorCode => self.error_codes,
            Counter::WatchdogTimeout => self.watchdog_timeouts,
            Counter::Retry => self.retries,
            Counter::RetryExhausted => self.retries_exhausted,
            Counter::RxByte => self.rx_bytes,
            Counter::RxIdle => self.rx_idle,
            Counter::Failsafe => self.failsafe,
            Counter::TxFailsafe => self.tx_failsafe,
        }
    }

    /// Number of failed response attempts plus transmit failsafes
    ///
    /// Each failed attempt is counted once by its cause. Chip status
    /// responses are counted as length errors, [Counter::ErrorCode] and
    /// [Counter::WatchdogTimeout] only refine these, while retry and rx
    /// failsafe counters track recovery and receive termination.
    pub fn errors(&self) -> u32 {
        [
            Counter::CrcError,
            Counter::NotReady,
            Counter::ShortRead,
            Counter::LengthError,
            Counter::TxFailsafe,
        ]
        .into_iter()
        .fold(0u32, |a, c| a.wrapping_add(self.get(c)))
    }

    /// Reset all counters
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Metrics for Stats {
    fn inc(&mut self, counter: Counter) {
        let v = self.slot(counter);
        *v = v.wrapping_add(1);
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in Counter::iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}={}", c, self.get(c))?;
        }
        Ok(())
    }
}
