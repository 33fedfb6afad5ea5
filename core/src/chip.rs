// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chip power state control
//!
//! A wake token (line held low for one character) brings the chip out of
//! sleep or idle, after which the chip waits for a command. Following a
//! command the host returns the chip to idle (keeping TempKey) or sleep
//! (clearing volatile state). Flags sent while the chip is already idle or
//! asleep are ignored until the next wake.

use secel_proto::IoFlag;

use crate::{transport::Transport, Clock, Indicator, Metrics, Uart};

/// Raw character sent as a wake token
pub const WAKE_TOKEN: u8 = 0x00;

impl<U: Uart, C: Clock, M: Metrics, I: Indicator> Transport<U, C, M, I> {
    /// Send a wake token and wait for the chip to start
    pub fn wake(&mut self) {
        self.link.send_byte(WAKE_TOKEN);

        let us = self.config().wake_delay_us;
        self.delay_us(us);
    }

    /// Place the chip in idle mode
    pub fn idle(&mut self) {
        self.link.send_flag(IoFlag::Idle);
    }

    /// Place the chip in sleep mode
    pub fn sleep(&mut self) {
        #[cfg(feature = "log")]
        log::trace!("sleep");

        self.link.send_flag(IoFlag::Sleep);
    }
}
