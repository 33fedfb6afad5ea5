// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::collections::VecDeque;

use secel_core::{Clock, Uart};

use crate::SimHandle;

/// Half-duplex UART attached to a [SimChip][crate::SimChip]
///
/// Characters written are echoed back to the receiver and delivered to the
/// chip. Staged response pulses are received once the echo has been drained
/// or discarded.
pub struct SimUart {
    chip: SimHandle,
    rx: VecDeque<u8>,
    /// Receiver timeout (idle line) detection enabled
    pub idle_detect: bool,
}

impl SimUart {
    pub fn new(chip: SimHandle) -> Self {
        Self {
            chip,
            rx: VecDeque::new(),
            idle_detect: true,
        }
    }
}

impl Uart for SimUart {
    fn tx_ready(&mut self) -> bool {
        true
    }

    fn tx_complete(&mut self) -> bool {
        true
    }

    fn write(&mut self, value: u8) {
        self.rx.push_back(value);
        self.chip.with(|c| c.on_char(value));
    }

    fn rx_ready(&mut self) -> bool {
        if self.rx.is_empty() {
            let p = self.chip.with(|c| c.take_outgoing());
            self.rx.extend(p);
        }

        !self.rx.is_empty()
    }

    fn rx_timeout(&mut self) -> bool {
        self.idle_detect && self.rx.is_empty() && !self.chip.with(|c| c.has_outgoing())
    }

    fn read(&mut self) -> u8 {
        self.rx.pop_front().unwrap_or(0)
    }

    fn clear_rx_timeout(&mut self) {}

    fn discard_rx(&mut self) {
        self.rx.clear();
    }

    fn clear_errors(&mut self) {}
}

/// Virtual clock, each [Clock::elapsed] poll advances one tick and
/// delays are accumulated rather than waited
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimClock {
    pub ticks: u32,
    pub start: u32,
    pub delayed_us: u64,
}

impl Clock for SimClock {
    fn mark(&mut self) {
        self.start = self.ticks;
    }

    fn elapsed(&mut self) -> u32 {
        self.ticks = self.ticks.wrapping_add(1);
        self.ticks.wrapping_sub(self.start)
    }

    fn delay_us(&mut self, us: u32) {
        self.delayed_us += us as u64;
    }
}
