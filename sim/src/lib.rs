// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software model of a single-wire secure element
//!
//! [SimChip] models the chip side of the bus (pulse decoding, command
//! framing, TempKey and slot state, power states), shared via [SimHandle]
//! so tests can provision, inspect, and inject [Fault]s while a
//! [secel_core::Transport] drives it through a [SimUart].
//!
//! ```
//! use secel_core::Config;
//! use secel_sim::SimHandle;
//!
//! let sim = SimHandle::new(1);
//! let mut t = sim.transport(Config::default());
//!
//! t.wake();
//! t.sleep();
//! ```

use std::sync::{Arc, Mutex};

use secel_core::{Config, Transport};

mod chip;
pub use chip::{Power, SimChip, SlotConfig, DEFAULT_SERIAL, REVISION, SLOT_SIZE};

mod fault;
pub use fault::Fault;

mod uart;
pub use uart::{SimClock, SimUart};

/// Shared handle to a [SimChip]
#[derive(Clone)]
pub struct SimHandle {
    chip: Arc<Mutex<SimChip>>,
}

impl SimHandle {
    /// Create a new blank chip with the provided rng seed
    pub fn new(seed: u64) -> Self {
        Self::from(SimChip::new(seed))
    }

    /// Execute a function against the chip
    pub fn with<R>(&self, f: impl FnOnce(&mut SimChip) -> R) -> R {
        // A panicking test thread leaves the model usable
        let mut c = self.chip.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut c)
    }

    /// Queue a response fault
    pub fn inject(&self, fault: Fault) {
        self.with(|c| c.inject(fault))
    }

    /// Create a UART attached to this chip
    pub fn uart(&self) -> SimUart {
        SimUart::new(self.clone())
    }

    /// Create a transport attached to this chip
    pub fn transport(&self, config: Config) -> Transport<SimUart, SimClock> {
        Transport::new(self.uart(), SimClock::default(), config)
    }
}

impl From<SimChip> for SimHandle {
    fn from(chip: SimChip) -> Self {
        Self {
            chip: Arc::new(Mutex::new(chip)),
        }
    }
}
