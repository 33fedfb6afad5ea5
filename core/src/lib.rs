// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Single-wire secure element driver
//!
//! This provides a host driver for ATECC508A / 608A style secure elements
//! attached via a single-wire UART, layered as:
//!
//! - [Link][link::Link], pulse level send / receive with failsafe timeouts
//! - [Transport], framed commands and validated responses with retry
//! - chip power control (wake / idle / sleep), see [Exchange]
//! - [Auth][auth::Auth], nonce / digest / MAC protocols and encrypted writes
//!
//! Platform support is provided by implementing [Uart] and [Clock] for the
//! target peripheral and timer, [Secrets][auth::Secrets] for the host-held
//! pairing secret, and optionally [Metrics] and [Indicator] for diagnostics.
//!
//! ## Operations
//!
//! Each command is a single transaction: the chip is woken, the command
//! written, and the response polled via [Exchange::read]. Successful reads
//! leave the chip idle (retaining TempKey), while protocol operations end by
//! requesting sleep.
//!
//! ```no_run
//! # use secel_core::{Config, Transport, Uart, Clock, auth::{Auth, RomSecrets}};
//! # fn demo<U: Uart, C: Clock>(uart: U, clock: C, secrets: RomSecrets) -> Result<(), secel_core::Error> {
//! let transport = Transport::new(uart, clock, Config::default());
//! let mut auth = Auth::new(transport, secrets);
//!
//! // Prove we hold the pairing secret, then store data in slot 9
//! auth.pair_unlock()?;
//! auth.encrypted_write(9, 14, &[0u8; 32], b"hello")?;
//! # Ok(())
//! # }
//! ```
//!
//! Calls are blocking and must not be interleaved, wrap the driver in a
//! mutex where it is shared.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub use secel_proto as proto;

pub mod auth;

mod chip;
pub use chip::WAKE_TOKEN;

mod config;
pub use config::*;

mod error;
pub use error::Error;

pub mod link;
pub use link::{Clock, Uart};

mod stats;
pub use stats::{Counter, Metrics, Stats};

mod transport;
pub use transport::{Exchange, Indicator, Pending, Transport, MAX_READ};
