// Copyright (c) 2022-2023 The MobileCoin Foundation

use secel_proto::{ChipStatus, FrameError};

/// Secure element driver errors
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum Error {
    /// Invalid argument length
    #[cfg_attr(feature = "thiserror", error("Invalid argument length"))]
    InvalidLength,

    /// No valid response received within the retry budget
    #[cfg_attr(feature = "thiserror", error("No valid response (retries exhausted)"))]
    Exhausted,

    /// Chip returned an error status in place of the expected response
    #[cfg_attr(feature = "thiserror", error("Chip error status 0x{0:02x}"))]
    Chip(u8),

    /// Chip rejected a host computed MAC
    #[cfg_attr(feature = "thiserror", error("Authentication mismatch"))]
    AuthMismatch,
}

impl Error {
    /// Check whether this error was caused by link or transport failure
    /// (as opposed to an argument or authentication error)
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Exhausted | Error::Chip(_))
    }

    /// Fetch the chip status code for [Error::Chip] errors, where known
    pub fn status(&self) -> Option<ChipStatus> {
        match self {
            Error::Chip(c) => ChipStatus::try_from(*c).ok(),
            _ => None,
        }
    }
}

impl From<FrameError> for Error {
    fn from(_: FrameError) -> Self {
        Error::InvalidLength
    }
}
