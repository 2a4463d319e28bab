//! Access to the clock timing registers of the BCM2711 BSC1 (I2C1) controller.
//!
//! The crate is split the same way the work is done at runtime: [address] finds where the
//! register block lives, [window] maps it, [registers] knows the bit layout and [timing]
//! computes values that are safe to write.

pub mod address;
pub mod registers;
pub mod timing;
pub mod window;

use std::fmt::{Display, Formatter};
use std::io;
use thiserror::Error;

/// Which user-facing timing field a value belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimingField {
    /// `DIV.CDIV`, the clock divider.
    ClockDivider,
    /// `CLKT.TOUT`, the clock stretch timeout.
    ClockStretchTimeout,
}

impl Display for TimingField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            TimingField::ClockDivider => "CDIV",
            TimingField::ClockStretchTimeout => "TOUT",
        };
        write!(f, "{}", str)
    }
}

#[derive(Debug, Error)]
pub enum BscError {
    #[error("peripheral address base unavailable: {0}")]
    PlatformQuery(String),
    #[error("could not open {path}: {source}")]
    DeviceOpen {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("could not mmap I2C registers: {0}")]
    Map(#[source] io::Error),
    #[error("{field} out of bounds ({min}, {max}): {value}")]
    OutOfRange {
        field: TimingField,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl BscError {
    /// Gets the process exit code that reports this error.
    ///
    /// I/O failures keep the OS error number, so `EACCES` from a non-root `/dev/mem` open
    /// exits with 13.
    pub fn exit_code(&self) -> i32 {
        match self {
            BscError::PlatformQuery(_) => libc::ENODEV,
            BscError::DeviceOpen { source, .. } => source.raw_os_error().unwrap_or(libc::EIO),
            BscError::Map(source) => source.raw_os_error().unwrap_or(libc::EIO),
            BscError::OutOfRange { .. } => libc::ERANGE,
        }
    }
}

pub type BscResult<T> = Result<T, BscError>;
