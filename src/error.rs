use core::fmt;

use crate::regs::{RSR_BE, RSR_FE, RSR_OE, RSR_PE};

/// Error returned by the [`Uart`](crate::Uart) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartError {
    /// The UART did not report itself enabled after initialization.
    InitFailed,
    /// The hardware flag did not change before the timeout elapsed.
    Timeout,
    /// An argument is out of range, e.g. a baud rate of zero.
    InvalidParam,
    /// The driver is in use or has not been installed.
    Busy,
    /// A byte arrived while the receive FIFO was full.
    Overrun,
    /// The received character had no valid stop bit.
    Framing,
    /// The received character failed its parity check.
    Parity,
    /// A break condition was detected on the line.
    Noise,
    /// The line reported an error while transmitting.
    HardwareError,
}

impl UartError {
    /// Decode receive status bits, highest priority first.
    ///
    /// Overrun wins over framing, framing over parity and parity over break.
    /// Returns `None` if no error bit is set.
    pub fn from_status(rsr: u32) -> Option<Self> {
        if rsr & RSR_OE != 0 {
            Some(Self::Overrun)
        } else if rsr & RSR_FE != 0 {
            Some(Self::Framing)
        } else if rsr & RSR_PE != 0 {
            Some(Self::Parity)
        } else if rsr & RSR_BE != 0 {
            Some(Self::Noise)
        } else {
            None
        }
    }

    /// Human readable label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InitFailed => "Initialization failed",
            Self::Timeout => "Operation timed out",
            Self::InvalidParam => "Invalid parameter",
            Self::Busy => "UART busy",
            Self::Overrun => "Overrun error",
            Self::Framing => "Framing error",
            Self::Parity => "Parity error",
            Self::Noise => "Noise error",
            Self::HardwareError => "Hardware error",
        }
    }

    /// Negative C-style error code, for callers reporting across an FFI boundary.
    pub const fn code(&self) -> i32 {
        match self {
            Self::InitFailed => -1,
            Self::Timeout => -2,
            Self::InvalidParam => -3,
            Self::Busy => -4,
            Self::Overrun => -5,
            Self::Framing => -6,
            Self::Parity => -7,
            Self::Noise => -8,
            Self::HardwareError => -9,
        }
    }
}

impl fmt::Display for UartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::error::Error for UartError {}

/// Label the outcome of a driver operation, including success.
pub const fn error_to_string(status: Result<(), UartError>) -> &'static str {
    match status {
        Ok(()) => "Success",
        Err(e) => e.as_str(),
    }
}
