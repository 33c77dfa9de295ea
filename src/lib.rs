#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

mod clock;
mod error;
pub mod regs;
mod shared;
mod uart;

#[cfg(test)]
mod sim;

pub use clock::Clock;
pub use error::{UartError, error_to_string};
pub use regs::{Mmio, Registers};
pub use shared::SharedUart;
pub use uart::{Config, Uart};
