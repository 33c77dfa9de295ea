//! Receive timeout and error status on an idle line.
//!
//! QEMU's serial backend is a file, so nothing is ever received.

#![no_std]
#![no_main]

use core::fmt::Write;

use lm3s_uart::UartError;
use testsuite::{check, entry, exit_success, uart0};

#[entry]
fn main() -> ! {
    let mut uart = uart0();
    check(uart.init(115_200).is_ok(), "init");

    uart.clear_errors();
    check(uart.error_status().is_ok(), "no errors after clear");
    check(uart.error_status().is_ok(), "error status is stable");

    uart.enable_interrupts();
    check(
        uart.get_char(20) == Err(UartError::Timeout),
        "idle receive times out",
    );
    // Nothing pending, so the handler must leave the line alone.
    uart.interrupt_handler();
    uart.disable_interrupts();

    check(write!(uart, "status {}\r\n", 0).is_ok(), "formatted send");

    exit_success();
}
