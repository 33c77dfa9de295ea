//! Baud-rate validation and re-initialization.

#![no_std]
#![no_main]

use lm3s_uart::UartError;
use testsuite::{check, entry, exit_success, uart0};

#[entry]
fn main() -> ! {
    let mut uart = uart0();

    check(!uart.is_enabled(), "disabled out of reset");
    check(uart.init(0) == Err(UartError::InvalidParam), "zero baud rejected");
    check(!uart.is_enabled(), "still disabled after zero baud");

    // 16 MHz / (16 * 2 Mbaud) < 1
    check(
        uart.init(2_000_000) == Err(UartError::InvalidParam),
        "baud above clock / 16 rejected",
    );
    check(!uart.is_enabled(), "left disabled after bad divisor");

    check(uart.init(9_600).is_ok(), "init 9600");
    check(uart.is_enabled(), "enabled");
    check(uart.init(115_200).is_ok(), "re-init 115200");
    check(uart.send_string(b"ok\r\n", 1000).is_ok(), "send after re-init");

    exit_success();
}
