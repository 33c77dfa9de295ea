//! Initialize UART0 and send a banner.

#![no_std]
#![no_main]

use testsuite::{check, entry, exit_success, uart0};

#[entry]
fn main() -> ! {
    let mut uart = uart0();

    check(uart.init(115_200).is_ok(), "init 115200");
    uart.clear_errors();
    check(
        uart.send_string("UART Driver Test\r\n", 1000).is_ok(),
        "send banner",
    );
    check(uart.flush(1000).is_ok(), "flush");

    exit_success();
}
