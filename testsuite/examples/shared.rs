//! Driver access through the critical-section cell.

#![no_std]
#![no_main]

use lm3s_uart::{Mmio, SharedUart, UartError};
use testsuite::{SysTickClock, check, entry, exit_success, uart0};

static UART: SharedUart<Mmio, SysTickClock> = SharedUart::new();

#[entry]
fn main() -> ! {
    check(
        UART.with(|u| u.init(115_200)) == Err(UartError::Busy),
        "busy before install",
    );

    check(matches!(UART.install(uart0()), Ok(None)), "install");
    check(UART.with(|u| u.init(115_200)).is_ok(), "init");
    check(
        UART.with(|u| u.send_string("shared\r\n", 1000)).is_ok(),
        "send",
    );

    let nested = UART.with(|_| Ok(UART.with(|u| u.flush(1000))));
    check(nested == Ok(Err(UartError::Busy)), "nested access refused");

    // What the UART0 vector would do; nothing is pending.
    UART.on_interrupt();

    let nested_take = UART.with(|_| Ok(UART.take().is_ok()));
    check(nested_take == Ok(false), "nested take refused");

    check(matches!(UART.take(), Ok(Some(_))), "driver returned");
    exit_success();
}
