#![no_std]

pub mod clock;

use cortex_m_semihosting::debug::{self, EXIT_FAILURE, EXIT_SUCCESS};
use defmt_semihosting as _;
use lm3s_uart::{Config, Mmio, Uart};
use panic_semihosting as _;

pub use clock::SysTickClock;
pub use cortex_m_rt::entry;

/// Reference clock feeding UART0 on the LM3S6965 evaluation board.
pub const UART_CLOCK_HZ: u32 = 16_000_000;

/// The UART0 driver used by every test.
pub type Uart0 = Uart<Mmio, SysTickClock>;

pub fn exit_success() -> ! {
    debug::exit(EXIT_SUCCESS);
    #[allow(clippy::empty_loop)]
    loop {}
}

pub fn exit_failure() -> ! {
    debug::exit(EXIT_FAILURE);
    #[allow(clippy::empty_loop)]
    loop {}
}

/// Take the core peripherals and UART0 and build the (not yet initialized) driver.
///
/// Must be called once.
pub fn uart0() -> Uart0 {
    let (Some(cp), Some(regs)) = (cortex_m::Peripherals::take(), Mmio::take()) else {
        defmt::error!("peripherals already taken");
        exit_failure();
    };
    let clock = SysTickClock::start(cp.SYST);
    Uart::new(regs, clock, Config::new().with_clock_hz(UART_CLOCK_HZ))
}

/// Fail the test unless `ok`.
pub fn check(ok: bool, what: &str) {
    if ok {
        defmt::info!("ok: {=str}", what);
    } else {
        defmt::error!("FAILED: {=str}", what);
        exit_failure();
    }
}
