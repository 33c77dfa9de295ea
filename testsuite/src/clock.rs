//! SysTick based millisecond clock.

use core::cell::Cell;

use cortex_m::peripheral::SYST;
use cortex_m::peripheral::syst::SystClkSource;
use lm3s_uart::Clock;

/// Core clock of the emulated LM3S6965 after reset.
const CORE_HZ: u32 = 12_000_000;

/// SysTick CSR COUNTFLAG, set on every wrap and cleared by reading the CSR.
const CSR_COUNTFLAG: u32 = 1 << 16;

/// Millisecond clock that counts SysTick wraps when read.
///
/// No interrupt is used, so the count only advances while the clock is being
/// polled at least once per millisecond. That holds inside the driver's busy
/// waits, which is all it is used for.
pub struct SysTickClock {
    millis: Cell<u32>,
}

impl SysTickClock {
    /// Start SysTick with a 1 ms period.
    pub fn start(mut syst: SYST) -> Self {
        syst.set_clock_source(SystClkSource::Core);
        syst.set_reload(CORE_HZ / 1_000 - 1);
        syst.clear_current();
        syst.enable_counter();

        Self {
            millis: Cell::new(0),
        }
    }
}

impl Clock for SysTickClock {
    fn now_ms(&self) -> u32 {
        // SAFETY: A read of the SysTick CSR. `start` consumed the SYST singleton, so nothing
        // else observes (and clears) COUNTFLAG.
        let csr = unsafe { (*SYST::PTR).csr.read() };
        if csr & CSR_COUNTFLAG != 0 {
            self.millis.set(self.millis.get().wrapping_add(1));
        }
        self.millis.get()
    }
}
