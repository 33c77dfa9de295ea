//! A driver shared between thread mode and the UART interrupt.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::clock::Clock;
use crate::error::UartError;
use crate::regs::Registers;
use crate::uart::Uart;

/// Owns a [`Uart`] and hands it out one critical section at a time.
///
/// Place it in a `static`, [`install`](Self::install) the driver once at
/// startup and route both the main loop and the interrupt vector through it.
/// The interrupt cannot preempt a main-loop operation half way through a
/// register sequence, and vice versa.
///
/// ```ignore
/// static UART: SharedUart<Mmio, SysTickClock> = SharedUart::new();
///
/// #[interrupt]
/// fn UART0() {
///     UART.on_interrupt();
/// }
/// ```
pub struct SharedUart<R, C> {
    inner: Mutex<RefCell<Option<Uart<R, C>>>>,
}

impl<R, C> SharedUart<R, C> {
    /// An empty cell.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the driver, returning the one it replaces.
    ///
    /// # Errors
    ///
    /// [`UartError::Busy`] when called from inside [`with`](Self::with). The
    /// new driver is dropped and the installed one stays in place.
    pub fn install(&self, uart: Uart<R, C>) -> Result<Option<Uart<R, C>>, UartError> {
        critical_section::with(|cs| {
            let mut slot = self
                .inner
                .borrow(cs)
                .try_borrow_mut()
                .map_err(|_| UartError::Busy)?;
            Ok(slot.replace(uart))
        })
    }

    /// Remove the driver.
    ///
    /// # Errors
    ///
    /// [`UartError::Busy`] when called from inside [`with`](Self::with).
    pub fn take(&self) -> Result<Option<Uart<R, C>>, UartError> {
        critical_section::with(|cs| {
            let mut slot = self
                .inner
                .borrow(cs)
                .try_borrow_mut()
                .map_err(|_| UartError::Busy)?;
            Ok(slot.take())
        })
    }
}

impl<R: Registers, C: Clock> SharedUart<R, C> {
    /// Run `f` on the driver inside a critical section.
    ///
    /// # Errors
    ///
    /// [`UartError::Busy`] if no driver is installed or `f` is already running
    /// (a nested call from within `f`). Otherwise whatever `f` returns.
    pub fn with<T>(
        &self,
        f: impl FnOnce(&mut Uart<R, C>) -> Result<T, UartError>,
    ) -> Result<T, UartError> {
        critical_section::with(|cs| {
            let mut slot = self
                .inner
                .borrow(cs)
                .try_borrow_mut()
                .map_err(|_| UartError::Busy)?;
            let uart = slot.as_mut().ok_or(UartError::Busy)?;
            f(uart)
        })
    }

    /// Entry point for the UART interrupt vector.
    pub fn on_interrupt(&self) {
        let handled = self.with(|uart| {
            uart.interrupt_handler();
            Ok(())
        });
        if handled.is_err() {
            warn!("UART interrupt: driver not installed or in use");
        }
    }
}

impl<R, C> Default for SharedUart<R, C> {
    fn default() -> Self {
        Self::new()
    }
}
