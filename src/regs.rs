//! Register access layer.
//!
//! Register offsets and bit definitions for the LM3S6965 UART (a PL011
//! derivative), the [`Registers`] access trait and its volatile [`Mmio`]
//! implementation.
//!
//! Refer to the LM3S6965 data sheet, chapter "Universal Asynchronous
//! Receivers/Transmitters".

use core::ptr::{with_exposed_provenance, with_exposed_provenance_mut};
use core::sync::atomic::{AtomicBool, Ordering};

/// Base address of UART0.
pub const UART0_BASE: usize = 0x4000_C000;

/// Data Register.
pub const DR: usize = 0x000;
/// Receive Status Register (read).
pub const RSR: usize = 0x004;
/// Error Clear Register (write). Aliases [`RSR`].
pub const ECR: usize = 0x004;
/// Flag Register.
pub const FR: usize = 0x018;
/// IrDA Low-Power Counter Register.
pub const ILPR: usize = 0x020;
/// Integer Baud-Rate Divisor.
pub const IBRD: usize = 0x024;
/// Fractional Baud-Rate Divisor.
pub const FBRD: usize = 0x028;
/// Line Control Register.
pub const LCRH: usize = 0x02C;
/// Control Register.
pub const CTL: usize = 0x030;
/// Interrupt FIFO Level Select.
pub const IFLS: usize = 0x034;
/// Interrupt Mask.
pub const IM: usize = 0x038;
/// Raw Interrupt Status.
pub const RIS: usize = 0x03C;
/// Masked Interrupt Status.
pub const MIS: usize = 0x040;
/// Interrupt Clear.
pub const ICR: usize = 0x044;

/// UART enable.
pub const CTL_UARTEN: u32 = 1 << 0;
/// Transmit enable.
pub const CTL_TXE: u32 = 1 << 8;
/// Receive enable.
pub const CTL_RXE: u32 = 1 << 9;

/// UART busy transmitting.
pub const FR_BUSY: u32 = 1 << 3;
/// Receive FIFO empty.
pub const FR_RXFE: u32 = 1 << 4;
/// Transmit FIFO full.
pub const FR_TXFF: u32 = 1 << 5;

/// Framing error.
pub const RSR_FE: u32 = 1 << 0;
/// Parity error.
pub const RSR_PE: u32 = 1 << 1;
/// Break error.
pub const RSR_BE: u32 = 1 << 2;
/// Overrun error.
pub const RSR_OE: u32 = 1 << 3;
/// All receive status bits.
pub const RSR_ANY: u32 = RSR_FE | RSR_PE | RSR_BE | RSR_OE;
/// Any write to [`ECR`] clears the receive status; all ones by convention.
pub const ECR_CLEAR_ALL: u32 = 0xFF;

/// Parity enable.
pub const LCRH_PEN: u32 = 1 << 1;
/// Two stop bits.
pub const LCRH_STP2: u32 = 1 << 3;
/// FIFO enable.
pub const LCRH_FEN: u32 = 1 << 4;
/// 8-bit word length (`WLEN = 0b11`).
pub const LCRH_WLEN_8: u32 = 0b11 << 5;
/// 8 data bits, no parity, one stop bit, FIFOs on.
pub const LCRH_8N1: u32 = LCRH_WLEN_8 | LCRH_FEN;

/// Receive interrupt, shared bit position in [`IM`], [`RIS`], [`MIS`] and [`ICR`].
pub const INT_RX: u32 = 1 << 4;
/// Every interrupt source in [`ICR`].
pub const INT_ALL: u32 = 0x7FF;

/// Word-sized access to a UART register block.
///
/// Offsets are relative to the block base and are always one of the constants
/// in this module. Implementations must not cache, merge or reorder accesses:
/// every call is one bus transaction, in program order.
pub trait Registers {
    /// Load the register at `offset`.
    fn read(&mut self, offset: usize) -> u32;

    /// Store `value` to the register at `offset`.
    fn write(&mut self, offset: usize, value: u32);
}

impl<T: Registers + ?Sized> Registers for &mut T {
    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

/// Memory-mapped register block accessed with volatile loads and stores.
#[derive(Debug)]
pub struct Mmio {
    base: usize,
}

impl Mmio {
    /// Access the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of a UART register block mapped as device
    /// memory, and no other live handle may access the same block.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Take the UART0 register block.
    ///
    /// Returns `Some` on the first call of the program and `None` afterwards.
    pub fn take() -> Option<Self> {
        static TAKEN: AtomicBool = AtomicBool::new(false);

        if TAKEN.swap(true, Ordering::SeqCst) {
            return None;
        }

        // SAFETY: UART0 lives at this fixed address on the LM3S6965, and the swap above
        // guarantees that this handle is created at most once.
        Some(unsafe { Self::new(UART0_BASE) })
    }

    /// Base address of the block.
    pub const fn base(&self) -> usize {
        self.base
    }
}

impl Registers for Mmio {
    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        let reg = with_exposed_provenance::<u32>(self.base + offset);
        // SAFETY: The constructor contract guarantees `base` is a mapped register block and
        // `offset` is one of the word-aligned register offsets of that block.
        unsafe { reg.read_volatile() }
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        let reg = with_exposed_provenance_mut::<u32>(self.base + offset);
        // SAFETY: See `read`. `&mut self` makes this the only access in flight.
        unsafe { reg.write_volatile(value) }
    }
}
