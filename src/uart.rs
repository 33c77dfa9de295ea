//! UART control and status engine.

use core::fmt;

use crate::clock::{Clock, Deadline};
use crate::error::UartError;
use crate::regs::*;

/// Driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// UART reference clock in Hz, used to derive the baud-rate divisor.
    pub clock_hz: u32,
    /// Timeout used by [`Uart::interrupt_handler`] and the [`fmt::Write`] impl.
    pub default_timeout_ms: u32,
}

impl Config {
    /// 16 MHz reference clock, 1000 ms default timeout.
    pub const fn new() -> Self {
        Self {
            clock_hz: 16_000_000,
            default_timeout_ms: 1000,
        }
    }

    /// Set the reference clock.
    pub const fn with_clock_hz(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    /// Set the default timeout.
    pub const fn with_default_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.default_timeout_ms = timeout_ms;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Split the baud-rate divisor `clock / (16 * baud)` into its integer part and
/// 6-bit fraction.
///
/// Returns `None` if the integer part is zero (baud rate too high for the
/// clock) or does not fit the 16-bit IBRD register (baud rate too low).
fn baud_divisor(clock_hz: u32, baud_rate: u32) -> Option<(u32, u32)> {
    // clock / (16 * baud) in units of 1/64.
    let div = u64::from(clock_hz) * 4 / u64::from(baud_rate);
    let integer = div >> 6;
    if integer == 0 || integer > 0xFFFF {
        return None;
    }
    Some((integer as u32, (div & 0x3F) as u32))
}

/// Driver for one UART register block.
///
/// Transmit and receive operations are only meaningful after a successful
/// [`init`](Self::init). Every blocking operation spins on the Flag Register
/// until the flag changes or `timeout_ms` milliseconds of `C` time have
/// passed. A timeout of zero waits forever.
pub struct Uart<R, C> {
    regs: R,
    clock: C,
    config: Config,
}

impl<R, C> Uart<R, C> {
    /// Create a driver. The hardware is not touched until [`init`](Self::init).
    pub const fn new(regs: R, clock: C, config: Config) -> Self {
        Self {
            regs,
            clock,
            config,
        }
    }

    /// Release the register block and clock.
    pub fn free(self) -> (R, C) {
        (self.regs, self.clock)
    }

    /// The register block.
    pub fn registers(&self) -> &R {
        &self.regs
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }
}

impl<R: Registers, C: Clock> Uart<R, C> {
    /// Configure the UART for `baud_rate` with 8N1 framing and enable it.
    ///
    /// The UART is disabled and all pending interrupts are cleared first, so
    /// this may be called again at any time to reconfigure.
    ///
    /// # Errors
    ///
    /// - [`UartError::InvalidParam`]: `baud_rate` is zero (nothing is
    ///   written), or the divisor does not fit the baud registers (the UART
    ///   is left disabled).
    /// - [`UartError::InitFailed`]: the enable bit did not read back.
    pub fn init(&mut self, baud_rate: u32) -> Result<(), UartError> {
        if baud_rate == 0 {
            warn!("init: baud rate must be non-zero");
            return Err(UartError::InvalidParam);
        }

        self.regs.write(CTL, 0);
        self.regs.write(ICR, INT_ALL);

        let Some((ibrd, fbrd)) = baud_divisor(self.config.clock_hz, baud_rate) else {
            warn!(
                "init: no divisor for {=u32} baud at {=u32} Hz",
                baud_rate,
                self.config.clock_hz
            );
            return Err(UartError::InvalidParam);
        };
        self.regs.write(IBRD, ibrd);
        self.regs.write(FBRD, fbrd);

        self.regs.write(LCRH, LCRH_8N1);
        self.regs.write(CTL, CTL_UARTEN | CTL_TXE | CTL_RXE);

        if self.regs.read(CTL) & CTL_UARTEN == 0 {
            warn!("init: UART did not enable");
            return Err(UartError::InitFailed);
        }

        debug!(
            "init: {=u32} baud, ibrd {=u32}, fbrd {=u32}",
            baud_rate,
            ibrd,
            fbrd
        );
        Ok(())
    }

    /// Whether the control register reports the UART enabled.
    pub fn is_enabled(&mut self) -> bool {
        self.regs.read(CTL) & CTL_UARTEN != 0
    }

    /// Transmit one byte.
    ///
    /// # Errors
    ///
    /// - [`UartError::Timeout`]: the transmit FIFO stayed full.
    /// - [`UartError::HardwareError`]: the receive status reports a line
    ///   error; the byte is not written. Call [`clear_errors`](Self::clear_errors)
    ///   to recover.
    pub fn send_char(&mut self, c: u8, timeout_ms: u32) -> Result<(), UartError> {
        self.wait_while(FR_TXFF, timeout_ms)?;

        let rsr = self.regs.read(RSR);
        if rsr & RSR_ANY != 0 {
            warn!("send: line error {=u32:#x}, byte dropped", rsr);
            return Err(UartError::HardwareError);
        }

        self.regs.write(DR, u32::from(c));
        Ok(())
    }

    /// Receive one byte.
    ///
    /// When the receive status reports an error, the error is returned and
    /// the byte is left in the FIFO.
    ///
    /// # Errors
    ///
    /// - [`UartError::Timeout`]: the receive FIFO stayed empty.
    /// - [`UartError::Overrun`], [`UartError::Framing`], [`UartError::Parity`],
    ///   [`UartError::Noise`]: see [`error_status`](Self::error_status).
    pub fn get_char(&mut self, timeout_ms: u32) -> Result<u8, UartError> {
        self.wait_while(FR_RXFE, timeout_ms)?;
        self.error_status()?;
        Ok((self.regs.read(DR) & 0xFF) as u8)
    }

    /// Transmit every byte of `s`, each with its own `timeout_ms` budget.
    ///
    /// Stops at the first byte that fails and returns its error.
    pub fn send_string(&mut self, s: impl AsRef<[u8]>, timeout_ms: u32) -> Result<(), UartError> {
        for &c in s.as_ref() {
            self.send_char(c, timeout_ms)?;
        }
        Ok(())
    }

    /// Wait until the UART has finished transmitting.
    pub fn flush(&mut self, timeout_ms: u32) -> Result<(), UartError> {
        self.wait_while(FR_BUSY, timeout_ms)
    }

    /// Unmask the receive interrupt.
    pub fn enable_interrupts(&mut self) {
        self.regs.write(IM, INT_RX);
    }

    /// Mask all interrupts.
    pub fn disable_interrupts(&mut self) {
        self.regs.write(IM, 0);
    }

    /// Clear the sticky receive status.
    pub fn clear_errors(&mut self) {
        self.regs.write(ECR, ECR_CLEAR_ALL);
    }

    /// Decode the receive status without clearing it.
    ///
    /// Errors are reported in priority order: overrun, framing, parity,
    /// break ([`UartError::Noise`]).
    pub fn error_status(&mut self) -> Result<(), UartError> {
        let rsr = self.regs.read(RSR);
        match UartError::from_status(rsr) {
            Some(e) => {
                warn!("receive status {=u32:#x}: {}", rsr, e);
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Service the UART interrupt.
    ///
    /// On a pending receive interrupt, echo the received byte and clear the
    /// interrupt. Receive or echo failures are dropped; the interrupt is
    /// cleared regardless.
    pub fn interrupt_handler(&mut self) {
        if self.regs.read(MIS) & INT_RX == 0 {
            return;
        }
        trace!("receive interrupt");

        let timeout = self.config.default_timeout_ms;
        let echoed = self
            .get_char(timeout)
            .and_then(|c| self.send_char(c, timeout));
        if let Err(e) = echoed {
            warn!("receive interrupt: echo failed: {}", e);
        }

        self.regs.write(ICR, INT_RX);
    }

    fn wait_while(&mut self, flag: u32, timeout_ms: u32) -> Result<(), UartError> {
        let deadline = Deadline::start(&self.clock, timeout_ms);
        while self.regs.read(FR) & flag != 0 {
            if deadline.expired(&self.clock) {
                trace!("timeout: FR {=u32:#x} after {=u32} ms", flag, timeout_ms);
                return Err(UartError::Timeout);
            }
            core::hint::spin_loop();
        }
        Ok(())
    }
}

impl<R: Registers, C: Clock> fmt::Write for Uart<R, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let timeout = self.config.default_timeout_ms;
        self.send_string(s, timeout).map_err(|_| fmt::Error)
    }
}

#[cfg(test)]
mod test {
    use core::fmt::Write as _;
    use std::vec;

    use super::*;
    use crate::sim::{Access, FakeClock, SimRegisters};

    fn uart(sim: SimRegisters) -> Uart<SimRegisters, FakeClock> {
        Uart::new(sim, FakeClock::new(0, 1), Config::new())
    }

    fn enabled(sim: SimRegisters) -> Uart<SimRegisters, FakeClock> {
        let mut u = uart(sim);
        u.init(115_200).unwrap();
        u
    }

    #[test]
    fn divisor() {
        // 16 MHz / (16 * 115200) = 8.68
        assert_eq!(baud_divisor(16_000_000, 115_200), Some((8, 43)));
        assert_eq!(baud_divisor(16_000_000, 9_600), Some((104, 10)));
        assert_eq!(baud_divisor(16_000_000, 1_000_000), Some((1, 0)));
        assert_eq!(baud_divisor(16_000_000, 1_000_001), None);
        assert_eq!(baud_divisor(16_000_000, 1), None);
    }

    #[test]
    fn init_rejects_zero_baud() {
        let mut u = uart(SimRegisters::new());
        assert_eq!(u.init(0), Err(UartError::InvalidParam));
        assert!(u.registers().accesses.is_empty());
    }

    #[test]
    fn init_rejects_baud_too_high() {
        let mut u = uart(SimRegisters::new());
        assert_eq!(u.init(2_000_000), Err(UartError::InvalidParam));

        let sim = u.registers();
        assert_eq!(sim.writes(CTL), vec![0]);
        assert!(sim.writes(LCRH).is_empty());
        assert_eq!(sim.ctl & CTL_UARTEN, 0);
    }

    #[test]
    fn init_rejects_baud_too_low() {
        // 16 MHz / (16 * 15) = 66666, past the 16-bit IBRD.
        let mut u = uart(SimRegisters::new());
        assert_eq!(u.init(15), Err(UartError::InvalidParam));
        assert!(u.registers().writes(IBRD).is_empty());
        assert_eq!(u.registers().ctl & CTL_UARTEN, 0);

        // 62500 still fits.
        assert_eq!(u.init(16), Ok(()));
        assert_eq!(u.registers().ibrd, 62_500);
    }

    #[test]
    fn init_sequence() {
        let mut u = uart(SimRegisters::new());
        assert_eq!(u.init(115_200), Ok(()));

        let sim = u.registers();
        assert_eq!(
            sim.accesses,
            vec![
                Access::Write(CTL, 0),
                Access::Write(ICR, 0x7FF),
                Access::Write(IBRD, 8),
                Access::Write(FBRD, 43),
                Access::Write(LCRH, LCRH_8N1),
                Access::Write(CTL, CTL_UARTEN | CTL_TXE | CTL_RXE),
                Access::Read(CTL),
            ]
        );
    }

    #[test]
    fn init_sets_8n1_and_enables() {
        let mut u = enabled(SimRegisters::new());
        assert!(u.is_enabled());

        let sim = u.registers();
        assert_eq!(sim.ctl, CTL_UARTEN | CTL_TXE | CTL_RXE);
        assert_eq!(sim.lcrh & LCRH_WLEN_8, LCRH_WLEN_8);
        assert_eq!(sim.lcrh & LCRH_PEN, 0);
        assert_eq!(sim.lcrh & LCRH_STP2, 0);
    }

    #[test]
    fn init_detects_dead_hardware() {
        let mut sim = SimRegisters::new();
        sim.ctl_stuck_off = true;
        let mut u = uart(sim);
        assert_eq!(u.init(115_200), Err(UartError::InitFailed));
        assert!(!u.is_enabled());
    }

    #[test]
    fn init_restarts_from_disabled() {
        let mut u = Uart::new(
            SimRegisters::new(),
            FakeClock::new(0, 1),
            Config::new().with_clock_hz(50_000_000),
        );
        u.init(115_200).unwrap();
        u.init(9_600).unwrap();

        let sim = u.registers();
        assert_eq!(
            sim.writes(CTL),
            vec![0, CTL_UARTEN | CTL_TXE | CTL_RXE, 0, CTL_UARTEN | CTL_TXE | CTL_RXE]
        );
        assert_eq!(sim.writes(ICR), vec![INT_ALL, INT_ALL]);
        // 50 MHz / (16 * 9600) = 325.52
        assert_eq!((sim.ibrd, sim.fbrd), (325, 33));
    }

    #[test]
    fn send_char_times_out_without_writing() {
        let mut sim = SimRegisters::new();
        sim.tx_full_reads = u32::MAX;
        let mut u = enabled(sim);

        assert_eq!(u.send_char(b'x', 10), Err(UartError::Timeout));
        assert!(u.registers().tx.is_empty());
        assert!(u.registers().writes(DR).is_empty());
    }

    #[test]
    fn send_char_zero_timeout_waits_forever() {
        let mut sim = SimRegisters::new();
        sim.tx_full_reads = 5_000;
        let mut u = Uart::new(sim, FakeClock::new(0, 1_000), Config::new());

        assert_eq!(u.send_char(b'x', 0), Ok(()));
        assert_eq!(u.registers().tx, b"x");
        assert_eq!(u.registers().reads(FR), 5_001);
    }

    #[test]
    fn send_char_timeout_counts_time_not_polls() {
        let mut sim = SimRegisters::new();
        sim.tx_full_reads = 10_000;
        // A stopped clock never expires the deadline, however long we poll.
        let mut u = Uart::new(sim, FakeClock::new(0, 0), Config::new());
        assert_eq!(u.send_char(b'x', 5), Ok(()));

        let mut sim = SimRegisters::new();
        sim.tx_full_reads = u32::MAX;
        let mut u = Uart::new(sim, FakeClock::new(0, 250), Config::new());
        assert_eq!(u.send_char(b'x', 1_000), Err(UartError::Timeout));
        // Start at 0, then 250, 500, 750, 1000.
        assert_eq!(u.registers().reads(FR), 4);
    }

    #[test]
    fn send_char_refuses_faulted_line() {
        let mut u = enabled(SimRegisters::new());
        u.registers_mut().rsr = RSR_FE;

        assert_eq!(u.send_char(b'x', 10), Err(UartError::HardwareError));
        assert!(u.registers().tx.is_empty());
    }

    #[test]
    fn get_char_masks_data() {
        let mut sim = SimRegisters::new();
        sim.rx.push_back(0x0F41);
        let mut u = enabled(sim);
        assert_eq!(u.get_char(10), Ok(b'A'));
    }

    #[test]
    fn get_char_times_out() {
        let mut u = enabled(SimRegisters::new());
        assert_eq!(u.get_char(10), Err(UartError::Timeout));
        assert_eq!(u.registers().reads(DR), 0);
    }

    #[test]
    fn get_char_error_priority() {
        let mut sim = SimRegisters::new();
        sim.rx.push_back(u32::from(b'A'));
        let mut u = enabled(sim);

        let cases = [
            (RSR_OE | RSR_FE | RSR_PE | RSR_BE, UartError::Overrun),
            (RSR_FE | RSR_PE | RSR_BE, UartError::Framing),
            (RSR_PE | RSR_BE, UartError::Parity),
            (RSR_BE, UartError::Noise),
        ];
        for (rsr, expected) in cases {
            u.registers_mut().rsr = rsr;
            assert_eq!(u.get_char(10), Err(expected));
        }

        // The byte was never consumed.
        assert_eq!(u.registers().reads(DR), 0);
        u.clear_errors();
        assert_eq!(u.get_char(10), Ok(b'A'));
    }

    #[test]
    fn send_string_end_to_end() {
        let mut u = uart(SimRegisters::new());
        assert_eq!(u.init(115_200), Ok(()));
        assert_eq!(u.send_string("AT\r\n", 1000), Ok(()));
        assert_eq!(u.registers().writes(DR), vec![0x41, 0x54, 0x0D, 0x0A]);
    }

    #[test]
    fn send_string_stops_at_first_failure() {
        let mut sim = SimRegisters::new();
        sim.tx_capacity = Some(2);
        let mut u = enabled(sim);

        assert_eq!(u.send_string(b"ABCD", 10), Err(UartError::Timeout));
        assert_eq!(u.registers().tx, b"AB");
    }

    #[test]
    fn send_string_returns_hardware_error_unchanged() {
        let mut u = enabled(SimRegisters::new());
        u.registers_mut().rsr = RSR_OE;

        assert_eq!(u.send_string("hello", 10), Err(UartError::HardwareError));
        assert!(u.registers().tx.is_empty());
    }

    #[test]
    fn interrupt_mask() {
        let mut u = enabled(SimRegisters::new());
        u.enable_interrupts();
        assert_eq!(u.registers().im, INT_RX);
        u.disable_interrupts();
        assert_eq!(u.registers().writes(IM), vec![INT_RX, 0]);
    }

    #[test]
    fn error_status_is_read_only() {
        let mut u = enabled(SimRegisters::new());
        u.registers_mut().rsr = RSR_PE | RSR_BE;

        assert_eq!(u.error_status(), Err(UartError::Parity));
        assert_eq!(u.error_status(), Err(UartError::Parity));
        assert!(u.registers().writes(ECR).is_empty());

        u.clear_errors();
        assert_eq!(u.registers().writes(ECR), vec![ECR_CLEAR_ALL]);
        assert_eq!(u.error_status(), Ok(()));
    }

    #[test]
    fn interrupt_echoes_and_clears() {
        let mut sim = SimRegisters::new();
        sim.rx.push_back(u32::from(b'z'));
        let mut u = enabled(sim);
        u.enable_interrupts();
        u.registers_mut().ris = INT_RX;

        u.interrupt_handler();

        let sim = u.registers();
        assert_eq!(sim.tx, b"z");
        assert_eq!(sim.writes(ICR).last(), Some(&INT_RX));
        assert_eq!(sim.ris, 0);
    }

    #[test]
    fn interrupt_clears_on_receive_failure() {
        let mut sim = SimRegisters::new();
        sim.rsr = RSR_FE;
        sim.rx.push_back(u32::from(b'z'));
        let mut u = Uart::new(
            sim,
            FakeClock::new(0, 1),
            Config::new().with_default_timeout_ms(10),
        );
        u.init(115_200).unwrap();
        u.enable_interrupts();
        u.registers_mut().ris = INT_RX;

        u.interrupt_handler();

        let sim = u.registers();
        assert!(sim.tx.is_empty());
        assert_eq!(sim.ris, 0);
        assert_eq!(sim.writes(ICR).last(), Some(&INT_RX));
    }

    #[test]
    fn interrupt_clears_on_receive_timeout() {
        let mut sim = SimRegisters::new();
        sim.ris = INT_RX;
        let mut u = Uart::new(
            sim,
            FakeClock::new(0, 1),
            Config::new().with_default_timeout_ms(10),
        );
        u.enable_interrupts();

        u.interrupt_handler();

        assert!(u.registers().tx.is_empty());
        assert_eq!(u.registers().writes(ICR), vec![INT_RX]);
    }

    #[test]
    fn masked_interrupt_is_ignored() {
        let mut sim = SimRegisters::new();
        sim.rx.push_back(u32::from(b'z'));
        let mut u = enabled(sim);
        u.registers_mut().ris = INT_RX;

        u.interrupt_handler();

        let sim = u.registers();
        assert_eq!(sim.writes(ICR), vec![INT_ALL]);
        assert_eq!(sim.rx.len(), 1);
        assert_eq!(sim.ris, INT_RX);
    }

    #[test]
    fn flush_waits_for_idle() {
        let mut sim = SimRegisters::new();
        sim.busy_reads = 3;
        let mut u = enabled(sim);
        assert_eq!(u.flush(10), Ok(()));

        u.registers_mut().busy_reads = u32::MAX;
        assert_eq!(u.flush(10), Err(UartError::Timeout));
    }

    #[test]
    fn formatted_output() {
        let mut u = enabled(SimRegisters::new());
        write!(u, "n={}\r\n", 42).unwrap();
        assert_eq!(u.registers().tx, b"n=42\r\n");

        u.registers_mut().tx_full_reads = u32::MAX;
        let mut u = Uart::new(
            u.free().0,
            FakeClock::new(0, 1),
            Config::new().with_default_timeout_ms(5),
        );
        assert!(write!(u, "x").is_err());
    }
}
