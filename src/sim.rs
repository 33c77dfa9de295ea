//! Simulated register file and clock for host tests.

use core::cell::Cell;
use std::collections::VecDeque;
use std::vec::Vec;

use crate::clock::Clock;
use crate::regs::*;

/// One recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read(usize),
    Write(usize, u32),
}

/// An in-memory UART that behaves like the hardware for the registers the
/// driver uses, and records every access in order.
#[derive(Debug, Default)]
pub(crate) struct SimRegisters {
    pub ctl: u32,
    pub ibrd: u32,
    pub fbrd: u32,
    pub lcrh: u32,
    pub im: u32,
    pub rsr: u32,
    pub ris: u32,
    /// Words returned by successive reads of DR.
    pub rx: VecDeque<u32>,
    /// Bytes written to DR.
    pub tx: Vec<u8>,
    /// Report TXFF once the transmit side holds this many bytes.
    pub tx_capacity: Option<usize>,
    /// Report TXFF for this many FR reads; `u32::MAX` never clears.
    pub tx_full_reads: u32,
    /// Report BUSY for this many FR reads; `u32::MAX` never clears.
    pub busy_reads: u32,
    /// The enable bit never reads back, as on an unclocked peripheral.
    pub ctl_stuck_off: bool,
    pub accesses: Vec<Access>,
}

impl SimRegisters {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Values written to `offset`, in order.
    pub(crate) fn writes(&self, offset: usize) -> Vec<u32> {
        self.accesses
            .iter()
            .filter_map(|a| match *a {
                Access::Write(o, v) if o == offset => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Number of reads of `offset`.
    pub(crate) fn reads(&self, offset: usize) -> usize {
        self.accesses
            .iter()
            .filter(|a| **a == Access::Read(offset))
            .count()
    }

    fn countdown(counter: &mut u32) -> bool {
        match *counter {
            0 => false,
            u32::MAX => true,
            _ => {
                *counter -= 1;
                true
            }
        }
    }

    fn flags(&mut self) -> u32 {
        let mut fr = 0;
        let at_capacity = self.tx_capacity.is_some_and(|cap| self.tx.len() >= cap);
        if Self::countdown(&mut self.tx_full_reads) || at_capacity {
            fr |= FR_TXFF;
        }
        if self.rx.is_empty() {
            fr |= FR_RXFE;
        }
        if Self::countdown(&mut self.busy_reads) {
            fr |= FR_BUSY;
        }
        fr
    }
}

impl Registers for SimRegisters {
    fn read(&mut self, offset: usize) -> u32 {
        self.accesses.push(Access::Read(offset));
        match offset {
            DR => self.rx.pop_front().unwrap_or(0),
            RSR => self.rsr,
            FR => self.flags(),
            IBRD => self.ibrd,
            FBRD => self.fbrd,
            LCRH => self.lcrh,
            CTL if self.ctl_stuck_off => 0,
            CTL => self.ctl,
            IM => self.im,
            RIS => self.ris,
            MIS => self.ris & self.im,
            _ => 0,
        }
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.accesses.push(Access::Write(offset, value));
        match offset {
            DR => self.tx.push(value as u8),
            ECR => self.rsr = 0,
            IBRD => self.ibrd = value,
            FBRD => self.fbrd = value,
            LCRH => self.lcrh = value,
            CTL => self.ctl = value,
            IM => self.im = value,
            ICR => self.ris &= !value,
            _ => {}
        }
    }
}

/// A clock that advances by `step` milliseconds every time it is read.
#[derive(Debug)]
pub(crate) struct FakeClock {
    now: Cell<u32>,
    step: u32,
}

impl FakeClock {
    pub(crate) fn new(start: u32, step: u32) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}
