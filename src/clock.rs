//! Millisecond time source for bounded waits.

/// A monotonic millisecond counter.
///
/// The counter may wrap; deadlines are computed with wrapping arithmetic, so
/// only the elapsed time between two reads has to fit in a `u32`.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed epoch.
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline]
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// A wait bounded by a timeout, started at construction.
///
/// A timeout of zero never expires.
pub(crate) struct Deadline {
    start: u32,
    timeout_ms: u32,
}

impl Deadline {
    pub(crate) fn start(clock: &impl Clock, timeout_ms: u32) -> Self {
        Self {
            start: if timeout_ms == 0 { 0 } else { clock.now_ms() },
            timeout_ms,
        }
    }

    pub(crate) fn expired(&self, clock: &impl Clock) -> bool {
        self.timeout_ms != 0 && clock.now_ms().wrapping_sub(self.start) >= self.timeout_ms
    }
}
