//! Monotonic time source and elapsed-time helpers.
//!
//! The platform provides a free-running microsecond counter through
//! [`TimeBase`]. The counter wraps from [`TimeBase::max_us`] back to zero;
//! [`TimeDiff`] measures intervals across any number of wraps, provided it is
//! polled at least once per counter period.

/// A monotonic microsecond counter.
pub trait TimeBase {
    /// Current counter value in microseconds.
    fn now_us(&self) -> u32;

    /// Largest value the counter reaches before wrapping to zero.
    fn max_us(&self) -> u32 {
        u32::MAX
    }
}

impl<T: TimeBase + ?Sized> TimeBase for &T {
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }

    fn max_us(&self) -> u32 {
        (**self).max_us()
    }
}

/// Microseconds between `start` and `now` for a counter that wraps at `max`.
///
/// The step from `max` to zero counts as one microsecond.
///
/// ```rust
/// use mqtt_rpc::time::elapsed_us;
///
/// assert_eq!(elapsed_us(10, 25, u32::MAX), 15);
/// assert_eq!(elapsed_us(u32::MAX - 99, 50, u32::MAX), 150);
/// ```
pub fn elapsed_us(start: u32, now: u32, max: u32) -> u32 {
    if now >= start {
        now - start
    } else {
        (max - start).wrapping_add(now).wrapping_add(1)
    }
}

/// A time mark that answers "has N milliseconds passed since then".
///
/// Each query folds the counter movement since the previous query into a
/// 64-bit total, so intervals longer than one counter period are measured
/// correctly as long as the mark is polled at least once per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeDiff {
    start_us: u32,
    last_us: u32,
    total_us: u64,
}

impl TimeDiff {
    /// Create a mark at the current time.
    pub fn new<T: TimeBase>(clock: &T) -> Self {
        let now = clock.now_us();
        Self {
            start_us: now,
            last_us: now,
            total_us: 0,
        }
    }

    /// Move the mark to the current time.
    pub fn set_start<T: TimeBase>(&mut self, clock: &T) {
        *self = Self::new(clock);
    }

    /// The raw mark value.
    pub fn start_us(&self) -> u32 {
        self.start_us
    }

    /// Microseconds since the mark.
    pub fn elapsed_us<T: TimeBase>(&mut self, clock: &T) -> u64 {
        let now = clock.now_us();
        let step = elapsed_us(self.last_us, now, clock.max_us());
        self.total_us = self.total_us.saturating_add(u64::from(step));
        self.last_us = now;
        self.total_us
    }

    /// Whole milliseconds since the mark.
    pub fn elapsed_ms<T: TimeBase>(&mut self, clock: &T) -> u64 {
        self.elapsed_us(clock) / 1000
    }

    /// Returns `true` once at least `ms` milliseconds have passed.
    pub fn is_elapsed_ms<T: TimeBase>(&mut self, clock: &T, ms: u32) -> bool {
        self.elapsed_us(clock) >= u64::from(ms) * 1000
    }

    /// Like [`is_elapsed_ms`](Self::is_elapsed_ms), but moves the mark to the
    /// current time whenever it fires.
    pub fn is_elapsed_recurring_ms<T: TimeBase>(&mut self, clock: &T, ms: u32) -> bool {
        if self.is_elapsed_ms(clock, ms) {
            self.set_start(clock);
            true
        } else {
            false
        }
    }
}
