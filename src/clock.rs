//! Monotonic microsecond clock and busy-wait delay.
//!
//! The platform's free-running cycle counter is 32 bits wide and wraps every
//! few tens of seconds at typical core clocks. [`MicroClock`] folds those
//! wraps into a 64-bit microsecond value that only ever moves forward, and
//! [`MicroClock::delay_micros`] spins on it for the short, timing-critical
//! holds that break generation needs.

use core::cell::Cell;
use core::hint;
use critical_section::Mutex;

/// A free-running 32-bit cycle counter with a fixed, known tick rate.
///
/// The hardware implementation reads the counter with a single privileged
/// instruction; tests substitute a scripted counter. `ticks_per_micro` must
/// be nonzero and must not change over the life of the counter.
pub trait CycleCounter {
    /// Read the current raw counter value.
    fn count(&self) -> u32;

    /// Counter ticks per microsecond (the counter clock in MHz).
    fn ticks_per_micro(&self) -> u32;
}

#[derive(Clone, Copy)]
struct ClockState {
    last_raw: u32,
    overflow_micros: u64,
}

/// Monotonic microsecond clock over a wrapping cycle counter.
///
/// Intended to be created once per firmware image (typically as a `static`)
/// and shared by every port; the wrap accounting is process-wide state, not
/// tied to any particular UART.
///
/// [`now_micros`](Self::now_micros) is safe to call from any execution
/// context, including ones that suppress preemption: the read-compare-
/// accumulate sequence runs inside its own critical section, separate from
/// any port lock.
///
/// Wrap detection assumes the raw counter wraps at most once between calls.
/// If no caller samples the clock for longer than one full counter period,
/// the accounting silently loses whole wraps. The delays this clock backs
/// are sub-second, so that window is never approached in practice; it is a
/// documented limit, not a recoverable condition.
pub struct MicroClock<C> {
    counter: C,
    state: Mutex<Cell<ClockState>>,
}

impl<C: CycleCounter> MicroClock<C> {
    /// Create a clock over `counter`, with zero elapsed time.
    pub const fn new(counter: C) -> Self {
        Self {
            counter,
            state: Mutex::new(Cell::new(ClockState {
                last_raw: 0,
                overflow_micros: 0,
            })),
        }
    }

    /// Microseconds elapsed since the clock was created.
    ///
    /// Non-decreasing across any sequence of calls close enough together
    /// that the raw counter cannot wrap twice in between.
    pub fn now_micros(&self) -> u64 {
        let ticks_per_micro = self.counter.ticks_per_micro();
        critical_section::with(|cs| {
            let cell = self.state.borrow(cs);
            let mut state = cell.get();
            let raw = self.counter.count();
            if raw < state.last_raw {
                // One full counter period elapsed since the previous sample.
                state.overflow_micros += u64::from(u32::MAX / ticks_per_micro);
            }
            state.last_raw = raw;
            cell.set(state);
            state.overflow_micros + u64::from(raw / ticks_per_micro)
        })
    }

    /// Block the calling context for at least `duration` microseconds.
    ///
    /// Pure polling: no sleeping, no yielding, no watchdog feeding. The
    /// holds this is used for (break and mark-after-break timing) are
    /// microsecond-to-millisecond scale, short enough that starving the
    /// watchdog for the duration is the accepted trade-off. For
    /// hardware-dependent waits of unbounded length use the watchdog-fed
    /// operations ([`wait_tx_done`](crate::wait_tx_done) and friends)
    /// instead.
    pub fn delay_micros(&self, duration: u64) {
        if duration == 0 {
            return;
        }
        let start = self.now_micros();
        let target = start.wrapping_add(duration);
        if target < start {
            // The target wrapped past u64::MAX. Wait out the high range
            // first so the second loop terminates at the wrapped target.
            while self.now_micros() > target {
                hint::spin_loop();
            }
        }
        while self.now_micros() < target {
            hint::spin_loop();
        }
    }
}
