//! Watchdog-safe blocking waits on hardware status.
//!
//! These waits differ from [`MicroClock::delay_micros`] on purpose: their
//! durations are hardware-dependent and potentially long (a full FIFO drain,
//! a whole frame on the wire), so each poll feeds the watchdog and yields to
//! other ready work instead of spinning hot. None of them takes a timeout; a
//! status condition that never comes true hangs the calling context, and the
//! watchdog feeding only keeps that from escalating into a system reset.
//!
//! [`MicroClock::delay_micros`]: crate::MicroClock::delay_micros

use crate::platform::Platform;
use crate::port::HardwarePort;
use crate::registers::InterruptMask;

/// Poll `done` until it holds, feeding the watchdog and yielding between
/// polls.
fn spin_until(platform: &impl Platform, mut done: impl FnMut() -> bool) {
    while !done() {
        platform.feed_watchdog();
        platform.yield_now();
    }
}

/// Block until the transmit FIFO has drained.
///
/// A closed port (`None`) returns immediately; so do all the waits below.
pub fn wait_tx_fifo_empty(port: Option<&HardwarePort>, platform: &impl Platform) {
    let Some(port) = port else { return };
    let regs = port.regs();
    spin_until(platform, || regs.tx_fifo_count() == 0);
}

/// Block until the receive FIFO has been drained by the consumer.
pub fn wait_rx_fifo_empty(port: Option<&HardwarePort>, platform: &impl Platform) {
    let Some(port) = port else { return };
    let regs = port.regs();
    spin_until(platform, || regs.rx_fifo_count() == 0);
}

/// Block until the transmitter has pushed its last byte out the wire, then
/// acknowledge the latch.
///
/// The TX-done condition latches in hardware and requires a software
/// acknowledgment; clearing it here is part of the contract so the next
/// frame's completion can latch fresh.
pub fn wait_tx_done(port: Option<&HardwarePort>, platform: &impl Platform) {
    let Some(port) = port else { return };
    let regs = port.regs();
    spin_until(platform, || {
        regs.raw_interrupts().contains(InterruptMask::TX_DONE)
    });
    regs.clear_interrupts(InterruptMask::TX_DONE);
}

/// Block until the transmitter has finished a break's idle (mark-after-break)
/// phase, then acknowledge the latch.
pub fn wait_tx_break_done(port: Option<&HardwarePort>, platform: &impl Platform) {
    let Some(port) = port else { return };
    let regs = port.regs();
    spin_until(platform, || {
        regs.raw_interrupts()
            .contains(InterruptMask::TX_BRK_IDLE_DONE)
    });
    regs.clear_interrupts(InterruptMask::TX_BRK_IDLE_DONE);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registers::UartRegisterBlock;
    use core::cell::Cell;
    use core::ptr::NonNull;

    /// Platform whose watchdog feed mutates the register block after a set
    /// number of polls, standing in for hardware making progress while the
    /// caller waits.
    struct FeedDriven<'a> {
        regs: &'a UartRegisterBlock,
        feeds: Cell<u32>,
        yields: Cell<u32>,
        satisfy_after: u32,
        satisfy: fn(&UartRegisterBlock),
    }

    impl<'a> FeedDriven<'a> {
        fn new(regs: &'a UartRegisterBlock, satisfy_after: u32, satisfy: fn(&UartRegisterBlock)) -> Self {
            Self {
                regs,
                feeds: Cell::new(0),
                yields: Cell::new(0),
                satisfy_after,
                satisfy,
            }
        }
    }

    impl Platform for FeedDriven<'_> {
        fn feed_watchdog(&self) {
            let n = self.feeds.get() + 1;
            self.feeds.set(n);
            if n >= self.satisfy_after {
                (self.satisfy)(self.regs);
            }
        }

        fn yield_now(&self) {
            self.yields.set(self.yields.get() + 1);
        }

        fn detach_tx_signal(&self, _pin: u8) {
            unreachable!("waits never touch pins")
        }

        fn attach_tx_signal(&self, _pin: u8, _port: u8) {
            unreachable!("waits never touch pins")
        }

        fn set_pin_output(&self, _pin: u8) {
            unreachable!("waits never touch pins")
        }

        fn write_pin(&self, _pin: u8, _level: bool) {
            unreachable!("waits never touch pins")
        }
    }

    /// Platform that trips on any use; waits on a closed port must not poll.
    struct Untouchable;

    impl Platform for Untouchable {
        fn feed_watchdog(&self) {
            unreachable!("closed port must not be polled")
        }

        fn yield_now(&self) {
            unreachable!("closed port must not be polled")
        }

        fn detach_tx_signal(&self, _pin: u8) {
            unreachable!()
        }

        fn attach_tx_signal(&self, _pin: u8, _port: u8) {
            unreachable!()
        }

        fn set_pin_output(&self, _pin: u8) {
            unreachable!()
        }

        fn write_pin(&self, _pin: u8, _level: bool) {
            unreachable!()
        }
    }

    fn port_over(regs: &UartRegisterBlock) -> HardwarePort {
        // SAFETY: the block outlives the port, and each test builds at most
        // one port per block.
        unsafe { HardwarePort::new(2, NonNull::from(regs)) }
    }

    #[test]
    fn closed_port_returns_without_polling() {
        wait_tx_fifo_empty(None, &Untouchable);
        wait_rx_fifo_empty(None, &Untouchable);
        wait_tx_done(None, &Untouchable);
        wait_tx_break_done(None, &Untouchable);
    }

    #[test]
    fn tx_fifo_wait_feeds_and_yields_until_drained() {
        let regs = UartRegisterBlock::new();
        regs.status.write(5 << 16);
        let port = port_over(&regs);
        let platform = FeedDriven::new(&regs, 3, |regs| regs.status.write(0));

        wait_tx_fifo_empty(Some(&port), &platform);

        assert_eq!(platform.feeds.get(), 3);
        assert_eq!(platform.yields.get(), 3);
    }

    #[test]
    fn rx_fifo_wait_observes_drain() {
        let regs = UartRegisterBlock::new();
        regs.status.write(2);
        let port = port_over(&regs);
        let platform = FeedDriven::new(&regs, 1, |regs| regs.status.write(0));

        wait_rx_fifo_empty(Some(&port), &platform);
        assert_eq!(platform.feeds.get(), 1);
    }

    #[test]
    fn tx_done_wait_acknowledges_latch() {
        let regs = UartRegisterBlock::new();
        let port = port_over(&regs);
        let platform = FeedDriven::new(&regs, 4, |regs| {
            regs.int_raw.write(InterruptMask::TX_DONE.bits());
        });

        wait_tx_done(Some(&port), &platform);

        assert_eq!(platform.feeds.get(), 4);
        assert_eq!(regs.int_clr.read(), InterruptMask::TX_DONE.bits());
    }

    #[test]
    fn break_done_wait_acknowledges_its_own_latch() {
        let regs = UartRegisterBlock::new();
        let port = port_over(&regs);
        let platform = FeedDriven::new(&regs, 1, |regs| {
            regs.int_raw.write(InterruptMask::TX_BRK_IDLE_DONE.bits());
        });

        wait_tx_break_done(Some(&port), &platform);
        assert_eq!(regs.int_clr.read(), InterruptMask::TX_BRK_IDLE_DONE.bits());
    }

    #[test]
    fn already_satisfied_condition_never_feeds() {
        let regs = UartRegisterBlock::new();
        let port = port_over(&regs);

        // FIFO counts are zero at reset, so the wait completes on the first
        // poll with no watchdog or yield traffic.
        wait_tx_fifo_empty(Some(&port), &Untouchable);
        wait_rx_fifo_empty(Some(&port), &Untouchable);
    }
}
