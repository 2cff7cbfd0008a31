//! Break-signal generation by direct pin drive.
//!
//! The UART's own break generator covers the steady-state case; this path
//! exists for breaks of arbitrary length, produced by detaching the TX pin
//! from the signal matrix and holding it low by hand. The whole sequence is
//! reversible: interrupts and pin routing come back exactly as found, and
//! only the waveform on the wire is left behind.

use crate::clock::{CycleCounter, MicroClock};
use crate::platform::{Platform, tx_pin_for_port};
use crate::port::HardwarePort;

/// Hold the port's TX line low for `duration_micros`, then restore normal
/// framing.
///
/// The step order is the contract: snapshot the interrupt mask, disable and
/// clear all interrupts, detach the TX pin from the peripheral, make it a
/// digital output, drive low, hold for the full duration, drive high
/// (mark), reattach the pin to the port's transmit signal, restore the
/// snapshotted mask. Reordering any of these (reattaching before the hold
/// ends, restoring interrupts while the pin is detached) produces a
/// non-compliant break pulse.
///
/// The hold busy-waits on `clock` without feeding the watchdog; break
/// durations are protocol-scale (hundreds of microseconds), well under any
/// watchdog period. Callers on the same port must not overlap invocations;
/// [`SerialPort::send_break`](crate::SerialPort::send_break) enforces that
/// with `&mut` access.
pub fn send_break<C: CycleCounter>(
    port: &HardwarePort,
    platform: &impl Platform,
    clock: &MicroClock<C>,
    duration_micros: u64,
) {
    let pin = tx_pin_for_port(port.num());

    let saved = port.regs().enabled_interrupts();
    port.disable_all_interrupts();

    platform.detach_tx_signal(pin);
    platform.set_pin_output(pin);

    platform.write_pin(pin, false);
    clock.delay_micros(duration_micros);
    platform.write_pin(pin, true);

    platform.attach_tx_signal(pin, port.num());

    port.set_interrupt_mask(saved);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::registers::{InterruptMask, UartRegisterBlock};
    use core::cell::{Cell, RefCell};
    use core::ptr::NonNull;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum PinEvent {
        Detach(u8),
        SetOutput(u8),
        Write(u8, bool),
        Attach(u8, u8),
    }

    #[derive(Default)]
    struct RecordingPlatform {
        events: RefCell<Vec<PinEvent>>,
    }

    impl Platform for RecordingPlatform {
        fn feed_watchdog(&self) {}

        fn yield_now(&self) {}

        fn detach_tx_signal(&self, pin: u8) {
            self.events.borrow_mut().push(PinEvent::Detach(pin));
        }

        fn attach_tx_signal(&self, pin: u8, port: u8) {
            self.events.borrow_mut().push(PinEvent::Attach(pin, port));
        }

        fn set_pin_output(&self, pin: u8) {
            self.events.borrow_mut().push(PinEvent::SetOutput(pin));
        }

        fn write_pin(&self, pin: u8, level: bool) {
            self.events.borrow_mut().push(PinEvent::Write(pin, level));
        }
    }

    struct TickingCounter {
        raw: Cell<u32>,
    }

    impl CycleCounter for TickingCounter {
        fn count(&self) -> u32 {
            let v = self.raw.get();
            // 4 us per sample at 80 MHz.
            self.raw.set(v.wrapping_add(320));
            v
        }

        fn ticks_per_micro(&self) -> u32 {
            80
        }
    }

    fn port_over(num: u8, regs: &UartRegisterBlock) -> HardwarePort {
        // SAFETY: the block outlives the port, and each test builds at most
        // one port per block.
        unsafe { HardwarePort::new(num, NonNull::from(regs)) }
    }

    #[test]
    fn break_drives_the_ports_wired_pin_in_order() {
        let regs = UartRegisterBlock::new();
        let port = port_over(2, &regs);
        let platform = RecordingPlatform::default();
        let clock = MicroClock::new(TickingCounter { raw: Cell::new(0) });

        send_break(&port, &platform, &clock, 176);

        assert_eq!(
            *platform.events.borrow(),
            [
                PinEvent::Detach(17),
                PinEvent::SetOutput(17),
                PinEvent::Write(17, false),
                PinEvent::Write(17, true),
                PinEvent::Attach(17, 2),
            ]
        );
    }

    #[test]
    fn break_holds_low_for_at_least_the_duration() {
        let regs = UartRegisterBlock::new();
        let port = port_over(2, &regs);
        let platform = RecordingPlatform::default();
        let clock = MicroClock::new(TickingCounter { raw: Cell::new(0) });

        let start = clock.now_micros();
        send_break(&port, &platform, &clock, 176);
        assert!(clock.now_micros() - start >= 176);
    }

    #[test]
    fn interrupt_mask_is_restored_exactly() {
        let regs = UartRegisterBlock::new();
        let port = port_over(1, &regs);
        let platform = RecordingPlatform::default();
        let clock = MicroClock::new(TickingCounter { raw: Cell::new(0) });

        let mask = InterruptMask::BRK_DET | InterruptMask::TX_DONE | InterruptMask::RXFIFO_FULL;
        port.set_interrupt_mask(mask);

        send_break(&port, &platform, &clock, 92);

        port.with_regs(|regs| assert_eq!(regs.enabled_interrupts(), mask));
        // All latches were acknowledged while the mask was down.
        assert_eq!(regs.int_clr.read(), u32::MAX);
    }

    #[test]
    fn unmapped_port_falls_back_to_the_default_pin() {
        let regs = UartRegisterBlock::new();
        let port = port_over(0, &regs);
        let platform = RecordingPlatform::default();
        let clock = MicroClock::new(TickingCounter { raw: Cell::new(0) });

        send_break(&port, &platform, &clock, 1);

        assert_eq!(platform.events.borrow()[0], PinEvent::Detach(1));
        assert_eq!(
            *platform.events.borrow().last().unwrap(),
            PinEvent::Attach(1, 0)
        );
    }
}
