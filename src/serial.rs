//! Per-port facade tying the timing core together.

use core::mem::align_of;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicU8, Ordering};

use crate::OpenError;
use crate::break_signal;
use crate::clock::{CycleCounter, MicroClock};
use crate::ops::BreakConfig;
use crate::platform::Platform;
use crate::port::HardwarePort;
use crate::registers::{InterruptMask, UartRegisterBlock};
use crate::wait;

/// Sentinel for "no debug port designated"; port index 255 is reserved.
const NO_DEBUG_PORT: u8 = u8::MAX;

static DEBUG_PORT: AtomicU8 = AtomicU8::new(NO_DEBUG_PORT);

/// The port, if any, currently designated to carry debug output.
pub fn debug_port() -> Option<u8> {
    match DEBUG_PORT.load(Ordering::Relaxed) {
        NO_DEBUG_PORT => None,
        num => Some(num),
    }
}

/// Designate which port carries debug output, or `None` for no port.
///
/// Process-wide state with a single-writer assumption: the main task owns
/// this designation, and [`SerialPort::end`] clears it only for the port
/// being torn down.
pub fn set_debug_port(port: Option<u8>) {
    DEBUG_PORT.store(port.unwrap_or(NO_DEBUG_PORT), Ordering::Relaxed);
}

/// One opened UART port, bound to the platform services and the shared
/// microsecond clock it operates with.
///
/// Everything here is a thin delegation to the underlying primitives, keyed
/// by the bound [`HardwarePort`]. After [`end`](Self::end), the handle is
/// gone: waits return immediately and configuration calls do nothing.
pub struct SerialPort<'c, P, C> {
    port: Option<HardwarePort>,
    platform: P,
    clock: &'c MicroClock<C>,
    sclk_hz: u32,
}

impl<'c, P: Platform, C: CycleCounter> SerialPort<'c, P, C> {
    /// Open port `num` over the register block at `regs`.
    ///
    /// `sclk_hz` is the UART's source clock, used for baud programming.
    ///
    /// # Safety
    ///
    /// - `regs` must map the port's UART register block and stay valid until
    ///   the facade is dropped or [`end`](Self::end) has run. Null and
    ///   misaligned pointers are caught here; liveness cannot be.
    /// - At most one open port object may exist per hardware index.
    pub unsafe fn open(
        num: u8,
        regs: *mut UartRegisterBlock,
        platform: P,
        clock: &'c MicroClock<C>,
        sclk_hz: u32,
    ) -> Result<Self, OpenError> {
        let Some(regs) = NonNull::new(regs) else {
            return Err(OpenError::NullRegisterBlock);
        };
        if !regs.addr().get().is_multiple_of(align_of::<UartRegisterBlock>()) {
            return Err(OpenError::BadAlignment);
        }
        // SAFETY: liveness and the one-port-per-index invariant are the
        // caller's obligations, forwarded from this function's contract.
        let port = unsafe { HardwarePort::new(num, regs) };
        Ok(Self {
            port: Some(port),
            platform,
            clock,
            sclk_hz,
        })
    }

    /// Is the port still open?
    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// The bound hardware port, while open.
    ///
    /// Escape hatch for the outer driver (event-queue attachment, direct
    /// status polling).
    pub fn port(&mut self) -> Option<&mut HardwarePort> {
        self.port.as_mut()
    }

    /// Program the baud rate from the source clock supplied at open.
    pub fn set_baud_rate(&mut self, baud: u32) {
        if let Some(port) = &self.port {
            port.set_baud_rate(baud, self.sclk_hz);
        }
    }

    /// Enable or disable RS-485 half-duplex mode.
    pub fn set_rs485_mode(&mut self, enabled: bool) {
        if let Some(port) = &self.port {
            port.set_rs485_mode(enabled);
        }
    }

    /// Program hardware break generation.
    pub fn configure_break_generation(&mut self, config: BreakConfig) {
        if let Some(port) = &self.port {
            port.configure_break_generation(config);
        }
    }

    /// Transmit two stop bits.
    pub fn force_two_stop_bits(&mut self) {
        if let Some(port) = &self.port {
            port.force_two_stop_bits();
        }
    }

    /// Enable receive-side break detection.
    pub fn enable_break_detection(&mut self) {
        if let Some(port) = &self.port {
            port.enable_break_detection();
        }
    }

    /// Disable receive-side break detection.
    pub fn disable_break_detection(&mut self) {
        if let Some(port) = &self.port {
            port.disable_break_detection();
        }
    }

    /// Mask every interrupt source and clear every latched flag.
    pub fn disable_all_interrupts(&mut self) {
        if let Some(port) = &self.port {
            port.disable_all_interrupts();
        }
    }

    /// Replace the whole interrupt enable mask.
    pub fn set_interrupt_mask(&mut self, mask: InterruptMask) {
        if let Some(port) = &self.port {
            port.set_interrupt_mask(mask);
        }
    }

    /// Clear every latched interrupt flag.
    pub fn clear_all_interrupts(&mut self) {
        if let Some(port) = &self.port {
            port.clear_all_interrupts();
        }
    }

    /// Block until the transmit FIFO has drained.
    pub fn wait_tx_fifo_empty(&self) {
        wait::wait_tx_fifo_empty(self.port.as_ref(), &self.platform);
    }

    /// Block until the receive FIFO has been drained.
    pub fn wait_rx_fifo_empty(&self) {
        wait::wait_rx_fifo_empty(self.port.as_ref(), &self.platform);
    }

    /// Block until the last byte is out the wire, then acknowledge the latch.
    pub fn wait_tx_done(&self) {
        wait::wait_tx_done(self.port.as_ref(), &self.platform);
    }

    /// Block until the break's idle phase completes, then acknowledge the
    /// latch.
    pub fn wait_tx_break_done(&self) {
        wait::wait_tx_break_done(self.port.as_ref(), &self.platform);
    }

    /// Emit a break of `duration_micros` on the TX line.
    ///
    /// Exclusive (`&mut`) access is what keeps two execution contexts from
    /// interleaving the pin choreography on one port.
    pub fn send_break(&mut self, duration_micros: u64) {
        if let Some(port) = &self.port {
            break_signal::send_break(port, &self.platform, self.clock, duration_micros);
        }
    }

    /// Shut the port down.
    ///
    /// Disables and clears all interrupts, withdraws the debug-output
    /// designation if it names this port, and releases the hardware handle.
    /// The facade stays usable as a closed port: waits return immediately
    /// and configuration calls do nothing. Calling `end` again is a no-op.
    pub fn end(&mut self) {
        let Some(port) = self.port.take() else { return };
        port.disable_all_interrupts();
        if debug_port() == Some(port.num()) {
            set_debug_port(None);
        }
    }
}
