//! Mutually-exclusive UART configuration operations.
//!
//! Every operation here acquires the port lock, performs its register field
//! writes, and releases the lock on the way out. They are non-reentrant: do
//! not call one while already inside [`HardwarePort::with_regs`].

use crate::port::HardwarePort;
use crate::registers::InterruptMask;

/// Break-generation timing, in bit periods of the configured baud rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BreakConfig {
    /// Generate a break after the transmit FIFO empties.
    pub enabled: bool,
    /// Break (space) duration, in bit periods.
    pub break_bits: u8,
    /// Mark-after-break idle duration, in bit periods.
    pub idle_bits: u16,
}

impl Default for BreakConfig {
    /// A 176 µs break and 12 µs mark-after-break at 250 kbaud.
    fn default() -> Self {
        Self {
            enabled: true,
            break_bits: 44,
            idle_bits: 3,
        }
    }
}

impl HardwarePort {
    /// Enable or disable RS-485 half-duplex mode.
    pub fn set_rs485_mode(&self, enabled: bool) {
        self.with_regs(|regs| regs.set_rs485_enabled(enabled));
    }

    /// Program hardware break generation.
    ///
    /// Writes the enable flag and both length fields in one lock-held scope.
    /// Lengths are validated only by hardware register width; wider values
    /// truncate.
    pub fn configure_break_generation(&self, config: BreakConfig) {
        self.with_regs(|regs| {
            regs.set_break_enabled(config.enabled);
            regs.set_break_bits(config.break_bits);
            regs.set_idle_bits(config.idle_bits);
        });
    }

    /// Transmit two stop bits.
    ///
    /// Encoded as one stop bit in the frame register plus the RS-485 delayed
    /// second stop bit: writing the two-bit frame encoding directly stalls
    /// the transmitter on this hardware.
    pub fn force_two_stop_bits(&self) {
        self.with_regs(|regs| {
            regs.set_stop_bit_num(1);
            regs.set_rs485_second_stop_bit(true);
        });
    }

    /// Enable receive-side break detection.
    ///
    /// Break detection and auto-baud detection share underlying hardware
    /// state and must not be active simultaneously, so auto-baud is forced
    /// back to its reset value here. The receive FIFO threshold also drops
    /// to one byte so the break byte reaches software immediately.
    pub fn enable_break_detection(&self) {
        self.with_regs(|regs| {
            regs.enable_interrupts(InterruptMask::BRK_DET);
            regs.set_rx_full_threshold(1);
            regs.reset_auto_baud();
        });
    }

    /// Disable receive-side break detection, leaving other interrupt sources
    /// untouched.
    pub fn disable_break_detection(&self) {
        self.with_regs(|regs| regs.disable_interrupts(InterruptMask::BRK_DET));
    }

    /// Mask every interrupt source and clear every latched flag as one
    /// lock-held unit.
    ///
    /// Disabling without clearing would leave stale latches behind that
    /// re-fire the moment the mask is restored.
    pub fn disable_all_interrupts(&self) {
        self.with_regs(|regs| {
            regs.set_enabled_interrupts(InterruptMask::empty());
            regs.clear_all_interrupts();
        });
    }

    /// Replace the whole interrupt enable mask.
    pub fn set_interrupt_mask(&self, mask: InterruptMask) {
        self.with_regs(|regs| regs.set_enabled_interrupts(mask));
    }

    /// Clear every latched interrupt flag without touching the enable mask.
    pub fn clear_all_interrupts(&self) {
        self.with_regs(|regs| regs.clear_all_interrupts());
    }

    /// Program the baud-rate divider from the source clock `sclk_hz`.
    ///
    /// The divider is 20.4 fixed point; the fractional part counts
    /// sixteenths of a source-clock cycle. A zero `baud` is absorbed as a
    /// no-op, consistent with this layer having no error channel.
    pub fn set_baud_rate(&self, baud: u32, sclk_hz: u32) {
        if baud == 0 {
            return;
        }
        let divider = (u64::from(sclk_hz) * 16 / u64::from(baud)) as u32;
        self.with_regs(|regs| regs.set_clock_divider(divider >> 4, divider & 0xf));
    }
}
