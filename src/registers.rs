//! ESP32-class UART register block and typed field access.
//!
//! The block follows the hardware register map, so a pointer to a live
//! peripheral casts directly to [`UartRegisterBlock`]. The same type is
//! constructible in plain RAM ([`UartRegisterBlock::new`]) for host-side
//! tests and simulators, which is how every register operation in this crate
//! is exercised without hardware.

use bitflags::bitflags;
use core::cell::UnsafeCell;

/// One 32-bit memory-mapped register.
///
/// Reads and writes are volatile. The cell carries no synchronization of its
/// own: configuration registers must only be written while holding the
/// owning port's lock, while status and raw-latch registers are
/// hardware-maintained and may be read lock-free.
#[repr(transparent)]
pub struct Reg(UnsafeCell<u32>);

// SAFETY: all access is volatile through `read`/`write`; exclusion for
// read-modify-write sequences is provided by the port lock, per the
// discipline documented on the type.
unsafe impl Sync for Reg {}

impl Reg {
    const fn zeroed() -> Self {
        Self(UnsafeCell::new(0))
    }

    /// Volatile read of the whole register.
    #[inline]
    pub fn read(&self) -> u32 {
        // SAFETY: the pointer comes from a live `UnsafeCell` inside this
        // register block, valid for the block's lifetime.
        unsafe { self.0.get().read_volatile() }
    }

    /// Volatile write of the whole register.
    #[inline]
    pub fn write(&self, value: u32) {
        // SAFETY: as in `read`.
        unsafe { self.0.get().write_volatile(value) }
    }

    /// Read-modify-write of the whole register.
    #[inline]
    pub fn modify(&self, f: impl FnOnce(u32) -> u32) {
        self.write(f(self.read()));
    }

    fn field(&self, shift: u32, mask: u32) -> u32 {
        (self.read() >> shift) & mask
    }

    fn set_field(&self, shift: u32, mask: u32, value: u32) {
        self.modify(|v| (v & !(mask << shift)) | ((value & mask) << shift));
    }

    fn bit(&self, bit: u32) -> bool {
        self.field(bit, 1) != 0
    }

    fn set_bit(&self, bit: u32, on: bool) {
        self.set_field(bit, 1, on as u32);
    }
}

bitflags! {
    /// UART interrupt bits, as laid out identically in the raw-status,
    /// enable, and write-1-to-clear registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptMask: u32 {
        /// RX FIFO reached its full threshold.
        const RXFIFO_FULL      = 1 << 0;
        /// TX FIFO fell below its empty threshold.
        const TXFIFO_EMPTY     = 1 << 1;
        /// Parity error on a received frame.
        const PARITY_ERR       = 1 << 2;
        /// Framing error on a received frame.
        const FRAME_ERR        = 1 << 3;
        /// RX FIFO overflow.
        const RXFIFO_OVF       = 1 << 4;
        /// DSR line changed.
        const DSR_CHG          = 1 << 5;
        /// CTS line changed.
        const CTS_CHG          = 1 << 6;
        /// Break condition detected on the receive line.
        const BRK_DET          = 1 << 7;
        /// RX FIFO receive timeout.
        const RXFIFO_TOUT      = 1 << 8;
        /// Software-flow-control XON received.
        const SW_XON           = 1 << 9;
        /// Software-flow-control XOFF received.
        const SW_XOFF          = 1 << 10;
        /// Glitch shorter than a valid start bit detected.
        const GLITCH_DET       = 1 << 11;
        /// Transmitter finished sending the break's low phase.
        const TX_BRK_DONE      = 1 << 12;
        /// Transmitter finished the idle (mark-after-break) phase.
        const TX_BRK_IDLE_DONE = 1 << 13;
        /// Transmitter sent the last FIFO byte out the wire.
        const TX_DONE          = 1 << 14;
        /// Parity error in RS-485 mode.
        const RS485_PARITY_ERR = 1 << 15;
        /// Framing error in RS-485 mode.
        const RS485_FRAME_ERR  = 1 << 16;
        /// Bus collision detected in RS-485 mode.
        const RS485_CLASH      = 1 << 17;
        /// AT command character sequence detected.
        const AT_CMD_CHAR_DET  = 1 << 18;
    }
}

// status
const RXFIFO_CNT_SHIFT: u32 = 0;
const TXFIFO_CNT_SHIFT: u32 = 16;
const FIFO_CNT_MASK: u32 = 0xff;

// conf0
const STOP_BIT_NUM_SHIFT: u32 = 4;
const STOP_BIT_NUM_MASK: u32 = 0b11;
const TXD_BRK_BIT: u32 = 8;

// conf1
const RXFIFO_FULL_THRHD_SHIFT: u32 = 0;
const RXFIFO_FULL_THRHD_MASK: u32 = 0x7f;

// clkdiv: 20.4 fixed point
const CLKDIV_INT_SHIFT: u32 = 0;
const CLKDIV_INT_MASK: u32 = 0xf_ffff;
const CLKDIV_FRAG_SHIFT: u32 = 20;
const CLKDIV_FRAG_MASK: u32 = 0xf;

// idle_conf
const TX_IDLE_NUM_SHIFT: u32 = 10;
const TX_IDLE_NUM_MASK: u32 = 0x3ff;
const TX_BRK_NUM_SHIFT: u32 = 20;
const TX_BRK_NUM_MASK: u32 = 0xff;

// rs485_conf
const RS485_EN_BIT: u32 = 0;
const RS485_DL1_EN_BIT: u32 = 2;

/// UART peripheral register block.
///
/// Only the registers this layer touches carry accessors; the rest are
/// present as padding so field offsets match the hardware map.
#[repr(C)]
pub struct UartRegisterBlock {
    /// 0x00: FIFO read/write window.
    pub fifo: Reg,
    /// 0x04: raw (unmasked) interrupt latches.
    pub int_raw: Reg,
    /// 0x08: masked interrupt status.
    pub int_st: Reg,
    /// 0x0c: interrupt enable mask.
    pub int_ena: Reg,
    /// 0x10: interrupt clear, write 1 to clear the matching latch.
    pub int_clr: Reg,
    /// 0x14: baud-rate clock divider, 20.4 fixed point.
    pub clkdiv: Reg,
    /// 0x18: auto-baud detection control.
    pub auto_baud: Reg,
    /// 0x1c: FIFO counts and transceiver state machines.
    pub status: Reg,
    /// 0x20: frame format, stop bits, break-generation enable.
    pub conf0: Reg,
    /// 0x24: FIFO thresholds.
    pub conf1: Reg,
    _lowpulse: Reg,
    _highpulse: Reg,
    _rxd_cnt: Reg,
    _flow_conf: Reg,
    _sleep_conf: Reg,
    _swfc_conf: Reg,
    /// 0x40: break length and idle (mark-after-break) length, in bit periods.
    pub idle_conf: Reg,
    /// 0x44: RS-485 mode control.
    pub rs485_conf: Reg,
}

impl UartRegisterBlock {
    /// An all-zero register block in RAM, the peripheral's reset state.
    ///
    /// Exists for host-side tests and bus simulators; on hardware the block
    /// is obtained by casting the peripheral's base address.
    pub const fn new() -> Self {
        Self {
            fifo: Reg::zeroed(),
            int_raw: Reg::zeroed(),
            int_st: Reg::zeroed(),
            int_ena: Reg::zeroed(),
            int_clr: Reg::zeroed(),
            clkdiv: Reg::zeroed(),
            auto_baud: Reg::zeroed(),
            status: Reg::zeroed(),
            conf0: Reg::zeroed(),
            conf1: Reg::zeroed(),
            _lowpulse: Reg::zeroed(),
            _highpulse: Reg::zeroed(),
            _rxd_cnt: Reg::zeroed(),
            _flow_conf: Reg::zeroed(),
            _sleep_conf: Reg::zeroed(),
            _swfc_conf: Reg::zeroed(),
            idle_conf: Reg::zeroed(),
            rs485_conf: Reg::zeroed(),
        }
    }

    /// Bytes currently queued in the transmit FIFO. Hardware-maintained.
    #[inline]
    pub fn tx_fifo_count(&self) -> u32 {
        self.status.field(TXFIFO_CNT_SHIFT, FIFO_CNT_MASK)
    }

    /// Bytes currently held in the receive FIFO. Hardware-maintained.
    #[inline]
    pub fn rx_fifo_count(&self) -> u32 {
        self.status.field(RXFIFO_CNT_SHIFT, FIFO_CNT_MASK)
    }

    /// Raw (unmasked) interrupt latches.
    #[inline]
    pub fn raw_interrupts(&self) -> InterruptMask {
        InterruptMask::from_bits_retain(self.int_raw.read())
    }

    /// The currently enabled interrupt sources.
    #[inline]
    pub fn enabled_interrupts(&self) -> InterruptMask {
        InterruptMask::from_bits_retain(self.int_ena.read())
    }

    /// Replace the whole interrupt enable mask.
    pub fn set_enabled_interrupts(&self, mask: InterruptMask) {
        self.int_ena.write(mask.bits());
    }

    /// Enable `mask` in addition to the already-enabled sources.
    pub fn enable_interrupts(&self, mask: InterruptMask) {
        self.int_ena.modify(|v| v | mask.bits());
    }

    /// Disable `mask`, leaving other sources enabled.
    pub fn disable_interrupts(&self, mask: InterruptMask) {
        self.int_ena.modify(|v| v & !mask.bits());
    }

    /// Acknowledge the latches in `mask`.
    pub fn clear_interrupts(&self, mask: InterruptMask) {
        self.int_clr.write(mask.bits());
    }

    /// Acknowledge every latch, including bits this layer does not name.
    pub fn clear_all_interrupts(&self) {
        self.int_clr.write(u32::MAX);
    }

    /// Is hardware break generation enabled?
    pub fn break_enabled(&self) -> bool {
        self.conf0.bit(TXD_BRK_BIT)
    }

    /// Enable or disable hardware break generation.
    pub fn set_break_enabled(&self, on: bool) {
        self.conf0.set_bit(TXD_BRK_BIT, on);
    }

    /// Break (space) duration, in bit periods.
    pub fn break_bits(&self) -> u8 {
        self.idle_conf.field(TX_BRK_NUM_SHIFT, TX_BRK_NUM_MASK) as u8
    }

    /// Set the break (space) duration, in bit periods.
    pub fn set_break_bits(&self, bits: u8) {
        self.idle_conf
            .set_field(TX_BRK_NUM_SHIFT, TX_BRK_NUM_MASK, u32::from(bits));
    }

    /// Idle (mark-after-break) duration, in bit periods.
    pub fn idle_bits(&self) -> u16 {
        self.idle_conf.field(TX_IDLE_NUM_SHIFT, TX_IDLE_NUM_MASK) as u16
    }

    /// Set the idle (mark-after-break) duration, in bit periods.
    ///
    /// Values wider than the hardware field are truncated to it; register
    /// width is the only validation this layer performs.
    pub fn set_idle_bits(&self, bits: u16) {
        self.idle_conf
            .set_field(TX_IDLE_NUM_SHIFT, TX_IDLE_NUM_MASK, u32::from(bits));
    }

    /// The raw stop-bit-count field encoding.
    pub fn stop_bit_num(&self) -> u32 {
        self.conf0.field(STOP_BIT_NUM_SHIFT, STOP_BIT_NUM_MASK)
    }

    /// Write the raw stop-bit-count field encoding.
    pub fn set_stop_bit_num(&self, num: u32) {
        self.conf0.set_field(STOP_BIT_NUM_SHIFT, STOP_BIT_NUM_MASK, num);
    }

    /// Is RS-485 half-duplex mode enabled?
    pub fn rs485_enabled(&self) -> bool {
        self.rs485_conf.bit(RS485_EN_BIT)
    }

    /// Enable or disable RS-485 half-duplex mode.
    pub fn set_rs485_enabled(&self, on: bool) {
        self.rs485_conf.set_bit(RS485_EN_BIT, on);
    }

    /// Is the RS-485 delayed second stop bit enabled?
    pub fn rs485_second_stop_bit(&self) -> bool {
        self.rs485_conf.bit(RS485_DL1_EN_BIT)
    }

    /// Enable or disable the RS-485 delayed second stop bit.
    pub fn set_rs485_second_stop_bit(&self, on: bool) {
        self.rs485_conf.set_bit(RS485_DL1_EN_BIT, on);
    }

    /// RX-FIFO-full interrupt threshold, in bytes.
    pub fn rx_full_threshold(&self) -> u32 {
        self.conf1.field(RXFIFO_FULL_THRHD_SHIFT, RXFIFO_FULL_THRHD_MASK)
    }

    /// Set the RX-FIFO-full interrupt threshold, in bytes.
    pub fn set_rx_full_threshold(&self, bytes: u32) {
        self.conf1
            .set_field(RXFIFO_FULL_THRHD_SHIFT, RXFIFO_FULL_THRHD_MASK, bytes);
    }

    /// Force auto-baud detection back to its reset state.
    pub fn reset_auto_baud(&self) {
        self.auto_baud.write(0);
    }

    /// The clock divider as `(integer, sixteenths)`.
    pub fn clock_divider(&self) -> (u32, u32) {
        (
            self.clkdiv.field(CLKDIV_INT_SHIFT, CLKDIV_INT_MASK),
            self.clkdiv.field(CLKDIV_FRAG_SHIFT, CLKDIV_FRAG_MASK),
        )
    }

    /// Program the clock divider as `(integer, sixteenths)`.
    pub fn set_clock_divider(&self, integer: u32, sixteenths: u32) {
        self.clkdiv.write(
            ((integer & CLKDIV_INT_MASK) << CLKDIV_INT_SHIFT)
                | ((sixteenths & CLKDIV_FRAG_MASK) << CLKDIV_FRAG_SHIFT),
        );
    }
}

impl Default for UartRegisterBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn field_writes_do_not_disturb_neighbors() {
        let regs = UartRegisterBlock::new();
        regs.idle_conf.write(u32::MAX);

        regs.set_break_bits(0x5a);
        assert_eq!(regs.break_bits(), 0x5a);
        // Idle length and the low reserved bits keep their previous value.
        assert_eq!(regs.idle_bits(), 0x3ff);
        assert_eq!(regs.idle_conf.read() & 0x3ff, 0x3ff);

        regs.set_idle_bits(0x123);
        assert_eq!(regs.idle_bits(), 0x123);
        assert_eq!(regs.break_bits(), 0x5a);
    }

    #[test]
    fn idle_bits_truncate_to_field_width() {
        let regs = UartRegisterBlock::new();
        regs.set_idle_bits(0x7ff);
        assert_eq!(regs.idle_bits(), 0x3ff);
    }

    #[test]
    fn fifo_counts_read_their_own_bytes() {
        let regs = UartRegisterBlock::new();
        regs.status.write((17 << 16) | 3);
        assert_eq!(regs.tx_fifo_count(), 17);
        assert_eq!(regs.rx_fifo_count(), 3);
    }

    #[test]
    fn interrupt_mask_roundtrips_through_enable_register() {
        let regs = UartRegisterBlock::new();
        let mask = InterruptMask::BRK_DET | InterruptMask::TX_DONE;
        regs.set_enabled_interrupts(mask);
        assert_eq!(regs.enabled_interrupts(), mask);

        regs.enable_interrupts(InterruptMask::RXFIFO_FULL);
        regs.disable_interrupts(InterruptMask::TX_DONE);
        assert_eq!(
            regs.enabled_interrupts(),
            InterruptMask::BRK_DET | InterruptMask::RXFIFO_FULL
        );
    }

    #[test]
    fn divider_packs_integer_and_fraction() {
        let regs = UartRegisterBlock::new();
        regs.set_clock_divider(320, 5);
        assert_eq!(regs.clock_divider(), (320, 5));
        assert_eq!(regs.clkdiv.read(), (5 << 20) | 320);
    }
}
