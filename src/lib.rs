#![no_std]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

#[cfg(test)]
extern crate std;

mod break_signal;
mod clock;
mod ops;
mod platform;
mod port;
mod registers;
mod serial;
mod wait;

pub use break_signal::send_break;
pub use clock::{CycleCounter, MicroClock};
pub use ops::BreakConfig;
pub use platform::{Platform, tx_pin_for_port};
pub use port::HardwarePort;
pub use registers::{InterruptMask, Reg, UartRegisterBlock};
pub use serial::{SerialPort, debug_port, set_debug_port};
pub use wait::{wait_rx_fifo_empty, wait_tx_break_done, wait_tx_done, wait_tx_fifo_empty};

/// Error returned by [`SerialPort::open`] when the register block pointer is
/// unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OpenError {
    /// The register block pointer was null.
    NullRegisterBlock,
    /// The register block pointer is not aligned for the register layout.
    BadAlignment,
}
