//! Platform services consumed by the timing core.

/// Hardware services the surrounding firmware supplies.
///
/// One implementation runs on the real chip; tests substitute a recording
/// mock, which is what makes the wait loops and the break choreography
/// observable without hardware.
pub trait Platform {
    /// Feed the system watchdog so a long hardware wait is not mistaken for
    /// a hang.
    fn feed_watchdog(&self);

    /// Voluntarily yield the processor to other ready work.
    fn yield_now(&self);

    /// Detach `pin` from the peripheral signal matrix so it becomes a plain
    /// digital output. Pull-up/pull-down and inversion configuration must be
    /// left untouched.
    fn detach_tx_signal(&self, pin: u8);

    /// Reattach `pin` to the transmit signal of UART `port` so normal
    /// framing resumes.
    fn attach_tx_signal(&self, pin: u8, port: u8);

    /// Configure `pin` as a digital output.
    fn set_pin_output(&self, pin: u8);

    /// Drive `pin` high (`true`, the idle/mark state) or low (`false`).
    fn write_pin(&self, pin: u8, level: bool);
}

/// Fixed TX pin assignment per UART port, mirroring the board wiring
/// convention. Ports without an entry fall back to pin 1.
const TX_PINS: &[(u8, u8)] = &[(1, 10), (2, 17)];

const DEFAULT_TX_PIN: u8 = 1;

/// The transmit pin wired to UART `port`.
pub fn tx_pin_for_port(port: u8) -> u8 {
    TX_PINS
        .iter()
        .find(|&&(num, _)| num == port)
        .map(|&(_, pin)| pin)
        .unwrap_or(DEFAULT_TX_PIN)
}
