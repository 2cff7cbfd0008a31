//! Per-port hardware handle and lock discipline.

use core::ptr::NonNull;
use spin::Mutex;

use crate::registers::UartRegisterBlock;

/// One physical UART port.
///
/// The register block is the port's single shared mutable resource. All
/// configuration writes go through [`with_regs`](Self::with_regs), which
/// holds the port's spin lock for the duration of the closure so no two
/// configuration writes can interleave. Read-only polling of
/// hardware-maintained status fields is permitted lock-free through
/// [`regs`](Self::regs).
///
/// The lock is distinct from the microsecond clock's critical section; the
/// clock is process-wide state with no relation to any particular port.
pub struct HardwarePort {
    num: u8,
    regs: NonNull<UartRegisterBlock>,
    lock: Mutex<()>,
    queue: Option<NonNull<()>>,
}

// SAFETY: the register block behind `regs` is only ever mutated while `lock`
// is held, and lock-free readers touch hardware-maintained fields through
// volatile reads only. The queue handle is opaque and never dereferenced at
// this layer.
unsafe impl Send for HardwarePort {}
// SAFETY: as above; every `&self` mutation path funnels through the lock.
unsafe impl Sync for HardwarePort {}

impl HardwarePort {
    /// Bind port `num` to the register block at `regs`.
    ///
    /// # Safety
    ///
    /// - `regs` must point to a properly mapped, properly aligned UART
    ///   register block that stays valid for the lifetime of the returned
    ///   port.
    /// - At most one `HardwarePort` may exist per hardware index at a time;
    ///   the lock only excludes callers that go through the same port
    ///   object.
    pub unsafe fn new(num: u8, regs: NonNull<UartRegisterBlock>) -> Self {
        Self {
            num,
            regs,
            lock: Mutex::new(()),
            queue: None,
        }
    }

    /// The hardware port index this handle is bound to.
    #[inline]
    pub fn num(&self) -> u8 {
        self.num
    }

    /// Attach the receive-event queue serviced by the outer protocol driver.
    ///
    /// The handle is opaque here: it is stored and handed back, never
    /// dereferenced.
    pub fn set_event_queue(&mut self, queue: Option<NonNull<()>>) {
        self.queue = queue;
    }

    /// The attached receive-event queue handle, if any.
    pub fn event_queue(&self) -> Option<NonNull<()>> {
        self.queue
    }

    /// Lock-free access to the register block.
    ///
    /// For read-only polling of hardware-maintained status fields. Do not
    /// write configuration fields through this reference.
    #[inline]
    pub fn regs(&self) -> &UartRegisterBlock {
        // SAFETY: the constructor contract guarantees the pointer stays
        // valid for the port's lifetime.
        unsafe { self.regs.as_ref() }
    }

    /// Run `f` on the register block while holding the port lock.
    ///
    /// Acquisition spins with no timeout; a lock that never frees is a
    /// program-fatal livelock, not a recovered condition. The operations
    /// built on this are non-reentrant: calling `with_regs` from inside `f`
    /// deadlocks.
    pub fn with_regs<R>(&self, f: impl FnOnce(&UartRegisterBlock) -> R) -> R {
        let _guard = self.lock.lock();
        f(self.regs())
    }
}
