//! C3: flash mux/arbiter ownership. Moves the bus to the RoT for a scoped
//! read/write window and guarantees host access is restored afterward,
//! including on an error or unwinding panic.

use core::sync::atomic::{AtomicBool, Ordering};

use ringbuf::{ringbuf, ringbuf_entry};
use rot_host_api::{
    ChipSelect, Clock, Event, Flash, FlashRouting, HostIrqControl, RotAccess, RotError,
};
use spin::{Mutex, MutexGuard, RwLock};

use crate::observer::ObserverRegistry;
use crate::shared::SharedIrq;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    Granted,
    Revoked,
    BusBusy,
    Swapped { new_cs: ChipSelect },
}

ringbuf!(C3TRACE, Trace, 16, Trace::Revoked);

/// Owns the two flash devices' mux state: which chip select the host sees,
/// and who currently drives the bus. Only one `with_rot_access` scope may
/// be open at a time; a second attempt while one is in flight fails with
/// `BusBusy` rather than blocking or racing.
pub struct HostFlashMgr<'o, F, I, C> {
    flash: Mutex<F>,
    irq: &'o SharedIrq<I>,
    clock: C,
    routing: RwLock<FlashRouting>,
    busy: AtomicBool,
    observers: &'o ObserverRegistry<'o, Event>,
}

impl<'o, F, I, C> HostFlashMgr<'o, F, I, C>
where
    F: Flash,
    I: HostIrqControl,
    C: Clock,
{
    pub fn new(
        flash: F,
        irq: &'o SharedIrq<I>,
        clock: C,
        observers: &'o ObserverRegistry<'o, Event>,
    ) -> Self {
        Self {
            flash: Mutex::new(flash),
            irq,
            clock,
            routing: RwLock::new(FlashRouting::new()),
            busy: AtomicBool::new(false),
            observers,
        }
    }

    pub fn routing(&self) -> FlashRouting {
        *self.routing.read()
    }

    /// Acquire the bus for the RoT. `deadline_ms` bounds the whole
    /// acquisition, including the arbiter settle wait; past the deadline
    /// this returns `Timeout` without granting access.
    pub fn with_rot_access(&self, deadline_ms: u64) -> Result<RotAccessGuard<'_, F>, RotError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            ringbuf_entry!(C3TRACE, Trace::BusBusy);
            return Err(RotError::BusBusy);
        }

        if self.clock.now_ms() > deadline_ms {
            self.busy.store(false, Ordering::Release);
            return Err(RotError::Timeout);
        }

        let cs = self.routing.read().active_cs;
        self.irq.enable_chip_select(cs, false);
        self.routing.write().rot_access = RotAccess::Granted;
        ringbuf_entry!(C3TRACE, Trace::Granted);

        let flash = self.flash.lock();
        Ok(RotAccessGuard { mgr: self, flash })
    }

    fn finish_rot_access(&self) {
        self.routing.write().rot_access = RotAccess::Revoked;
        let cs = self.routing.read().active_cs;
        self.irq.enable_chip_select(cs, true);
        ringbuf_entry!(C3TRACE, Trace::Revoked);
        self.busy.store(false, Ordering::Release);
    }

    /// Atomically swap which chip select (`Cs0`/`Cs1`) is mapped to the
    /// host, and publish `FlashSwapped`. Must not be called while a
    /// `RotAccessGuard` is outstanding on this manager.
    pub fn swap_active_flash(&self) -> Result<(), RotError> {
        if self.busy.load(Ordering::Acquire) {
            return Err(RotError::BusBusy);
        }
        let new_cs = {
            let mut routing = self.routing.write();
            routing.active_cs = match routing.active_cs {
                ChipSelect::Cs0 => ChipSelect::Cs1,
                ChipSelect::Cs1 => ChipSelect::Cs0,
            };
            routing.active_cs
        };
        ringbuf_entry!(C3TRACE, Trace::Swapped { new_cs });
        self.observers.publish(Event::FlashSwapped);
        Ok(())
    }
}

/// A scoped grant of RoT flash access. Dropping the guard — on any path,
/// including an early return or an unwinding panic — revokes RoT access
/// and restores the host's, satisfying the "restore on every path"
/// requirement without a manual cleanup call at each return site.
pub struct RotAccessGuard<'a, F: 'a> {
    mgr: &'a dyn FinishAccess,
    flash: MutexGuard<'a, F>,
}

/// Object-safe finalizer hook so `RotAccessGuard` doesn't need to carry
/// `HostFlashMgr`'s `I`/`C` type parameters.
trait FinishAccess {
    fn finish(&self);
}

impl<'o, F, I, C> FinishAccess for HostFlashMgr<'o, F, I, C>
where
    F: Flash,
    I: HostIrqControl,
    C: Clock,
{
    fn finish(&self) {
        self.finish_rot_access();
    }
}

impl<'a, F: Flash> RotAccessGuard<'a, F> {
    /// Read one firmware region's bytes. Only reachable through a held
    /// guard, which is how the "must only be called inside
    /// `with_rot_access`" contract is enforced by the type system rather
    /// than a runtime check. A failed read is idempotent, so it is retried
    /// once in place before the fault is surfaced to the caller as
    /// `IoError`.
    pub fn read_region(&mut self, offset: u32, buf: &mut [u8]) -> Result<(), RotError> {
        match self.flash.read(offset, buf) {
            Ok(()) => Ok(()),
            Err(_) => self.flash.read(offset, buf),
        }
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }
}

impl<'a, F> Drop for RotAccessGuard<'a, F> {
    fn drop(&mut self) {
        self.mgr.finish();
    }
}
