//! Small shared-state wrappers used by more than one component.

use rot_host_api::{ChipSelect, HostIrqControl};
use spin::Mutex;

/// A `HostIrqControl` implementation shared (by reference) between
/// `HostFlashMgr`, which toggles chip selects around a RoT access window,
/// and `HostProcessor`, which toggles exit-from-reset on a successful
/// authentication. Both see the same underlying hardware lines; this type
/// is what lets them share one without either owning it outright.
pub struct SharedIrq<I>(Mutex<I>);

impl<I: HostIrqControl> SharedIrq<I> {
    pub fn new(irq: I) -> Self {
        Self(Mutex::new(irq))
    }

    pub fn enable_exit_reset(&self, on: bool) {
        self.0.lock().enable_exit_reset(on);
    }

    pub fn enable_chip_select(&self, cs: ChipSelect, on: bool) {
        self.0.lock().enable_chip_select(cs, on);
    }

    pub fn force_irq(&self, cs: ChipSelect) {
        self.0.lock().force_irq(cs);
    }
}
