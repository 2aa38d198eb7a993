//! Fixed-layout record persisted across resets: mux/recovery state lives in
//! a battery-backed byte range rather than relying on RAM surviving a
//! host-driven reset.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

const MAGIC: u32 = 0x484F_5354; // "HOST"
const VERSION: u8 = 1;

bitflags::bitflags! {
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    pub struct HostStateFlags: u8 {
        /// Last authentication pass succeeded.
        const AUTH_GOOD = 1 << 0;
        /// Last authentication pass was let through by `allow_unsecure`.
        const AUTH_BYPASSED = 1 << 1;
    }
}

/// The 16-byte record `HostState` persists across resets: a four-byte magic
/// so a blank/foreign flash range is never mistaken for valid state, a
/// version byte for forward compatibility, a flags byte, a 16-bit recovery
/// attempt counter, and reserved padding that must round-trip unchanged.
#[derive(Copy, Clone, Debug, Eq, PartialEq, IntoBytes, FromBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct PersistedHostState {
    magic: u32,
    version: u8,
    flags: u8,
    attempts: u16,
    reserved: [u8; 8],
}

impl PersistedHostState {
    /// A freshly initialized record: no auth result yet, zero recovery
    /// attempts, `Cs0` active.
    pub const fn fresh() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            attempts: 0,
            reserved: [0; 8],
        }
    }

    /// Returns `None` if `magic`/`version` don't match, signaling that the
    /// backing range should be treated as uninitialized rather than
    /// corrupt-but-valid.
    pub fn validate(self) -> Option<Self> {
        if self.magic == MAGIC && self.version == VERSION {
            Some(self)
        } else {
            None
        }
    }

    pub fn flags(self) -> HostStateFlags {
        HostStateFlags::from_bits_truncate(self.flags)
    }

    pub fn set_flags(&mut self, flags: HostStateFlags) {
        self.flags = flags.bits();
    }

    pub fn attempts(self) -> u16 {
        self.attempts
    }

    pub fn set_attempts(&mut self, attempts: u16) {
        self.attempts = attempts;
    }
}

impl Default for PersistedHostState {
    fn default() -> Self {
        Self::fresh()
    }
}

static_assertions::const_assert_eq!(core::mem::size_of::<PersistedHostState>(), 16);
