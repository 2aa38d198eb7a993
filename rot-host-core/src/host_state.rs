//! C2: the persistent + volatile record of one host's authentication and
//! recovery history.

use ringbuf::{ringbuf, ringbuf_entry};
use rot_host_api::{HostStateFlags, PersistStore, PersistedHostState, Result, RotError};
use spin::RwLock;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    Mutated { authenticated: bool, attempts: u32 },
    PersistFailed,
}

ringbuf!(C2TRACE, Trace, 16, Trace::PersistFailed);

/// In-memory view of `HostState`'s flags. Mirrors the persisted record but
/// is not itself `Copy`-safe across a lock boundary: callers always go
/// through `HostState`'s accessor methods, which take the lock for exactly
/// the duration of one read or mutation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Fields {
    authenticated: bool,
    pfm_dirty: bool,
    unsupported_flash: bool,
    bypass: bool,
    recovery_attempts: u32,
}

impl Fields {
    const fn fresh() -> Self {
        Self {
            authenticated: false,
            pfm_dirty: false,
            unsupported_flash: false,
            bypass: false,
            recovery_attempts: 0,
        }
    }

    fn to_record(self, prior: PersistedHostState) -> PersistedHostState {
        let mut record = prior;
        let mut flags = HostStateFlags::empty();
        flags.set(HostStateFlags::AUTH_GOOD, self.authenticated);
        flags.set(HostStateFlags::AUTH_BYPASSED, self.bypass);
        record.set_flags(flags);
        record.set_attempts(self.recovery_attempts.min(u16::MAX as u32) as u16);
        record
    }
}

/// One host's authentication/recovery state. Reads take a shared lock
/// acquisition; every mutation takes the exclusive acquisition and, while
/// held, durably journals the change through the supplied `PersistStore`
/// before returning success. A journal write failure rolls the in-memory
/// value back and reports `PersistFailed`, per the module contract: a
/// reader must never observe a value that was not actually committed.
pub struct HostState<P> {
    fields: RwLock<Fields>,
    store: RwLock<P>,
}

impl<P: PersistStore> HostState<P> {
    /// Build a fresh `HostState`, seeding in-memory fields from whatever the
    /// store already has committed (or `Fields::fresh()` if the store has
    /// never been written, i.e. `read_committed` reports an uninitialized
    /// record).
    pub fn new(store: P) -> Self {
        let fields = match store.read_committed() {
            Ok(record) => {
                let flags = record.flags();
                Fields {
                    authenticated: flags.contains(HostStateFlags::AUTH_GOOD),
                    pfm_dirty: false,
                    unsupported_flash: false,
                    bypass: flags.contains(HostStateFlags::AUTH_BYPASSED),
                    recovery_attempts: record.attempts() as u32,
                }
            }
            Err(_) => Fields::fresh(),
        };
        Self {
            fields: RwLock::new(fields),
            store: RwLock::new(store),
        }
    }

    pub fn authenticated(&self) -> bool {
        self.fields.read().authenticated
    }

    pub fn pfm_dirty(&self) -> bool {
        self.fields.read().pfm_dirty
    }

    pub fn unsupported_flash(&self) -> bool {
        self.fields.read().unsupported_flash
    }

    pub fn bypass(&self) -> bool {
        self.fields.read().bypass
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.fields.read().recovery_attempts
    }

    /// The PIT-gating hook: host boot is trusted if the last authentication
    /// genuinely passed, or if it was let through under the bypass escape
    /// hatch.
    pub fn boot_trusted(&self) -> bool {
        let f = self.fields.read();
        f.authenticated || f.bypass
    }

    pub fn set_bypass(&self, bypass: bool) -> Result<()> {
        self.mutate(|f| f.bypass = bypass)
    }

    pub fn set_unsupported_flash(&self, unsupported: bool) -> Result<()> {
        self.mutate(|f| f.unsupported_flash = unsupported)
    }

    pub fn set_pfm_dirty(&self, dirty: bool) -> Result<()> {
        self.mutate(|f| f.pfm_dirty = dirty)
    }

    /// Record a successful authentication: clears `recovery_attempts` and
    /// sets `authenticated`.
    pub fn record_auth_good(&self) -> Result<()> {
        self.mutate(|f| {
            f.authenticated = true;
            f.recovery_attempts = 0;
        })
    }

    /// Record a failed authentication: clears `authenticated` and
    /// increments `recovery_attempts`, saturating rather than wrapping.
    pub fn record_auth_failed(&self) -> Result<()> {
        self.mutate(|f| {
            f.authenticated = false;
            f.recovery_attempts = f.recovery_attempts.saturating_add(1);
        })
    }

    fn mutate(&self, f: impl FnOnce(&mut Fields)) -> Result<()> {
        let mut fields = self.fields.write();
        let prior = *fields;
        let mut next = prior;
        f(&mut next);

        let mut store = self.store.write();
        let prior_record = store
            .read_committed()
            .unwrap_or_else(|_| PersistedHostState::fresh());
        let record = next.to_record(prior_record);

        match store.write_journal(&record) {
            Ok(()) => {
                *fields = next;
                ringbuf_entry!(
                    C2TRACE,
                    Trace::Mutated {
                        authenticated: next.authenticated,
                        attempts: next.recovery_attempts,
                    }
                );
                Ok(())
            }
            Err(_) => {
                ringbuf_entry!(C2TRACE, Trace::PersistFailed);
                Err(RotError::PersistFailed)
            }
        }
    }
}
