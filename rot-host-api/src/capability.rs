//! Capability traits: the seams `rot-host-core` is built against instead of
//! a fixed hardware/crypto stack. Production code wires concrete
//! implementations in; tests wire in fakes. None of these traits require
//! `alloc`.

use crate::error::Result;
use crate::persist::PersistedHostState;
use crate::types::{ChipSelect, HashAlgo, SigAlgorithm, Verdict};

/// A streaming digest engine. Implementations may back one or many
/// algorithms; `supports` lets a caller probe before committing to a
/// `start`, which is how conditional algorithm availability is expressed at
/// runtime rather than with `cfg` gates on the call site.
pub trait HashEngine {
    /// True if this engine can compute `algo`.
    fn supports(&self, algo: HashAlgo) -> bool;

    /// Begin a new digest, replacing (and discarding) any digest in
    /// progress. Fails if `algo` is unsupported or the underlying hardware
    /// block is unavailable.
    fn start(&mut self, algo: HashAlgo) -> Result<()>;

    /// Feed more bytes into the digest started by the last `start`. Fails
    /// with `NoActiveHash` if no digest is in progress.
    fn update(&mut self, data: &[u8]) -> Result<()>;

    /// Finish the digest in progress and write it to `out`, returning the
    /// number of bytes written. `out` must be at least
    /// `HashAlgo::output_len()` bytes; a caller violating this gets
    /// `BufferTooSmall`. Always clears the in-progress digest, including on
    /// error.
    fn finish(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Abandon the digest in progress, if any. Never fails.
    fn cancel(&mut self);

    /// Convenience one-shot: start, update once, finish.
    fn calculate(&mut self, algo: HashAlgo, data: &[u8], out: &mut [u8]) -> Result<usize> {
        self.start(algo)?;
        if let Err(e) = self.update(data) {
            self.cancel();
            return Err(e);
        }
        self.finish(out)
    }
}

/// Verifies a signature over a digest. Implementations never see the
/// signed payload directly, only its digest, so the constant-time
/// obligation is limited to comparing/validating the signature itself.
pub trait SignatureVerifier {
    fn supports(&self, algo: SigAlgorithm) -> bool;

    /// Verify `signature` over `digest` under `public_key`, both already
    /// sized for `algo`. Returns `Verdict::Bad` for a well-formed-but-wrong
    /// signature and `Err` only for misuse (unsupported algorithm,
    /// malformed key) or a hard crypto-engine fault.
    fn verify(
        &self,
        algo: SigAlgorithm,
        public_key: &[u8],
        digest: &[u8],
        signature: &[u8],
    ) -> Result<Verdict>;
}

/// Raw access to one flash device, addressed by absolute byte offset.
/// Implementations are not expected to cache; callers that need atomicity
/// across multiple calls arrange their own locking (see
/// `HostFlashMgr::with_rot_access`).
pub trait Flash {
    /// Size of one erase sector in bytes.
    fn sector_size(&self) -> u32;

    /// Total addressable size in bytes.
    fn capacity(&self) -> u32;

    fn read(&mut self, offset: u32, out: &mut [u8]) -> Result<()>;

    /// Erase the sector(s) covering `[offset, offset + len)`. `offset` and
    /// `len` must be sector-aligned.
    fn erase(&mut self, offset: u32, len: u32) -> Result<()>;

    /// Program `data` at `offset`. The target range must already be erased.
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<()>;
}

/// A parsed firmware manifest: the list of signed regions and the means to
/// check the manifest's own authenticity before any region is trusted.
pub trait Manifest {
    /// Verify the manifest's own signature, authenticating the region table
    /// itself (not the regions it describes).
    fn verify(
        &self,
        hash: &mut dyn HashEngine,
        verifier: &dyn SignatureVerifier,
        public_key: &[u8],
    ) -> Result<Verdict>;

    /// Number of regions this manifest describes.
    fn region_count(&self) -> usize;

    /// Fetch region `index`, or `None` if out of range. Deliberately
    /// indexed rather than an iterator: the sequence must be restartable
    /// and callers are expected to revisit an index (e.g. to re-derive a
    /// region after a transient flash fault) without re-walking from the
    /// start.
    fn region(&self, index: usize) -> Option<crate::types::FirmwareRegion>;
}

/// Control of the signals that gate whether the host CPU can see the flash
/// bus at all and which chip select it lands on.
pub trait HostIrqControl {
    /// Assert or release the host's exit-from-reset signal.
    fn enable_exit_reset(&mut self, on: bool);

    /// Enable or disable the given chip select being routed to the host.
    fn enable_chip_select(&mut self, cs: ChipSelect, on: bool);

    /// Force an interrupt/fault condition on `cs`, used to drive the host
    /// into recovery independent of its own firmware.
    fn force_irq(&mut self, cs: ChipSelect);
}

/// A source of monotonic wall-clock milliseconds, used for deadline and
/// timeout bookkeeping (watchdog wait windows, recovery backoff). Kept as
/// its own capability, rather than baked into the timer subsystem, so the
/// engine's deadline math can be exercised without a real clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// A sink for one externally visible event at a time. Registered
/// observers are notified in registration order; a full registry drops
/// the event rather than blocking (see `Event::DroppedEvent`).
pub trait Observer<E> {
    fn on_event(&self, event: E);
}

/// Non-volatile backing for `HostState`'s persisted flags. `write_journal`
/// must not return `Ok` until the record is durable; `HostState` relies on
/// this to decide whether to roll an in-memory mutation back.
pub trait PersistStore {
    fn write_journal(&mut self, record: &PersistedHostState) -> Result<()>;
    fn read_committed(&self) -> Result<PersistedHostState>;
}
