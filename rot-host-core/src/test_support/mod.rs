//! In-crate test doubles for the capability traits. `std`-only; never
//! compiled into the `no_std` production build.

extern crate std;

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use rot_host_api::{
    ChipSelect, Clock, Flash, HashAlgo, HashEngine, HostIrqControl, Manifest, Observer,
    PersistStore, PersistedHostState, Result, RotError, SigAlgorithm, SignatureVerifier, Verdict,
};

/// Fake `PersistStore` backed by an in-memory `PersistedHostState`. Set
/// `fail_next_write` to exercise the `PersistFailed` rollback path.
pub struct FakeStore {
    record: PersistedHostState,
    initialized: bool,
    pub fail_next_write: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            record: PersistedHostState::fresh(),
            initialized: false,
            fail_next_write: false,
        }
    }
}

impl PersistStore for FakeStore {
    fn write_journal(&mut self, record: &PersistedHostState) -> Result<()> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(RotError::PersistFailed);
        }
        self.record = *record;
        self.initialized = true;
        Ok(())
    }

    fn read_committed(&self) -> Result<PersistedHostState> {
        if self.initialized {
            Ok(self.record)
        } else {
            Err(RotError::PersistFailed)
        }
    }
}

/// A trivial, non-cryptographic "digest": the byte-wise sum of the input,
/// spread across the algorithm's declared output length. Deterministic and
/// sensitive to any single-byte change, which is all the region-walk tests
/// need from it.
fn fake_digest(algo: HashAlgo, data: &[u8], out: &mut [u8]) -> usize {
    let len = algo.output_len();
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    for (i, slot) in out.iter_mut().take(len).enumerate() {
        *slot = sum.wrapping_add(i as u8);
    }
    len
}

#[derive(Default)]
pub struct FakeHash {
    active: Option<(HashAlgo, Vec<u8>)>,
    pub unsupported: Vec<HashAlgo>,
}

impl FakeHash {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashEngine for FakeHash {
    fn supports(&self, algo: HashAlgo) -> bool {
        !self.unsupported.contains(&algo)
    }

    fn start(&mut self, algo: HashAlgo) -> Result<()> {
        if !self.supports(algo) {
            return Err(RotError::CryptoUnsupported);
        }
        self.active = Some((algo, Vec::new()));
        Ok(())
    }

    fn update(&mut self, data: &[u8]) -> Result<()> {
        match &mut self.active {
            Some((_, buf)) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            None => Err(RotError::NoActiveHash),
        }
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<usize> {
        let (algo, buf) = self.active.take().ok_or(RotError::NoActiveHash)?;
        if out.len() < algo.output_len() {
            return Err(RotError::BufferTooSmall {
                needed: algo.output_len(),
            });
        }
        Ok(fake_digest(algo, &buf, out))
    }

    fn cancel(&mut self) {
        self.active = None;
    }
}

/// Verifies against a table of `(algo, public_key, digest) -> Verdict`
/// entries installed by the test; anything not in the table is `Bad`.
#[derive(Default)]
pub struct FakeSignatureVerifier {
    good: Vec<(SigAlgorithm, Vec<u8>, Vec<u8>)>,
    pub unsupported: Vec<SigAlgorithm>,
}

impl FakeSignatureVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a digest that verifies as `Good` under `algo`/`public_key`
    /// with any signature bytes (the fake doesn't model signature bytes
    /// themselves, only which digests are "the right one").
    pub fn accept(&mut self, algo: SigAlgorithm, public_key: &[u8], digest: &[u8]) {
        self.good
            .push((algo, public_key.to_vec(), digest.to_vec()));
    }
}

impl SignatureVerifier for FakeSignatureVerifier {
    fn supports(&self, algo: SigAlgorithm) -> bool {
        !self.unsupported.contains(&algo)
    }

    fn verify(
        &self,
        algo: SigAlgorithm,
        public_key: &[u8],
        digest: &[u8],
        _signature: &[u8],
    ) -> Result<Verdict> {
        if !self.supports(algo) {
            return Err(RotError::CryptoUnsupported);
        }
        let matched = self
            .good
            .iter()
            .any(|(a, pk, d)| *a == algo && pk == public_key && d == digest);
        Ok(if matched { Verdict::Good } else { Verdict::Bad })
    }
}

/// Backing store for `FakeFlash`: a flat byte array plus an erase-tracking
/// bitmap at sector granularity.
pub struct FakeFlash {
    data: Vec<u8>,
    sector_size: u32,
    erased: Vec<bool>,
    pub fail_next_read: bool,
}

impl FakeFlash {
    pub fn new(capacity: u32, sector_size: u32) -> Self {
        let sectors = (capacity / sector_size) as usize;
        Self {
            data: std::vec![0xFFu8; capacity as usize],
            sector_size,
            erased: std::vec![true; sectors],
            fail_next_read: false,
        }
    }

    pub fn seed(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn flip_byte(&mut self, offset: u32) {
        let i = offset as usize;
        self.data[i] ^= 0xFF;
    }
}

impl Flash for FakeFlash {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn capacity(&self) -> u32 {
        self.data.len() as u32
    }

    fn read(&mut self, offset: u32, out: &mut [u8]) -> Result<()> {
        if self.fail_next_read {
            self.fail_next_read = false;
            return Err(RotError::IoError);
        }
        let start = offset as usize;
        let end = start + out.len();
        if end > self.data.len() {
            return Err(RotError::InvalidArgument);
        }
        out.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn erase(&mut self, offset: u32, len: u32) -> Result<()> {
        if offset % self.sector_size != 0 || len % self.sector_size != 0 {
            return Err(RotError::InvalidArgument);
        }
        let first = (offset / self.sector_size) as usize;
        let count = (len / self.sector_size) as usize;
        for s in first..first + count {
            self.erased[s] = true;
        }
        let start = offset as usize;
        let end = start + len as usize;
        self.data[start..end].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.data.len() {
            return Err(RotError::InvalidArgument);
        }
        self.data[start..end].copy_from_slice(data);
        Ok(())
    }
}

/// A manifest whose own-signature verdict and region list are set directly
/// by the test, rather than derived from a parsed byte format (PFM parsing
/// is out of scope).
pub struct FakeManifest {
    pub own_verdict: Verdict,
    pub regions: Vec<rot_host_api::FirmwareRegion>,
}

impl FakeManifest {
    pub fn new(own_verdict: Verdict) -> Self {
        Self {
            own_verdict,
            regions: Vec::new(),
        }
    }
}

impl Manifest for FakeManifest {
    fn verify(
        &self,
        _hash: &mut dyn HashEngine,
        _verifier: &dyn SignatureVerifier,
        _public_key: &[u8],
    ) -> Result<Verdict> {
        Ok(self.own_verdict)
    }

    fn region_count(&self) -> usize {
        self.regions.len()
    }

    fn region(&self, index: usize) -> Option<rot_host_api::FirmwareRegion> {
        self.regions.get(index).cloned()
    }
}

#[derive(Default)]
pub struct FakeIrqControl {
    pub exit_reset_calls: Vec<bool>,
    pub chip_select_calls: Vec<(ChipSelect, bool)>,
    pub force_irq_calls: Vec<ChipSelect>,
}

impl FakeIrqControl {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostIrqControl for FakeIrqControl {
    fn enable_exit_reset(&mut self, on: bool) {
        self.exit_reset_calls.push(on);
    }

    fn enable_chip_select(&mut self, cs: ChipSelect, on: bool) {
        self.chip_select_calls.push((cs, on));
    }

    fn force_irq(&mut self, cs: ChipSelect) {
        self.force_irq_calls.push(cs);
    }
}

/// A clock the test advances explicitly; never reads the real wall clock.
/// The counter lives behind an `Rc` so every clone shares the same ticking
/// clock rather than forking off its own independent one — tests that hand
/// a clone to one collaborator and keep the original to call `advance` on
/// (as `BmcRecovery`'s timer tests do) need both to see the same time.
#[derive(Clone)]
pub struct FakeClock {
    now: Rc<RefCell<u64>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(RefCell::new(0)),
        }
    }

    pub fn advance(&self, ms: u64) {
        *self.now.borrow_mut() += ms;
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        *self.now.borrow()
    }
}

/// Records every event published to it, in order.
pub struct RecordingObserver<E> {
    events: RefCell<Vec<E>>,
}

impl<E: Copy> RecordingObserver<E> {
    pub fn new() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<E> {
        self.events.borrow().clone()
    }
}

impl<E: Copy> Observer<E> for RecordingObserver<E> {
    fn on_event(&self, event: E) {
        self.events.borrow_mut().push(event);
    }
}
