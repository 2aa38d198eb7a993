//! Shared data types produced and consumed across the capability boundary.

use crate::error::RotError;

/// SPI chip-select line. `Cs0` carries the active firmware image, `Cs1` the
/// backup/recovery image.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ChipSelect {
    Cs0,
    Cs1,
}

/// Which side of the mux/arbiter currently drives the flash bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RotAccess {
    Granted,
    Revoked,
}

/// Current flash-mux routing: which chip select the host sees, and whether
/// the RoT or the host currently owns the bus.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FlashRouting {
    pub active_cs: ChipSelect,
    pub rot_access: RotAccess,
}

impl FlashRouting {
    pub const fn new() -> Self {
        Self {
            active_cs: ChipSelect::Cs0,
            rot_access: RotAccess::Revoked,
        }
    }
}

impl Default for FlashRouting {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash algorithms a region may be authenticated with. The engine never
/// implements these itself; it only names them when asking a `HashEngine`
/// capability to compute a digest.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum HashAlgo {
    Sha1 = 1,
    Sha256 = 2,
    Sha384 = 3,
    Sha512 = 4,
}

impl HashAlgo {
    /// Digest size in bytes for this algorithm.
    pub const fn output_len(self) -> usize {
        match self {
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha256 => 32,
            HashAlgo::Sha384 => 48,
            HashAlgo::Sha512 => 64,
        }
    }
}

/// Signature algorithms a region's signature may use.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum SigAlgorithm {
    EcdsaP256 = 1,
    EcdsaP384 = 2,
    EcdsaP521 = 3,
    Rsa2048 = 4,
    Rsa3072 = 5,
    Rsa4096 = 6,
}

/// Largest signature this engine will carry around for any supported
/// algorithm (RSA-4096 PKCS#1 signatures are 512 bytes; ECDSA signatures
/// are far smaller).
pub const MAX_SIGNATURE_LEN: usize = 512;

/// Largest public key this engine will carry around (sized for an
/// RSA-4096 modulus; ECDSA keys are far smaller).
pub const MAX_PUBLIC_KEY_LEN: usize = 512;

/// A single signed firmware region as produced by the `Manifest` capability.
///
/// Regions must be non-overlapping, sorted by offset, and together cover
/// every claimed byte of firmware exactly once; `Manifest::verify` is
/// responsible for rejecting a manifest that violates this before any
/// region is handed to the engine.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FirmwareRegion {
    pub offset: u32,
    pub length: u32,
    pub hash_type: HashAlgo,
    pub sig_algorithm: SigAlgorithm,
    pub signature: heapless::Vec<u8, MAX_SIGNATURE_LEN>,
}

impl FirmwareRegion {
    pub fn end(&self) -> u32 {
        self.offset.saturating_add(self.length)
    }

    pub fn overlaps(&self, other: &FirmwareRegion) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }
}

/// Outcome of an authentication pass (`HostProcessor::power_on`/`soft_reset`).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AuthOutcome {
    /// All regions verified. `bypass` is set only when the result was
    /// produced by the `allow_unsecure` escape hatch rather than a genuine
    /// pass, so callers can distinguish a trusted boot from a permitted one.
    Good { bypass: bool },
    BadSignature { region_index: usize },
    BadManifest,
    UnsupportedFlash,
    IoError { cause: RotError },
}

impl AuthOutcome {
    pub const fn is_good(self) -> bool {
        matches!(self, AuthOutcome::Good { .. })
    }
}

/// Result of a verification performed by `SignatureVerifier` or `Manifest`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    Good,
    Bad,
}

/// States of the BMC-driven watchdog/failover state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BmcState {
    Running,
    InReset,
    OutOfReset,
    Rollback,
    IrqFailed,
}

/// Inputs accepted by the BMC recovery state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BmcEvent {
    BmcWatchdogFired,
    BmcResetEntered,
    BmcResetExited { host_auth_good: bool },
    TimerExpired { seconds: u32 },
    IrqError,
    ForceRecovery,
}

/// Externally visible notifications published by C4/C5/C6 after each
/// transition. A single `Observer<Event>` set (C7) receives all of them, in
/// registration order, one at a time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    AuthResult(AuthOutcome),
    ExitResetEnabled,
    FlashSwapped,
    RecoveryStarted,
    RecoveryCompleted { success: bool },
    BmcTransition { from: BmcState, to: BmcState },
    DroppedEvent,
}
