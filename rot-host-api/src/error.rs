// Error kinds for the host boot-gate and recovery engine.
//
// `RotError::packed` reduces an error to a module tag plus per-module code,
// packed into one u32, for logging and wire transport. Internally every
// fallible path returns this tagged sum type instead of a raw integer.

/// Which component produced an error, used as the high byte of the packed
/// wire code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Module {
    Common = 0,
    Hash = 1,
    Signature = 2,
    Flash = 3,
    Manifest = 4,
    HostState = 5,
    HostFlashMgr = 6,
    HostProcessor = 7,
    BmcRecovery = 8,
    HostIrqHandler = 9,
    Observer = 10,
}

/// Errors produced anywhere in the engine.
///
/// Variants map directly onto the error kinds enumerated in the design:
/// `InvalidArgument`/`BufferTooSmall` are caller-misuse and never retried;
/// `BadSignature`/`BadManifest` are expected adversarial outcomes routed into
/// recovery decisions rather than surfaced as internal faults;
/// `Cancelled`/`Timeout` share the same cleanup path.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RotError {
    InvalidArgument,
    BufferTooSmall { needed: usize },
    NoActiveHash,
    BusBusy,
    CryptoStartFailed,
    CryptoUpdateFailed,
    CryptoFinishFailed,
    CryptoUnsupported,
    CryptoSelfTestFailed,
    BadSignature { region_index: usize },
    BadManifest,
    UnsupportedFlash,
    IoError,
    RecoveryExhausted,
    Cancelled,
    Timeout,
    PersistFailed,
}

impl RotError {
    /// The component that raises this error, used to build the packed wire
    /// code. Errors that are not module-specific (misuse detectable at any
    /// boundary) report `Module::Common`.
    pub const fn module(self) -> Module {
        match self {
            RotError::InvalidArgument | RotError::BufferTooSmall { .. } => {
                Module::Common
            }
            RotError::NoActiveHash
            | RotError::CryptoStartFailed
            | RotError::CryptoUpdateFailed
            | RotError::CryptoFinishFailed
            | RotError::CryptoUnsupported
            | RotError::CryptoSelfTestFailed => Module::Hash,
            RotError::BadSignature { .. } => Module::Signature,
            RotError::IoError => Module::Flash,
            RotError::BadManifest => Module::Manifest,
            RotError::UnsupportedFlash => Module::HostProcessor,
            RotError::PersistFailed => Module::HostState,
            RotError::BusBusy => Module::HostFlashMgr,
            RotError::RecoveryExhausted => Module::HostProcessor,
            RotError::Cancelled | RotError::Timeout => Module::HostProcessor,
        }
    }

    /// The low-byte code within this error's module sub-range.
    pub const fn code(self) -> u8 {
        match self {
            RotError::InvalidArgument => 0x00,
            RotError::BufferTooSmall { .. } => 0x01,
            RotError::NoActiveHash => 0x00,
            RotError::CryptoStartFailed => 0x01,
            RotError::CryptoUpdateFailed => 0x02,
            RotError::CryptoFinishFailed => 0x03,
            RotError::CryptoUnsupported => 0x04,
            RotError::CryptoSelfTestFailed => 0x05,
            RotError::BadSignature { .. } => 0x00,
            RotError::IoError => 0x00,
            RotError::BadManifest => 0x00,
            RotError::UnsupportedFlash => 0x00,
            RotError::PersistFailed => 0x00,
            RotError::BusBusy => 0x00,
            RotError::RecoveryExhausted => 0x01,
            RotError::Cancelled => 0x02,
            RotError::Timeout => 0x03,
        }
    }

    /// Packs `(module, code)` into a stable 32-bit wire/log code: the module
    /// tag occupies the upper bits, the specific error the low 8 bits, per
    /// the persisted error-code-space layout.
    pub const fn packed(self) -> u32 {
        ((self.module() as u32) << 8) | self.code() as u32
    }
}

impl From<RotError> for u32 {
    fn from(e: RotError) -> Self {
        e.packed()
    }
}

pub type Result<T> = core::result::Result<T, RotError>;
