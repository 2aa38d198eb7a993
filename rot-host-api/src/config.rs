//! Tunables the engine is built with. Production callers source these from
//! board-specific configuration; tests build one by hand.

/// Runtime configuration for the host boot-gate and recovery engine.
///
/// Defaults favor a secure-by-default posture: unsecure bypass is off, and
/// recovery gets a bounded number of attempts before the engine gives up
/// and reports `RecoveryExhausted` rather than retrying forever.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Minimum seconds the BMC watchdog must be armed for before a fired
    /// watchdog is treated as a real failure rather than noise from a
    /// window that hasn't elapsed yet.
    pub min_wdt_seconds: u32,
    /// Seconds to hold `InReset` waiting for the BMC to drive the host back
    /// out of reset before declaring the wait itself a failure.
    pub rec_wait_seconds: u32,
    /// Maximum recovery attempts before `RecoveryExhausted`.
    pub recovery_attempts_cap: u16,
    /// If true, a failed authentication still enables exit-from-reset
    /// (`AuthOutcome::Good { bypass: true }`) instead of holding the host in
    /// reset. Exists for bring-up and lab use; never the default.
    pub allow_unsecure_default: bool,
    /// If true, `HostIrqHandler::exit_reset` schedules `HostProcessor::soft_reset`
    /// when `HOST_RST` deasserts; if false, reset-deassertion is ignored.
    /// Sampled once at handler entry; flipping it mid-operation never
    /// changes the outcome of a call already past that point.
    pub notify_exit_reset: bool,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            min_wdt_seconds: 3,
            rec_wait_seconds: 10,
            recovery_attempts_cap: 3,
            allow_unsecure_default: false,
            notify_exit_reset: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
