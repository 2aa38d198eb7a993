//! C6: the event dispatcher. Translates raw hardware signals (the
//! `HOST_PWR_GOOD`/`HOST_RST`/`HOST_CS0`/`HOST_CS1` lines) into calls on C4
//! (`HostProcessor`) and C5 (`BmcRecovery`). Every entry point serializes
//! through one coarse lock per `HostIrqHandler`; a call arriving while
//! another is already in flight — on this core or another — never blocks or
//! races the first, it records `DroppedEvent` and returns `Busy`.

use core::sync::atomic::{AtomicBool, Ordering};

use ringbuf::{ringbuf, ringbuf_entry};
use rot_host_api::{
    AuthOutcome, BmcEvent, Clock, Config, Event, Flash, HashEngine, HostIrqControl, Manifest,
    Result, RotError, SignatureVerifier,
};
use spin::Mutex;

use crate::bmc_recovery::{BmcAction, BmcRecovery};
use crate::host_processor::HostProcessor;
use crate::observer::ObserverRegistry;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    PowerOn,
    EnterReset,
    ExitResetDeferred,
    ExitResetSkipped { notify_disabled: bool },
    AssertCs0,
    AssertCs1,
    ForceRecovery,
    DeferredSoftReset,
    Busy,
}

ringbuf!(C6TRACE, Trace, 32, Trace::Busy);

/// One host's IRQ dispatcher. `F`/`I`/`C`/`P`/`H`/`V`/`M` mirror
/// `HostProcessor`'s type parameters — this type owns one and forwards to
/// it under its own coarse lock, rather than `HostProcessor` doing its own
/// internal locking.
pub struct HostIrqHandler<'o, F, I, C, P, H, V, M> {
    processor: Mutex<HostProcessor<'o, F, I, C, P, H, V, M>>,
    bmc: &'o BmcRecovery<'o, C>,
    clock: C,
    config: Config,
    observers: &'o ObserverRegistry<'o, Event>,
    /// Budget added to `clock.now_ms()` to form the deadline passed into
    /// every `HostProcessor` call this handler makes.
    timeout_ms: u64,
    /// Set by `exit_reset` when `notify_exit_reset` is on; drained by
    /// `run_deferred`, the "worker" the design calls for rather than running
    /// `soft_reset` inline from the ISR caller.
    pending_soft_reset: AtomicBool,
}

impl<'o, F, I, C, P, H, V, M> HostIrqHandler<'o, F, I, C, P, H, V, M>
where
    F: Flash,
    I: HostIrqControl,
    C: Clock + Clone,
    H: HashEngine,
    V: SignatureVerifier,
    M: Manifest,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        processor: HostProcessor<'o, F, I, C, P, H, V, M>,
        bmc: &'o BmcRecovery<'o, C>,
        clock: C,
        config: Config,
        observers: &'o ObserverRegistry<'o, Event>,
        timeout_ms: u64,
    ) -> Self {
        Self {
            processor: Mutex::new(processor),
            bmc,
            clock,
            config,
            observers,
            timeout_ms,
            pending_soft_reset: AtomicBool::new(false),
        }
    }

    fn deadline(&self) -> u64 {
        self.clock.now_ms().saturating_add(self.timeout_ms)
    }

    fn busy(&self) -> RotError {
        ringbuf_entry!(C6TRACE, Trace::Busy);
        self.observers.publish(Event::DroppedEvent);
        RotError::BusBusy
    }

    /// `HOST_PWR_GOOD` rising. A second call while the first is in-flight
    /// (double-fire of the power-good line) returns `Busy` instead of
    /// racing the first.
    pub fn power_on(
        &self,
        allow_unsecure: bool,
        override_hash: Option<&mut dyn HashEngine>,
    ) -> Result<AuthOutcome> {
        match self.processor.try_lock() {
            Some(mut p) => {
                ringbuf_entry!(C6TRACE, Trace::PowerOn);
                p.power_on(allow_unsecure, override_hash, self.deadline())
            }
            None => Err(self.busy()),
        }
    }

    /// `HOST_RST` asserted. Only notifies C5; never touches flash, so this
    /// never blocks even when it does acquire the coarse lock.
    pub fn enter_reset(&self) -> Result<()> {
        match self.processor.try_lock() {
            Some(_guard) => {
                ringbuf_entry!(C6TRACE, Trace::EnterReset);
                self.bmc.handle(BmcEvent::BmcResetEntered);
                Ok(())
            }
            None => Err(self.busy()),
        }
    }

    /// `HOST_RST` deasserted, observed only when `notify_exit_reset` is
    /// true. The flag is sampled once here, at handler entry: a config flip
    /// mid-flight never changes the outcome of a call already past this
    /// point. When sampled true, defers `HostProcessor::soft_reset` to
    /// `run_deferred` instead of running the full region walk inline, so the
    /// ISR caller returns promptly.
    pub fn exit_reset(&self, host_auth_good: bool) -> Result<()> {
        let notify = self.config.notify_exit_reset;
        match self.processor.try_lock() {
            Some(_guard) => {
                self.bmc.handle(BmcEvent::BmcResetExited { host_auth_good });
                if notify {
                    ringbuf_entry!(C6TRACE, Trace::ExitResetDeferred);
                    self.pending_soft_reset.store(true, Ordering::Release);
                } else {
                    ringbuf_entry!(
                        C6TRACE,
                        Trace::ExitResetSkipped {
                            notify_disabled: true
                        }
                    );
                }
                Ok(())
            }
            None => Err(self.busy()),
        }
    }

    /// `HOST_CS0` asserted: informational only, no recovery action.
    pub fn assert_cs0(&self) -> Result<()> {
        match self.processor.try_lock() {
            Some(_guard) => {
                ringbuf_entry!(C6TRACE, Trace::AssertCs0);
                Ok(())
            }
            None => Err(self.busy()),
        }
    }

    /// `HOST_CS1` asserted: the recovery trigger. A second `assert_cs1`
    /// while recovery is already running observes the held lock and returns
    /// `Busy` rather than starting a second recovery.
    pub fn assert_cs1(&self) -> Result<()> {
        match self.processor.try_lock() {
            Some(mut p) => {
                ringbuf_entry!(C6TRACE, Trace::AssertCs1);
                p.run_recovery(self.deadline())
            }
            None => Err(self.busy()),
        }
    }

    /// Mirrors `HostProcessor::force_recovery`; succeeds regardless of which
    /// `BmcRecovery` state the watchdog machine is currently in.
    pub fn force_recovery(&self) -> Result<()> {
        match self.processor.try_lock() {
            Some(mut p) => {
                ringbuf_entry!(C6TRACE, Trace::ForceRecovery);
                self.bmc.handle(BmcEvent::ForceRecovery);
                p.force_recovery(self.deadline())
            }
            None => Err(self.busy()),
        }
    }

    /// The periodic "worker" tick: derives a `TimerExpired` dispatch from
    /// elapsed wait time in `BmcRecovery` (scheduling recovery if the
    /// watchdog machine crosses into `Rollback`), then runs any
    /// `soft_reset` deferred by `exit_reset`. Platform glue calls this from
    /// a low-priority task or main loop, never from ISR context.
    pub fn run_deferred(&self) -> Option<Result<AuthOutcome>> {
        if self.bmc.poll_timer() == BmcAction::ScheduleRecovery {
            if let Some(mut p) = self.processor.try_lock() {
                let _ = p.run_recovery(self.deadline());
            }
        }

        if self.pending_soft_reset.swap(false, Ordering::AcqRel) {
            ringbuf_entry!(C6TRACE, Trace::DeferredSoftReset);
            let mut p = self.processor.lock();
            Some(p.soft_reset(self.deadline()))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_flash::HostFlashMgr;
    use crate::host_state::HostState;
    use crate::observer::ObserverRegistry;
    use crate::shared::SharedIrq;
    use crate::test_support::{
        FakeClock, FakeFlash, FakeHash, FakeIrqControl, FakeManifest, FakeSignatureVerifier,
        FakeStore,
    };
    use rot_host_api::{BmcState, Event as Ev, Verdict};

    fn public_key() -> heapless::Vec<u8, { rot_host_api::MAX_PUBLIC_KEY_LEN }> {
        let mut k = heapless::Vec::new();
        k.extend_from_slice(b"test-public-key").unwrap();
        k
    }

    #[test]
    fn double_fire_power_on_is_busy_not_racy() {
        let mut observers = ObserverRegistry::<Ev>::new();
        let recorder = crate::test_support::RecordingObserver::<Ev>::new();
        observers.register(&recorder);
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let flash_mgr = HostFlashMgr::new(
            FakeFlash::new(1 << 25, 256),
            &irq_shared,
            FakeClock::new(),
            &observers,
        );
        let state = HostState::new(FakeStore::new());
        let bmc = BmcRecovery::new(FakeClock::new(), Config::new(), &observers);

        let processor = HostProcessor::new(
            &flash_mgr,
            &state,
            &irq_shared,
            FakeClock::new(),
            &observers,
            Config::new(),
            FakeHash::new(),
            FakeSignatureVerifier::new(),
            FakeManifest::new(Verdict::Bad),
            FakeManifest::new(Verdict::Good),
            public_key(),
        );
        let handler = HostIrqHandler::new(processor, &bmc, FakeClock::new(), Config::new(), &observers, 10_000);

        // Hold the coarse lock the way a genuinely concurrent second ISR
        // fire would observe it, by taking the guard directly.
        let _held = handler.processor.lock();
        let err = handler.power_on(false, None).unwrap_err();
        assert_eq!(err, RotError::BusBusy);
        assert_eq!(recorder.events(), [Ev::DroppedEvent]);
    }

    #[test]
    fn assert_cs1_drives_recovery_and_reports_its_outcome() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let flash_mgr = HostFlashMgr::new(
            FakeFlash::new(1 << 25, 256),
            &irq_shared,
            FakeClock::new(),
            &observers,
        );
        let state = HostState::new(FakeStore::new());
        let bmc = BmcRecovery::new(FakeClock::new(), Config::new(), &observers);

        // Recovery manifest verdict Bad => run_recovery fails cleanly;
        // exercises that assert_cs1 reaches HostProcessor at all.
        let processor = HostProcessor::new(
            &flash_mgr,
            &state,
            &irq_shared,
            FakeClock::new(),
            &observers,
            Config::new(),
            FakeHash::new(),
            FakeSignatureVerifier::new(),
            FakeManifest::new(Verdict::Good),
            FakeManifest::new(Verdict::Bad),
            public_key(),
        );
        let handler = HostIrqHandler::new(processor, &bmc, FakeClock::new(), Config::new(), &observers, 10_000);

        let err = handler.assert_cs1().unwrap_err();
        assert_eq!(err, RotError::BadManifest);
    }

    #[test]
    fn enter_reset_notifies_bmc_without_blocking() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let flash_mgr = HostFlashMgr::new(
            FakeFlash::new(1 << 25, 256),
            &irq_shared,
            FakeClock::new(),
            &observers,
        );
        let state = HostState::new(FakeStore::new());
        let bmc = BmcRecovery::new(FakeClock::new(), Config::new(), &observers);

        let processor = HostProcessor::new(
            &flash_mgr,
            &state,
            &irq_shared,
            FakeClock::new(),
            &observers,
            Config::new(),
            FakeHash::new(),
            FakeSignatureVerifier::new(),
            FakeManifest::new(Verdict::Good),
            FakeManifest::new(Verdict::Good),
            public_key(),
        );
        let handler = HostIrqHandler::new(processor, &bmc, FakeClock::new(), Config::new(), &observers, 10_000);

        handler.enter_reset().unwrap();
        assert_eq!(bmc.state(), BmcState::InReset);
    }

    #[test]
    fn exit_reset_defers_soft_reset_until_run_deferred() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let mut flash = FakeFlash::new(1 << 25, 256);
        let data = [0x7u8; 64];
        flash.seed(0, &data);
        let flash_mgr = HostFlashMgr::new(flash, &irq_shared, FakeClock::new(), &observers);
        let state = HostState::new(FakeStore::new());
        let bmc = BmcRecovery::new(FakeClock::new(), Config::new(), &observers);

        let pk = public_key();
        let mut manifest = FakeManifest::new(Verdict::Good);
        let mut digest = [0u8; 64];
        let n = FakeHash::new()
            .calculate(rot_host_api::HashAlgo::Sha256, &data, &mut digest)
            .unwrap();
        manifest.regions.push(rot_host_api::FirmwareRegion {
            offset: 0,
            length: 64,
            hash_type: rot_host_api::HashAlgo::Sha256,
            sig_algorithm: rot_host_api::SigAlgorithm::EcdsaP256,
            signature: {
                let mut s = heapless::Vec::new();
                s.extend_from_slice(&digest[..n]).unwrap();
                s
            },
        });
        let mut verifier = FakeSignatureVerifier::new();
        verifier.accept(rot_host_api::SigAlgorithm::EcdsaP256, &pk, &digest[..n]);

        let processor = HostProcessor::new(
            &flash_mgr,
            &state,
            &irq_shared,
            FakeClock::new(),
            &observers,
            Config::new(),
            FakeHash::new(),
            verifier,
            manifest,
            FakeManifest::new(Verdict::Good),
            pk,
        );
        let handler = HostIrqHandler::new(processor, &bmc, FakeClock::new(), Config::new(), &observers, 10_000);

        handler.exit_reset(true).unwrap();
        assert!(handler.pending_soft_reset.load(Ordering::Acquire));

        let outcome = handler.run_deferred().unwrap().unwrap();
        assert!(outcome.is_good());
        assert!(!handler.pending_soft_reset.load(Ordering::Acquire));
    }
}
