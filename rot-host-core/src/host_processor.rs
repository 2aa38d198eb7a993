//! C4: authenticates host firmware and decides whether to release the host
//! from reset, bypass, or fail toward recovery.

use core::sync::atomic::{AtomicBool, Ordering};

use counters::{count, counters};
use ringbuf::{ringbuf, ringbuf_entry};
use rot_host_api::{
    AuthOutcome, Clock, Config, Event, Flash, HashAlgo, HashEngine, HostIrqControl, Manifest,
    Result, RotError, SignatureVerifier, Verdict, MAX_PUBLIC_KEY_LEN,
};
use heapless::Vec as HVec;

use crate::host_flash::HostFlashMgr;
use crate::host_state::HostState;
use crate::observer::ObserverRegistry;
use crate::shared::SharedIrq;

/// Largest digest this module ever computes into (SHA-512).
const MAX_DIGEST_LEN: usize = 64;
/// Read/hash window used to stream a region through `HashEngine::update`
/// without needing a buffer sized to the largest possible region.
const READ_CHUNK: usize = 128;
/// Where the recovery (backup) image starts, relative to the active
/// image's own offsets, inside the single `Flash` capability this module
/// is handed. A two-flash-device platform maps this to its second chip
/// select; a single-device platform partitions by offset.
const RECOVERY_BASE_OFFSET: u32 = 0x0100_0000;

#[derive(Copy, Clone, Debug, Eq, PartialEq, counters::Count)]
enum Outcome {
    AuthGood,
    AuthBypassed,
    AuthBadSignature,
    AuthBadManifest,
    AuthUnsupportedFlash,
    AuthIoError,
    AuthCancelled,
    AuthTimeout,
    RecoverySucceeded,
    RecoveryFailed,
    RecoveryExhausted,
}

counters!(C4COUNTERS, Outcome);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    AuthStarted { power_on: bool },
    AuthFinished { good: bool },
    RecoveryStarted,
    RecoveryFinished { success: bool },
    Cancelled,
}

ringbuf!(C4TRACE, Trace, 32, Trace::Cancelled);

/// Authenticates a host's firmware and drives recovery when it fails to
/// validate. Exclusive `&mut self` access is the concurrency contract:
/// callers (normally `HostIrqHandler`) are expected to serialize calls
/// through their own coarse lock, so this type does no internal locking of
/// its own.
pub struct HostProcessor<'o, F, I, C, P, H, V, M> {
    flash_mgr: &'o HostFlashMgr<'o, F, I, C>,
    state: &'o HostState<P>,
    irq: &'o SharedIrq<I>,
    clock: C,
    observers: &'o ObserverRegistry<'o, Event>,
    config: Config,
    hash: H,
    verifier: V,
    manifest: M,
    recovery_manifest: M,
    public_key: HVec<u8, MAX_PUBLIC_KEY_LEN>,
    cancel_requested: AtomicBool,
}

/// First failure encountered while verifying one region. Carries no region
/// index: the caller, which is iterating the region list, attaches that.
enum WalkFailure {
    BadManifest,
    BadSignature,
    Aborted(RotError),
}

impl<'o, F, I, C, P, H, V, M> HostProcessor<'o, F, I, C, P, H, V, M>
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
        flash_mgr: &'o HostFlashMgr<'o, F, I, C>,
        state: &'o HostState<P>,
        irq: &'o SharedIrq<I>,
        clock: C,
        observers: &'o ObserverRegistry<'o, Event>,
        config: Config,
        hash: H,
        verifier: V,
        manifest: M,
        recovery_manifest: M,
        public_key: HVec<u8, MAX_PUBLIC_KEY_LEN>,
    ) -> Self {
        Self {
            flash_mgr,
            state,
            irq,
            clock,
            observers,
            config,
            hash,
            verifier,
            manifest,
            recovery_manifest,
            public_key,
            cancel_requested: AtomicBool::new(false),
        }
    }

    pub fn needs_recovery(&self) -> bool {
        !self.state.authenticated() && !self.state.bypass()
    }

    /// Request that the in-flight authentication or recovery operation
    /// abort at its next check point. A no-op if nothing is in flight.
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    fn check_cancelled(&self) -> core::result::Result<(), ()> {
        if self.cancel_requested.swap(false, Ordering::AcqRel) {
            Err(())
        } else {
            Ok(())
        }
    }

    pub fn power_on(
        &mut self,
        allow_unsecure: bool,
        override_hash: Option<&mut dyn HashEngine>,
        deadline_ms: u64,
    ) -> Result<AuthOutcome> {
        ringbuf_entry!(C4TRACE, Trace::AuthStarted { power_on: true });
        let outcome = self.authenticate(allow_unsecure, override_hash, true, deadline_ms)?;
        ringbuf_entry!(
            C4TRACE,
            Trace::AuthFinished {
                good: outcome.is_good()
            }
        );
        Ok(outcome)
    }

    pub fn soft_reset(&mut self, deadline_ms: u64) -> Result<AuthOutcome> {
        ringbuf_entry!(C4TRACE, Trace::AuthStarted { power_on: false });
        let outcome = self.authenticate(
            self.config.allow_unsecure_default,
            None,
            false,
            deadline_ms,
        )?;
        ringbuf_entry!(
            C4TRACE,
            Trace::AuthFinished {
                good: outcome.is_good()
            }
        );
        Ok(outcome)
    }

    fn authenticate(
        &mut self,
        allow_unsecure: bool,
        mut override_hash: Option<&mut dyn HashEngine>,
        in_power_on: bool,
        deadline_ms: u64,
    ) -> Result<AuthOutcome> {
        if self.state.unsupported_flash() {
            count!(C4COUNTERS, Outcome::AuthUnsupportedFlash);
            return self.finish_auth(AuthOutcome::UnsupportedFlash, allow_unsecure, in_power_on);
        }

        let mut guard = self.flash_mgr.with_rot_access(deadline_ms)?;

        match self.manifest.verify(&mut self.hash, &self.verifier, &self.public_key) {
            Ok(Verdict::Good) => {}
            Ok(Verdict::Bad) => {
                drop(guard);
                self.state.set_pfm_dirty(false)?;
                count!(C4COUNTERS, Outcome::AuthBadManifest);
                return self.finish_auth(AuthOutcome::BadManifest, allow_unsecure, in_power_on);
            }
            Err(e) => {
                drop(guard);
                count!(C4COUNTERS, Outcome::AuthIoError);
                return self.finish_auth(
                    AuthOutcome::IoError { cause: e },
                    allow_unsecure,
                    in_power_on,
                );
            }
        }

        let region_count = self.manifest.region_count();
        let mut failure = None;
        for index in 0..region_count {
            if self.check_cancelled().is_err() {
                self.hash.cancel();
                drop(guard);
                ringbuf_entry!(C4TRACE, Trace::Cancelled);
                return Err(RotError::Cancelled);
            }
            let region = match self.manifest.region(index) {
                Some(r) => r,
                None => {
                    failure = Some(AuthOutcome::BadManifest);
                    break;
                }
            };
            let hash_ref: &mut dyn HashEngine = match override_hash.as_deref_mut() {
                Some(h) => h,
                None => &mut self.hash,
            };
            match verify_region(
                hash_ref,
                &self.verifier,
                &self.public_key,
                &mut guard,
                region.offset,
                &region,
            ) {
                Ok(()) => {}
                Err(WalkFailure::BadManifest) => {
                    failure = Some(AuthOutcome::BadManifest);
                    break;
                }
                Err(WalkFailure::BadSignature) => {
                    failure = Some(AuthOutcome::BadSignature { region_index: index });
                    break;
                }
                Err(WalkFailure::Aborted(RotError::Cancelled)) => {
                    drop(guard);
                    ringbuf_entry!(C4TRACE, Trace::Cancelled);
                    return Err(RotError::Cancelled);
                }
                Err(WalkFailure::Aborted(e)) => {
                    failure = Some(AuthOutcome::IoError { cause: e });
                    break;
                }
            }
        }
        drop(guard);

        match failure {
            None => {
                self.state.record_auth_good()?;
                self.irq.enable_exit_reset(true);
                self.observers.publish(Event::ExitResetEnabled);
                count!(C4COUNTERS, Outcome::AuthGood);
                let outcome = AuthOutcome::Good { bypass: false };
                self.observers.publish(Event::AuthResult(outcome));
                Ok(outcome)
            }
            Some(outcome) => {
                count!(
                    C4COUNTERS,
                    match outcome {
                        AuthOutcome::BadSignature { .. } => Outcome::AuthBadSignature,
                        AuthOutcome::BadManifest => Outcome::AuthBadManifest,
                        AuthOutcome::UnsupportedFlash => Outcome::AuthUnsupportedFlash,
                        AuthOutcome::IoError { .. } => Outcome::AuthIoError,
                        AuthOutcome::Good { .. } => Outcome::AuthGood,
                    }
                );
                self.finish_auth(outcome, allow_unsecure, in_power_on)
            }
        }
    }

    fn finish_auth(
        &mut self,
        outcome: AuthOutcome,
        allow_unsecure: bool,
        in_power_on: bool,
    ) -> Result<AuthOutcome> {
        if outcome.is_good() {
            return Ok(outcome);
        }
        self.state.record_auth_failed()?;
        if allow_unsecure && in_power_on && self.state.bypass() {
            self.irq.enable_exit_reset(true);
            let bypassed = AuthOutcome::Good { bypass: true };
            count!(C4COUNTERS, Outcome::AuthBypassed);
            self.observers.publish(Event::AuthResult(bypassed));
            return Ok(bypassed);
        }
        self.observers.publish(Event::AuthResult(outcome));
        Ok(outcome)
    }

    /// `run_recovery` and `force_recovery` share this body; the only
    /// difference between them is who calls it (the former from policy, the
    /// latter from the IRQ handler's force path), not the algorithm itself.
    fn recover(&mut self, deadline_ms: u64) -> Result<()> {
        if self.state.recovery_attempts() as u16 > self.config.recovery_attempts_cap {
            count!(C4COUNTERS, Outcome::RecoveryExhausted);
            return Err(RotError::RecoveryExhausted);
        }

        ringbuf_entry!(C4TRACE, Trace::RecoveryStarted);
        self.observers.publish(Event::RecoveryStarted);

        let mut guard = self.flash_mgr.with_rot_access(deadline_ms)?;

        match self
            .recovery_manifest
            .verify(&mut self.hash, &self.verifier, &self.public_key)
        {
            Ok(Verdict::Good) => {}
            Ok(Verdict::Bad) => {
                drop(guard);
                return self.fail_recovery(RotError::BadManifest);
            }
            Err(e) => {
                drop(guard);
                return self.fail_recovery(e);
            }
        }

        let region_count = self.recovery_manifest.region_count();
        for index in 0..region_count {
            let region = self
                .recovery_manifest
                .region(index)
                .ok_or(RotError::BadManifest)?;
            if let Err(e) = verify_region(
                &mut self.hash,
                &self.verifier,
                &self.public_key,
                &mut guard,
                RECOVERY_BASE_OFFSET + region.offset,
                &region,
            ) {
                drop(guard);
                return self.fail_recovery(match e {
                    WalkFailure::BadSignature => RotError::BadSignature { region_index: index },
                    WalkFailure::BadManifest => RotError::BadManifest,
                    WalkFailure::Aborted(cause) => cause,
                });
            }
        }

        for index in 0..region_count {
            let region = self
                .recovery_manifest
                .region(index)
                .ok_or(RotError::BadManifest)?;
            guard.flash_mut().erase(region.offset, region.length)?;
        }

        let mut chunk = [0u8; READ_CHUNK];
        for index in 0..region_count {
            let region = self
                .recovery_manifest
                .region(index)
                .ok_or(RotError::BadManifest)?;
            let mut remaining = region.length;
            let mut src = RECOVERY_BASE_OFFSET + region.offset;
            let mut dst = region.offset;
            while remaining > 0 {
                let n = remaining.min(chunk.len() as u32) as usize;
                guard.read_region(src, &mut chunk[..n])?;
                guard.flash_mut().write(dst, &chunk[..n])?;
                src += n as u32;
                dst += n as u32;
                remaining -= n as u32;
            }
        }

        for index in 0..region_count {
            let region = self
                .recovery_manifest
                .region(index)
                .ok_or(RotError::BadManifest)?;
            if let Err(e) = verify_region(
                &mut self.hash,
                &self.verifier,
                &self.public_key,
                &mut guard,
                region.offset,
                &region,
            ) {
                drop(guard);
                return self.fail_recovery(match e {
                    WalkFailure::BadSignature => RotError::BadSignature { region_index: index },
                    WalkFailure::BadManifest => RotError::BadManifest,
                    WalkFailure::Aborted(cause) => cause,
                });
            }
        }
        drop(guard);

        self.flash_mgr.swap_active_flash()?;
        self.state.record_auth_good()?;
        self.irq.enable_exit_reset(true);
        count!(C4COUNTERS, Outcome::RecoverySucceeded);
        ringbuf_entry!(C4TRACE, Trace::RecoveryFinished { success: true });
        self.observers
            .publish(Event::RecoveryCompleted { success: true });
        Ok(())
    }

    fn fail_recovery(&mut self, cause: RotError) -> Result<()> {
        count!(C4COUNTERS, Outcome::RecoveryFailed);
        ringbuf_entry!(C4TRACE, Trace::RecoveryFinished { success: false });
        self.observers
            .publish(Event::RecoveryCompleted { success: false });
        Err(cause)
    }

    pub fn run_recovery(&mut self, deadline_ms: u64) -> Result<()> {
        self.recover(deadline_ms)
    }

    /// Identical algorithm to `run_recovery`; named separately because the
    /// IRQ handler's force path must succeed regardless of which C5 state
    /// triggered it, while `run_recovery` is reached only via the normal
    /// `assert_cs1` path.
    pub fn force_recovery(&mut self, deadline_ms: u64) -> Result<()> {
        self.recover(deadline_ms)
    }
}

fn verify_region<F: Flash>(
    hash: &mut dyn HashEngine,
    verifier: &dyn SignatureVerifier,
    public_key: &[u8],
    guard: &mut crate::host_flash::RotAccessGuard<'_, F>,
    base_offset: u32,
    region: &rot_host_api::FirmwareRegion,
) -> core::result::Result<(), WalkFailure> {
    if !hash.supports(region.hash_type) {
        return Err(WalkFailure::BadManifest);
    }
    hash.start(region.hash_type)
        .map_err(WalkFailure::Aborted)?;

    let mut remaining = region.length;
    let mut offset = base_offset;
    let mut chunk = [0u8; READ_CHUNK];
    while remaining > 0 {
        let n = remaining.min(chunk.len() as u32) as usize;
        if guard.read_region(offset, &mut chunk[..n]).is_err() {
            hash.cancel();
            return Err(WalkFailure::Aborted(RotError::IoError));
        }
        if hash.update(&chunk[..n]).is_err() {
            hash.cancel();
            return Err(WalkFailure::Aborted(RotError::CryptoUpdateFailed));
        }
        offset += n as u32;
        remaining -= n as u32;
    }

    let mut digest = [0u8; MAX_DIGEST_LEN];
    let digest_len = hash.finish(&mut digest).map_err(WalkFailure::Aborted)?;

    let verdict = verifier
        .verify(
            region.sig_algorithm,
            public_key,
            &digest[..digest_len],
            &region.signature,
        )
        .map_err(WalkFailure::Aborted)?;

    match verdict {
        Verdict::Good => Ok(()),
        Verdict::Bad => Err(WalkFailure::BadSignature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_state::HostState;
    use crate::shared::SharedIrq;
    use crate::test_support::{
        FakeClock, FakeFlash, FakeHash, FakeIrqControl, FakeManifest, FakeSignatureVerifier,
        FakeStore,
    };
    use rot_host_api::{Event as Ev, FirmwareRegion, HashAlgo, SigAlgorithm};

    fn public_key() -> HVec<u8, MAX_PUBLIC_KEY_LEN> {
        let mut k = HVec::new();
        k.extend_from_slice(b"test-public-key").unwrap();
        k
    }

    fn region(offset: u32, length: u32, sig: &[u8]) -> FirmwareRegion {
        region_with_algo(offset, length, sig, SigAlgorithm::EcdsaP256)
    }

    fn region_with_algo(
        offset: u32,
        length: u32,
        sig: &[u8],
        sig_algorithm: SigAlgorithm,
    ) -> FirmwareRegion {
        let mut signature = HVec::new();
        signature.extend_from_slice(sig).unwrap();
        FirmwareRegion {
            offset,
            length,
            hash_type: HashAlgo::Sha256,
            sig_algorithm,
            signature,
        }
    }

    #[test]
    fn good_region_releases_host_from_reset() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let mut flash = FakeFlash::new(1 << 25, 256);
        let data = [0x42u8; 128];
        flash.seed(0, &data);
        let flash_mgr = HostFlashMgr::new(flash, &irq_shared, FakeClock::new(), &observers);
        let state = HostState::new(FakeStore::new());

        let pk = public_key();
        let mut manifest = FakeManifest::new(Verdict::Good);
        let mut digest_buf = [0u8; MAX_DIGEST_LEN];
        let mut scratch = FakeHash::new();
        let n = scratch.calculate(HashAlgo::Sha256, &data, &mut digest_buf).unwrap();
        manifest.regions.push(region(0, 128, &digest_buf[..n]));
        let mut verifier = FakeSignatureVerifier::new();
        verifier.accept(SigAlgorithm::EcdsaP256, &pk, &digest_buf[..n]);

        let mut processor = HostProcessor::new(
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

        let outcome = processor.power_on(false, None, 10_000).unwrap();
        assert_eq!(outcome, AuthOutcome::Good { bypass: false });
        assert!(state.authenticated());
    }

    #[test]
    fn bad_signature_reports_region_index_and_holds_reset() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let mut flash = FakeFlash::new(1 << 25, 256);
        flash.seed(0, &[0x11u8; 128]);
        let flash_mgr = HostFlashMgr::new(flash, &irq_shared, FakeClock::new(), &observers);
        let state = HostState::new(FakeStore::new());

        let pk = public_key();
        let mut manifest = FakeManifest::new(Verdict::Good);
        manifest.regions.push(region(0, 128, b"wrong-signature"));
        let verifier = FakeSignatureVerifier::new(); // accepts nothing => always Bad

        let mut processor = HostProcessor::new(
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

        let outcome = processor.power_on(false, None, 10_000).unwrap();
        assert_eq!(outcome, AuthOutcome::BadSignature { region_index: 0 });
        assert!(!state.authenticated());
    }

    /// A region signed under one curve must never verify against a digest
    /// registered for a different curve, even when both digests happen to
    /// collide under this fake's trivial sum-based digest function. Guards
    /// against a region walk that forgets to thread `region.sig_algorithm`
    /// through to the verifier per region.
    #[test]
    fn distinct_curves_are_never_conflated() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let mut flash = FakeFlash::new(1 << 25, 256);
        let data = [0x9u8; 64];
        flash.seed(0, &data);
        let flash_mgr = HostFlashMgr::new(flash, &irq_shared, FakeClock::new(), &observers);
        let state = HostState::new(FakeStore::new());

        let pk = public_key();
        let mut digest = [0u8; MAX_DIGEST_LEN];
        let n = FakeHash::new()
            .calculate(HashAlgo::Sha256, &data, &mut digest)
            .unwrap();

        let mut manifest = FakeManifest::new(Verdict::Good);
        manifest.regions.push(region_with_algo(
            0,
            64,
            &digest[..n],
            SigAlgorithm::EcdsaP521,
        ));
        // Only P-384 is registered as accepting this digest; a verifier that
        // conflated the two curves would wrongly accept the P-521 region too.
        let mut verifier = FakeSignatureVerifier::new();
        verifier.accept(SigAlgorithm::EcdsaP384, &pk, &digest[..n]);

        let mut processor = HostProcessor::new(
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

        let outcome = processor.power_on(false, None, 10_000).unwrap();
        assert_eq!(outcome, AuthOutcome::BadSignature { region_index: 0 });
    }

    #[test]
    fn bypass_releases_host_after_a_failed_auth() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let mut flash = FakeFlash::new(1 << 25, 256);
        flash.seed(0, &[0x11u8; 128]);
        let flash_mgr = HostFlashMgr::new(flash, &irq_shared, FakeClock::new(), &observers);
        let state = HostState::new(FakeStore::new());
        state.set_bypass(true).unwrap();

        let pk = public_key();
        let mut manifest = FakeManifest::new(Verdict::Good);
        manifest.regions.push(region(0, 128, b"wrong-signature"));
        let verifier = FakeSignatureVerifier::new();

        let mut processor = HostProcessor::new(
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

        let outcome = processor.power_on(true, None, 10_000).unwrap();
        assert_eq!(outcome, AuthOutcome::Good { bypass: true });
    }

    /// Calling `power_on` twice in a row with identical inputs and no
    /// intervening reset must produce the same outcome and leave `HostState`
    /// unchanged the second time: authentication is idempotent, not
    /// cumulative.
    #[test]
    fn repeated_power_on_is_idempotent() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let mut flash = FakeFlash::new(1 << 25, 256);
        let data = [0x5Au8; 128];
        flash.seed(0, &data);
        let flash_mgr = HostFlashMgr::new(flash, &irq_shared, FakeClock::new(), &observers);
        let state = HostState::new(FakeStore::new());

        let pk = public_key();
        let mut manifest = FakeManifest::new(Verdict::Good);
        let mut digest_buf = [0u8; MAX_DIGEST_LEN];
        let n = FakeHash::new()
            .calculate(HashAlgo::Sha256, &data, &mut digest_buf)
            .unwrap();
        manifest.regions.push(region(0, 128, &digest_buf[..n]));
        let mut verifier = FakeSignatureVerifier::new();
        verifier.accept(SigAlgorithm::EcdsaP256, &pk, &digest_buf[..n]);

        let mut processor = HostProcessor::new(
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

        let first = processor.power_on(false, None, 10_000).unwrap();
        let attempts_after_first = state.recovery_attempts();
        let second = processor.power_on(false, None, 10_000).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, AuthOutcome::Good { bypass: false });
        assert!(state.authenticated());
        assert_eq!(state.recovery_attempts(), attempts_after_first);
    }

    #[test]
    fn recovery_exhausted_past_cap_touches_nothing() {
        let observers = ObserverRegistry::<Ev>::new();
        let irq_shared = SharedIrq::new(FakeIrqControl::new());
        let flash_mgr = HostFlashMgr::new(
            FakeFlash::new(1 << 25, 256),
            &irq_shared,
            FakeClock::new(),
            &observers,
        );
        let mut store = FakeStore::new();
        store.write_journal(&{
            let mut r = rot_host_api::PersistedHostState::fresh();
            r.set_attempts(u16::MAX);
            r
        }).unwrap();
        let state = HostState::new(store);
        let pk = public_key();

        let mut processor = HostProcessor::new(
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
            pk,
        );

        let err = processor.run_recovery(10_000).unwrap_err();
        assert_eq!(err, RotError::RecoveryExhausted);
    }
}
