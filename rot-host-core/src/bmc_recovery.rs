//! C5: the BMC-driven watchdog/failover state machine. Pure in the sense
//! that it never touches flash or the IRQ control lines itself — it only
//! tracks state and tells its caller (`HostIrqHandler`, C6) when a recovery
//! run should be scheduled. Keeping C5 decoupled from `HostProcessor` this
//! way mirrors the component table's data flow: C6 dispatches to C4 and C5
//! independently, and C5 never calls back into C4.

use ringbuf::{ringbuf, ringbuf_entry};
use rot_host_api::{BmcEvent, BmcState, Clock, Config, Event};
use spin::RwLock;

use crate::observer::ObserverRegistry;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    Transition { from: BmcState, to: BmcState },
    Dropped { state: BmcState },
}

ringbuf!(
    C5TRACE,
    Trace,
    32,
    Trace::Dropped {
        state: BmcState::Running
    }
);

/// What `handle`/`poll_timer` ask the caller to do next. `BmcRecovery` never
/// calls `HostProcessor` itself; the caller is responsible for acting on
/// `ScheduleRecovery` (normally by calling `HostProcessor::run_recovery`).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BmcAction {
    None,
    ScheduleRecovery,
}

struct Inner {
    state: BmcState,
    consecutive_resets: u8,
    /// Wall-clock time (ms) at which the current `InReset`/`OutOfReset` wait
    /// began, used by `poll_timer` to synthesize `TimerExpired`. `None`
    /// outside those two states.
    wait_started_ms: Option<u64>,
}

impl Inner {
    const fn fresh() -> Self {
        Self {
            state: BmcState::Running,
            consecutive_resets: 0,
            wait_started_ms: None,
        }
    }
}

/// The watchdog/failover state machine. Generalized over an injected
/// `Clock` instead of a kernel timer syscall so `TimerExpired` can be
/// derived from elapsed wall-clock time rather than requiring the caller to
/// track it by hand. One live deadline is enough since `InReset` and
/// `OutOfReset` are mutually exclusive states.
pub struct BmcRecovery<'o, C> {
    inner: RwLock<Inner>,
    clock: C,
    config: Config,
    observers: &'o ObserverRegistry<'o, Event>,
}

impl<'o, C: Clock> BmcRecovery<'o, C> {
    pub fn new(clock: C, config: Config, observers: &'o ObserverRegistry<'o, Event>) -> Self {
        Self {
            inner: RwLock::new(Inner::fresh()),
            clock,
            config,
            observers,
        }
    }

    pub fn state(&self) -> BmcState {
        self.inner.read().state
    }

    pub fn consecutive_resets(&self) -> u8 {
        self.inner.read().consecutive_resets
    }

    fn transition(&self, inner: &mut Inner, to: BmcState) {
        let from = inner.state;
        inner.state = to;
        inner.wait_started_ms = match to {
            BmcState::InReset | BmcState::OutOfReset => Some(self.clock.now_ms()),
            _ => None,
        };
        ringbuf_entry!(C5TRACE, Trace::Transition { from, to });
        self.observers.publish(Event::BmcTransition { from, to });
    }

    fn dropped(&self, state: BmcState) -> BmcAction {
        ringbuf_entry!(C5TRACE, Trace::Dropped { state });
        self.observers.publish(Event::DroppedEvent);
        BmcAction::None
    }

    /// Dispatch one event through the `BmcState` transition table. Total:
    /// any `(state, event)` pair the table doesn't name is a no-op that
    /// reports `DroppedEvent`, satisfying the state-machine totality
    /// property.
    pub fn handle(&self, event: BmcEvent) -> BmcAction {
        let mut inner = self.inner.write();
        let state = inner.state;

        // `force_recovery` bypasses every guard and is accepted from any
        // state, including `Rollback` itself (re-entry is a no-op transition
        // but still a valid dispatch, not a drop).
        if matches!(event, BmcEvent::ForceRecovery) {
            self.transition(&mut inner, BmcState::Rollback);
            return BmcAction::ScheduleRecovery;
        }

        match (state, event) {
            (BmcState::Running, BmcEvent::BmcResetEntered) => {
                inner.consecutive_resets = inner.consecutive_resets.saturating_add(1);
                self.transition(&mut inner, BmcState::InReset);
                BmcAction::None
            }
            // A further reset observed before the host ever made it out of
            // `InReset` still counts toward the consecutive total; this is
            // what lets repeated BMC resets accumulate toward the rollback
            // threshold without the host ever reaching `OutOfReset`.
            (BmcState::InReset, BmcEvent::BmcResetEntered) => {
                inner.consecutive_resets = inner.consecutive_resets.saturating_add(1);
                BmcAction::None
            }
            (BmcState::InReset, BmcEvent::BmcResetExited { host_auth_good: true }) => {
                inner.consecutive_resets = 0;
                self.transition(&mut inner, BmcState::Running);
                BmcAction::None
            }
            (BmcState::InReset, BmcEvent::BmcResetExited { host_auth_good: false }) => {
                self.transition(&mut inner, BmcState::OutOfReset);
                BmcAction::None
            }
            (BmcState::InReset, BmcEvent::TimerExpired { seconds }) => {
                let threshold = self.config.min_wdt_seconds.min(u8::MAX as u32) as u8;
                if seconds >= self.config.min_wdt_seconds && inner.consecutive_resets >= threshold
                {
                    self.transition(&mut inner, BmcState::Rollback);
                    BmcAction::ScheduleRecovery
                } else {
                    self.dropped(state)
                }
            }
            (BmcState::OutOfReset, BmcEvent::TimerExpired { seconds }) => {
                if seconds >= self.config.rec_wait_seconds {
                    self.transition(&mut inner, BmcState::Rollback);
                    BmcAction::ScheduleRecovery
                } else {
                    self.dropped(state)
                }
            }
            (BmcState::Rollback, BmcEvent::BmcResetExited { host_auth_good: true }) => {
                inner.consecutive_resets = 0;
                self.transition(&mut inner, BmcState::Running);
                BmcAction::None
            }
            (BmcState::Rollback, BmcEvent::IrqError) => {
                self.transition(&mut inner, BmcState::IrqFailed);
                BmcAction::None
            }
            _ => self.dropped(state),
        }
    }

    /// Convert elapsed wait time since entering `InReset`/`OutOfReset` into
    /// a synthetic `TimerExpired` dispatch. A no-op (returns `BmcAction::None`
    /// without touching state) outside those two states. The platform glue
    /// calls this from a periodic tick; it never blocks.
    pub fn poll_timer(&self) -> BmcAction {
        let elapsed_seconds = {
            let inner = self.inner.read();
            match inner.wait_started_ms {
                Some(started) => self.clock.now_ms().saturating_sub(started) / 1000,
                None => return BmcAction::None,
            }
        };
        self.handle(BmcEvent::TimerExpired {
            seconds: elapsed_seconds as u32,
        })
    }
}
