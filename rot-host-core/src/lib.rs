//! Host boot-gate authentication and BMC-driven recovery engine.
//!
//! This crate implements the security-gated boot and recovery core that
//! sits between a BMC and a host processor: `HostIrqHandler` (C6) is the
//! entry point platform glue calls from ISR/worker context, dispatching
//! into `HostProcessor` (C4, authentication and recovery) and `BmcRecovery`
//! (C5, the watchdog/failover state machine). `HostState` (C2) and
//! `HostFlashMgr` (C3) are the persistent record and flash-mux arbiter
//! those two build on. `rot_host_api` supplies every capability trait and
//! shared data type this crate is written against; this crate carries no
//! hash, signature, flash-driver, or manifest-parsing implementation of its
//! own.
//!
//! `no_std`: production code never allocates and never touches a real
//! clock or OS thread. Test doubles in `test_support` (`std`-only, behind
//! `#[cfg(test)]`) stand in for the capabilities a real platform wires in.

#![no_std]
#![forbid(elided_lifetimes_in_paths)]

mod bmc_recovery;
mod host_flash;
mod host_irq;
mod host_processor;
mod host_state;
mod observer;
mod shared;

#[cfg(test)]
mod test_support;

pub use bmc_recovery::{BmcAction, BmcRecovery};
pub use host_flash::{HostFlashMgr, RotAccessGuard};
pub use host_irq::HostIrqHandler;
pub use host_processor::HostProcessor;
pub use host_state::HostState;
pub use observer::{ObserverRegistry, MAX_OBSERVERS};
pub use shared::SharedIrq;
