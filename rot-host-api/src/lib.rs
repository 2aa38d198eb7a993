//! Capability traits and wire types shared between the host boot-gate and
//! recovery engine (`rot-host-core`) and its callers.
//!
//! This crate carries no hardware or crypto implementation of its own; it
//! exists so `rot-host-core` can be written against traits and tested
//! against fakes instead of real silicon.

#![no_std]
#![forbid(elided_lifetimes_in_paths)]

mod capability;
mod config;
mod error;
mod persist;
mod types;

pub use capability::{
    Clock, Flash, HashEngine, HostIrqControl, Manifest, Observer, PersistStore, SignatureVerifier,
};
pub use config::Config;
pub use error::{Module, Result, RotError};
pub use persist::{HostStateFlags, PersistedHostState};
pub use types::{
    AuthOutcome, BmcEvent, BmcState, ChipSelect, Event, FirmwareRegion, FlashRouting, HashAlgo,
    RotAccess, SigAlgorithm, Verdict, MAX_PUBLIC_KEY_LEN, MAX_SIGNATURE_LEN,
};
