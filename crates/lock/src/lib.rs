#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Lock and queue arbitration for lockyard
//!
//! [`LockManager`] owns the resource registry and the wait queue behind a
//! single async mutex. Requests are granted immediately when a disjoint set
//! of usable resources exists; otherwise they wait in admission order until
//! a release, an administrative change or an explicit poll frees enough
//! resources. Waiters are resumed through a [`RequesterContinuation`] after
//! the mutex has been dropped.

mod claims;
pub mod continuation;
pub mod manager;
pub mod outcome;
pub mod queue;

pub use continuation::{from_fn, park, GrantReceiver, ParkedRequester, RequesterContinuation};
pub use lockyard_events::QueueReason;
pub use manager::LockManager;
pub use outcome::{AcquireOutcome, CancelOutcome, ClaimOutcome, LockSettings, ReleaseOutcome};
pub use queue::QueuedRequest;
