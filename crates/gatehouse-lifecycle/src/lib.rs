//! Device approval state machine.
//!
//! Every operation runs as one store transaction: the state change and its
//! audit entry land together or not at all.

pub mod clock;
pub mod engine;
pub mod error;
pub mod policy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{ApprovalCheck, Lifecycle};
pub use error::{ErrorKind, LifecycleError};
pub use policy::LifecyclePolicy;
