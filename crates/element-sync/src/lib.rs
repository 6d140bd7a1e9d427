//! Wait-and-locate synchronization for asynchronously rendered pages.
//!
//! Every suite step goes "synchronize, then act, then assert": call
//! [`wait_for`] with a locator and a [`Condition`], act on the returned
//! element reference, assert on the result. The synchronizer polls the
//! live document at a fixed interval until the condition holds or a
//! monotonic deadline elapses, and its failures say which of the two
//! distinct things went wrong: the element never rendered, or it rendered
//! in the wrong state.

pub mod condition;
pub mod errors;
pub mod wait;

pub use condition::Condition;
pub use errors::SyncError;
pub use wait::{wait_for, SyncedElement, WaitParams};
