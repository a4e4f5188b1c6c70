//! Bounded-retry execution.
//!
//! # Data Flow
//! ```text
//! execute(operation):
//!     → spawn attempt on its own task (isolation from the caller)
//!     → wait up to attempt_timeout for completion
//!     → On success: return immediately
//!     → On error/timeout/panic: delay with backoff, start next attempt
//!     → After max_retries + 1 failed attempts: RetryError::Exhausted
//! ```
//!
//! # Design Decisions
//! - Attempts are strictly sequential; two attempts never run concurrently
//! - A timed-out attempt's task is detached by default, not awaited
//! - Cancellation is an explicit request; a running attempt may not
//!   acknowledge it

mod executor;
mod policy;

pub use executor::{FailureCause, RetryError, RetryExecutor};
pub use policy::{InvalidPolicy, RetryPolicy, TimeoutAction};
