//! # binfra-runtime
//!
//! Async execution layer of the binfra toolkit.
//!
//! The centerpiece is the bounded-retry executor: it re-invokes a unit of
//! work up to a fixed number of times, abandons an individual attempt when
//! it exceeds its wall-clock budget, and gives up with the last failure's
//! cause once retries are exhausted. Around it sit detached background task
//! helpers and configuration loading.
//!
//! Deterministic, synchronous helpers live in `binfra-core`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use binfra_runtime::{RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(60))
//!     .with_initial_delay(Duration::from_secs(10));
//! let executor = RetryExecutor::new(policy)?;
//!
//! let report = executor
//!     .execute("daily-report", || async { build_report().await })
//!     .await?;
//! ```
//!
//! ## Timeout semantics
//!
//! An attempt that exceeds its budget cannot be interrupted if it never
//! yields; by default its task is left running detached and the result is
//! discarded. See [`TimeoutAction`] for the opt-in abort.

pub mod config;
pub mod retry;
pub mod task;

// Re-export main types at crate root
pub use config::{ConfigError, RuntimeConfig};
pub use retry::{
    FailureCause, InvalidPolicy, RetryError, RetryExecutor, RetryPolicy, TimeoutAction,
};
pub use task::{spawn_blocking_detached, spawn_detached};
