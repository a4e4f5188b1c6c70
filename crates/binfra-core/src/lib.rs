//! # binfra-core
//!
//! Deterministic data helpers for the binfra toolkit.
//!
//! Everything in this crate is synchronous and side-effect free apart from
//! the explicit file-reading operations in [`files`]. The async execution
//! layer (retry, background tasks) lives in `binfra-runtime`.
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: same input always produces same output
//! 2. **Lossy by contract**: normalizers return `Option`, never panic
//! 3. **No global state**: nothing here reads configuration singletons
//!
//! ## Example
//!
//! ```rust
//! use binfra_core::{dates, numeric, Timer};
//!
//! let timer = Timer::start();
//! assert_eq!(dates::normalize_day_first("31-01-2024"), Some("2024-01-31".into()));
//! assert!(numeric::is_numeric_value("-123.456"));
//! let _taken = timer.elapsed();
//! ```

pub mod dates;
pub mod env;
pub mod files;
pub mod numeric;
pub mod timer;

// Re-export main types at crate root
pub use files::FilesError;
pub use timer::{timed, Timer};
