//! QPR Demo Suite
//!
//! A shared [`catalog`] and a handful of small programs that exercise the
//! engine and the validator:
//!
//! - **collatz**: recursion through a four-way decision, one qubit per step
//! - **write2**: two measurement chains whose writes may interleave
//! - **register**: a classical cell passed by reference to a callee
//! - **hang** / **race**: the two shapes the validator exists to catch
//!
//! ```rust
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(qpr_demos::catalog().unwrap());
//! let demo = qpr_demos::demo("collatz").unwrap();
//! let program = demo.build(catalog).unwrap();
//! assert_eq!(program.main().name(), "main");
//! ```

pub mod catalog;
pub mod programs;

pub use catalog::{U32, catalog, collatz_branch};
pub use programs::{Demo, demo, demos};
