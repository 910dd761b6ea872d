//! QPR Well-formedness Validator
//!
//! Static analysis over a built [`Program`](qpr_ir::Program) that flags graphs
//! whose control structure can *hang* (a node waits for a token no branch
//! choice will deliver) or *race* (a port can receive tokens from two
//! producers in the same run).
//!
//! # Overview
//!
//! For each function the validator computes a [`Guard`] per node and wire:
//! the set of D-node branch choices under which it fires, in disjunctive
//! normal form. Post-dominance over the reversed graph marks the nodes the
//! function cannot complete without. The checks then work on the guards:
//!
//! - [`RaceCheck`]: two producers of one port whose guards can hold together.
//! - [`HangCheck`]: a port that is needed under some branch choice where
//!   none of its producers fire.
//!
//! The analysis is conservative. Cycles inside a function and guards that
//! exceed the [`ValidatorConfig`] bounds are reported as
//! [`HazardKind::Unresolved`] rather than accepted.
//!
//! # Example
//!
//! ```rust,ignore
//! use qpr_verify::{Validator, Verdict};
//!
//! let verdict = Validator::default().validate(&program);
//! if let Verdict::Warnings(hazards) = &verdict {
//!     for hazard in hazards {
//!         eprintln!("{hazard}");
//!     }
//! }
//! ```

pub mod check;
pub mod checks;
pub mod config;
pub mod guard;
pub mod hazard;
pub mod manager;

pub use check::{Check, CheckContext};
pub use checks::{HangCheck, RaceCheck};
pub use config::ValidatorConfig;
pub use guard::{Guard, GuardAnalysis, Term};
pub use hazard::{Hazard, HazardKind, Verdict};
pub use manager::Validator;
