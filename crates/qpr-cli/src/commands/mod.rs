//! CLI command implementations.

pub mod common;
pub mod dot;
pub mod list;
pub mod run;
pub mod validate;
pub mod version;
