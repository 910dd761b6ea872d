//! Built-in well-formedness checks.

mod hang;
mod race;

pub use hang::HangCheck;
pub use race::RaceCheck;
