//! Domain models for the medication reference core.

mod medication;
mod patient;
mod prescription;

pub use medication::*;
pub use patient::*;
pub use prescription::*;
