//! Shared data model for the `orx` batch orchestrator.
//!
//! Everything here is plain data: no I/O, no clocks. The core crate mutates these types only
//! through the components that own them.

mod domain;
pub use domain::*;
