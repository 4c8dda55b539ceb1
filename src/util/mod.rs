//! Utility types shared across the crate.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math re-exports from glam plus [`Axis`], [`Ray`] and [`Transform`]
//! - [`BuildSettings`] - tunables for tree construction

mod error;
mod math;
mod settings;

pub use error::*;
pub use math::*;
pub use settings::*;
