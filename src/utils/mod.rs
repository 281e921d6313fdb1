//! Utility modules for coordinate conversion and validation

pub mod coordinates;
pub mod validation;

pub use coordinates::{normalize_to_absolute, padded_box};
pub use validation::{NumericValidator, RegionValidator};
