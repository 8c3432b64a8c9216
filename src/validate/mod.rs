//! Schema validators.
//!
//! The structural validator turns raw input into a typed schema; the
//! relational validator checks references between the typed tables.

mod raw;
pub mod relational;
pub mod structural;

pub use relational::{ForeignKeyValidation, validate_references};
pub use structural::{StructuralOutcome, StructuralValidator};
