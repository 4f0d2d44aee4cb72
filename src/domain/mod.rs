//! Domain layer types and invariants.

pub mod decode;
pub mod entities;
pub mod error;
pub mod types;
