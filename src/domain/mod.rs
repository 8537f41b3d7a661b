//! Domain layer types and invariants.

pub mod categories;
pub mod entities;
pub mod posts;
