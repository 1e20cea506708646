//! Data models for Apple Health exports
//!
//! [`Node`] is the loosely-typed shape straight out of the XML parser; the
//! types in [`health`] are what the normalizer converts it into.

pub mod health;
pub mod node;

pub use health::{ActivitySummary, CleanedRecord, Workout};
pub use node::{Fields, Node};
