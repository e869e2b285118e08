#![forbid(unsafe_code)]

//! In-memory views over a flat, parent-pointer chapter set.
//!
//! Every view is computed from rows fetched with one range query; nothing here touches
//! storage. Nodes live in an arena indexed by slot and parents are resolved by id, so
//! no node ever holds a reference to another.

mod build;
mod query;
mod stats;
mod types;

pub use build::*;
pub use query::*;
pub use types::*;

#[cfg(test)]
mod tests;
