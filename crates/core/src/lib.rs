#![forbid(unsafe_code)]

mod chapter;
mod context;
mod error;
mod fork;
mod pull_request;
pub mod tree;

pub use chapter::*;
pub use context::*;
pub use error::*;
pub use fork::*;
pub use pull_request::*;

/// `tracing` target for pointer-integrity problems found while reading the chapter tree.
pub const DATA_QUALITY_TARGET: &str = "sb::data_quality";

#[cfg(test)]
mod tests;
