/// Shared types for the autopay tip keeper
///
/// This crate provides the identifiers, feed records, error type and constants
/// used by the keeper's aggregation, projection and ranking stages.

pub mod constants;
pub mod errors;
pub mod feed;
pub mod query;
pub mod suggestion;
pub mod value;

// Re-export all public types
pub use constants::*;
pub use errors::*;
pub use feed::*;
pub use query::*;
pub use suggestion::*;
pub use value::*;
