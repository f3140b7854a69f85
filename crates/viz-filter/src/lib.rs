//! Filter engine: boolean predicates over table rows
//!
//! Filters are immutable trees. They evaluate against anything implementing
//! [`viz_data::Element`], serialize to and from JSON specs, and render a
//! canonical content key used for caching and deduplication.

pub mod cache;
pub mod content_key;
pub mod eval;
pub mod filter;
pub mod kind;
pub mod selection;
pub mod simplify;
pub mod spec;

#[cfg(test)]
mod fixtures;

// Re-exports
pub use cache::FilterCache;
pub use content_key::ContentKey;
pub use eval::FilteredRows;
pub use filter::{Comparison, Filter, IsIn, IsLike, LikeOptions, Operands};
pub use kind::{declare_filter_types, BuiltinFilterLoader, FilterKind, FILTER_NAMESPACE};
pub use selection::SelectionMode;
pub use viz_core::{Result, VizError};
