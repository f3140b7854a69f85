//! Type and instance metadata
//!
//! Modules are identified by `/`-separated ids. Types form a forest through
//! their ancestor links; instances hang off exactly one type.

mod id;
mod loader;
mod meta;
mod registry;

pub use id::{is_relative, resolve_relative, SEPARATOR};
pub use loader::{load_module, shared, ModuleLoader, SharedRegistry, UnavailableLoader};
pub use meta::{InstanceMeta, LoadState, MetaDetail, MetaIndex, ModuleKind, ModuleMeta, TypeMeta};
pub use registry::{MetaResolver, ModuleRegistry, Subtypes, TypeSpec};
