//! Core functionality for the visualization platform
//!
//! This crate provides the error taxonomy shared by all crates, the module
//! metadata registry that tracks visualization types and their instances,
//! and the configuration format used to declare them.

pub mod config;
pub mod error;
pub mod events;
pub mod module;

// Re-export commonly used types
pub use config::{InstanceDecl, ModuleConfig, TypeDecl};
pub use error::{Result, VizError};
pub use events::EventBus;
pub use module::{
    load_module, MetaIndex, MetaResolver, ModuleKind, ModuleLoader, ModuleMeta, ModuleRegistry,
    SharedRegistry, TypeMeta, TypeSpec,
};
