//! Metadata records stored in the registry arena

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a metadata record inside a [`ModuleRegistry`](super::ModuleRegistry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaIndex(pub(crate) usize);

impl MetaIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Whether a module describes a type or a singleton instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Type,
    Instance,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::Type => f.write_str("type"),
            ModuleKind::Instance => f.write_str("instance"),
        }
    }
}

/// Load progress of a module's backing implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loaded,
    /// The loader failed; the message is replayed on later load requests
    Failed(String),
}

/// Type-specific metadata
#[derive(Debug, Clone, Default)]
pub struct TypeMeta {
    pub(crate) ancestor: Option<MetaIndex>,
    pub(crate) is_abstract: bool,
    pub(crate) subtypes: Vec<MetaIndex>,
    pub(crate) instances: Vec<MetaIndex>,
}

impl TypeMeta {
    pub fn ancestor(&self) -> Option<MetaIndex> {
        self.ancestor
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Direct subtypes in declaration order
    pub fn subtypes(&self) -> &[MetaIndex] {
        &self.subtypes
    }

    /// Instances of exactly this type in declaration order
    pub fn instances(&self) -> &[MetaIndex] {
        &self.instances
    }
}

/// Instance-specific metadata
#[derive(Debug, Clone)]
pub struct InstanceMeta {
    pub(crate) type_index: Option<MetaIndex>,
}

impl InstanceMeta {
    /// The owning type, `None` while the instance is only a placeholder
    pub fn type_index(&self) -> Option<MetaIndex> {
        self.type_index
    }
}

#[derive(Debug, Clone)]
pub enum MetaDetail {
    Type(TypeMeta),
    Instance(InstanceMeta),
}

/// A registered module: identity, kind, load state and kind-specific links
#[derive(Debug, Clone)]
pub struct ModuleMeta {
    pub(crate) index: MetaIndex,
    pub(crate) id: String,
    pub(crate) declared: bool,
    pub(crate) load_state: LoadState,
    pub(crate) detail: MetaDetail,
}

impl ModuleMeta {
    pub(crate) fn placeholder(index: MetaIndex, id: String, kind: ModuleKind) -> Self {
        let detail = match kind {
            ModuleKind::Type => MetaDetail::Type(TypeMeta::default()),
            ModuleKind::Instance => MetaDetail::Instance(InstanceMeta { type_index: None }),
        };
        Self {
            index,
            id,
            declared: false,
            load_state: LoadState::Unloaded,
            detail,
        }
    }

    pub fn index(&self) -> MetaIndex {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ModuleKind {
        match self.detail {
            MetaDetail::Type(_) => ModuleKind::Type,
            MetaDetail::Instance(_) => ModuleKind::Instance,
        }
    }

    /// `false` for placeholders created by a lookup before the declaration ran
    pub fn is_declared(&self) -> bool {
        self.declared
    }

    pub fn is_loaded(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn as_type(&self) -> Option<&TypeMeta> {
        match &self.detail {
            MetaDetail::Type(meta) => Some(meta),
            MetaDetail::Instance(_) => None,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceMeta> {
        match &self.detail {
            MetaDetail::Instance(meta) => Some(meta),
            MetaDetail::Type(_) => None,
        }
    }

    pub(crate) fn as_type_mut(&mut self) -> Option<&mut TypeMeta> {
        match &mut self.detail {
            MetaDetail::Type(meta) => Some(meta),
            MetaDetail::Instance(_) => None,
        }
    }
}
