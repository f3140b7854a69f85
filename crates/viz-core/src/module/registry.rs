//! Module metadata registry
//!
//! The registry is an arena of [`ModuleMeta`] records addressed by
//! [`MetaIndex`]. Ancestry and subtype links are stored as indices, so the
//! subtype → ancestor → subtypes relation never forms an ownership cycle.
//! Every mutation validates first and only then touches the arena; a failed
//! declaration leaves the registry exactly as it was.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ModuleConfig;
use crate::error::{Result, VizError};
use crate::events::{events, EventBus};

use super::id::resolve_relative;
use super::meta::{InstanceMeta, LoadState, MetaDetail, MetaIndex, ModuleKind, ModuleMeta, TypeMeta};

/// Declaration of a type module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSpec {
    /// Id of the ancestor type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ancestor: Option<String>,

    /// Alternate spelling of `ancestor`, used when `ancestor` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default)]
    pub is_abstract: bool,
}

impl TypeSpec {
    /// Spec for a concrete type deriving from `ancestor`
    pub fn derived(ancestor: impl Into<String>) -> Self {
        Self {
            ancestor: Some(ancestor.into()),
            ..Self::default()
        }
    }

    /// Mark the type abstract
    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// The effective ancestor id
    pub fn ancestor_id(&self) -> Option<&str> {
        self.ancestor.as_deref().or(self.base.as_deref())
    }
}

/// Lookup of already registered metadata by id and kind
pub trait MetaResolver {
    fn resolve_meta(&self, id: &str, kind: ModuleKind) -> Result<MetaIndex>;
}

/// Outcome of checking whether a module still needs its loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadStep {
    Done,
    Failed(String),
    Needed { index: MetaIndex, id: String, kind: ModuleKind },
}

/// Load outcome waiting to be published once the registry lock is released
#[must_use]
pub(crate) struct LoadNotice {
    bus: Arc<EventBus>,
    outcome: std::result::Result<events::ModuleLoaded, events::ModuleLoadFailed>,
}

impl LoadNotice {
    pub(crate) fn publish(self) {
        match self.outcome {
            Ok(loaded) => self.bus.publish(loaded),
            Err(failed) => self.bus.publish(failed),
        }
    }
}

/// Registry of type and instance metadata
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleMeta>,
    by_id: AHashMap<String, MetaIndex>,
    aliases: AHashMap<String, String>,
    /// Declaration sequence number per module, used to order instance unions
    declared_order: AHashMap<MetaIndex, usize>,
    event_bus: Option<Arc<EventBus>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that publishes its changes on `bus`
    pub fn with_event_bus(bus: Arc<EventBus>) -> Self {
        Self {
            event_bus: Some(bus),
            ..Self::default()
        }
    }

    /// Reset the registry and declare everything in `config`
    pub fn init(&mut self, config: &ModuleConfig) -> Result<()> {
        self.reset();
        self.configure(config)
    }

    /// Drop all metadata and aliases; the event bus stays attached
    pub fn reset(&mut self) {
        debug!("Resetting module registry ({} modules)", self.modules.len());
        self.modules.clear();
        self.by_id.clear();
        self.aliases.clear();
        self.declared_order.clear();
    }

    /// Declare aliases, types and instances of `config` in file order.
    ///
    /// Stops at the first failing declaration; declarations before it stay.
    pub fn configure(&mut self, config: &ModuleConfig) -> Result<()> {
        for (alias, target) in &config.aliases {
            self.register_alias(alias, target)?;
        }
        for decl in &config.types {
            self.declare_type(&decl.id, &decl.spec)?;
        }
        for decl in &config.instances {
            self.declare_instance(&decl.id, &decl.type_id)?;
        }
        info!(
            "Configured {} types and {} instances",
            config.types.len(),
            config.instances.len()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// All records, placeholders included, in arena order
    pub fn iter(&self) -> impl Iterator<Item = &ModuleMeta> {
        self.modules.iter()
    }

    /// Canonical absolute id for `id`.
    ///
    /// Relative ids resolve against `base`; aliases map to their target.
    pub fn resolve_id(&self, id: &str, base: Option<&str>) -> Result<String> {
        let absolute = resolve_relative(id, base)?;
        match self.aliases.get(&absolute) {
            Some(target) => Ok(target.clone()),
            None => Ok(absolute),
        }
    }

    /// Register `alias` as another name of `id`
    pub fn register_alias(&mut self, alias: &str, id: &str) -> Result<()> {
        let alias = resolve_relative(alias, None)?;
        let target = self.resolve_id(id, None)?;

        if self.by_id.contains_key(&alias) {
            return Err(VizError::DuplicateId(alias));
        }
        if let Some(existing) = self.aliases.get(&alias) {
            if *existing != target {
                return Err(VizError::DuplicateId(alias));
            }
            return Ok(());
        }

        debug!("Alias {} -> {}", alias, target);
        self.aliases.insert(alias, target);
        Ok(())
    }

    /// Record at `index`, if it belongs to this registry
    pub fn by_index(&self, index: MetaIndex) -> Option<&ModuleMeta> {
        self.modules.get(index.0)
    }

    /// Look up a module; unknown ids yield `None`
    pub fn find(&self, id: &str) -> Option<&ModuleMeta> {
        let id = self.resolve_id(id, None).ok()?;
        self.by_id.get(&id).map(|index| &self.modules[index.0])
    }

    /// Look up a module, failing with `NotFound` for unknown ids
    pub fn get(&self, id: &str) -> Result<&ModuleMeta> {
        let canonical = self.resolve_id(id, None)?;
        self.by_id
            .get(&canonical)
            .map(|index| &self.modules[index.0])
            .ok_or(VizError::NotFound(canonical))
    }

    /// Type metadata of `id`
    pub fn type_meta(&self, id: &str) -> Result<&TypeMeta> {
        let meta = self.get(id)?;
        meta.as_type().ok_or_else(|| VizError::KindMismatch {
            id: meta.id.clone(),
            expected: ModuleKind::Type,
            actual: ModuleKind::Instance,
        })
    }

    /// Look up a module, creating an undeclared placeholder when unknown.
    ///
    /// Used when metadata is referenced before its owning module finished
    /// loading. The placeholder keeps its index when declared later.
    pub fn get_or_create_placeholder(&mut self, id: &str, kind: ModuleKind) -> Result<MetaIndex> {
        let canonical = self.resolve_id(id, None)?;

        if let Some(&index) = self.by_id.get(&canonical) {
            let actual = self.modules[index.0].kind();
            if actual != kind {
                return Err(VizError::KindMismatch {
                    id: canonical,
                    expected: kind,
                    actual,
                });
            }
            return Ok(index);
        }

        debug!("Creating placeholder {} {}", kind, canonical);
        Ok(self.push(canonical, kind))
    }

    /// Declare a type.
    ///
    /// The ancestor must already be declared; the new type is appended to
    /// the ancestor's subtypes.
    pub fn declare_type(&mut self, id: &str, spec: &TypeSpec) -> Result<MetaIndex> {
        let canonical = resolve_relative(id, None)?;
        let existing = self.check_declarable(&canonical, ModuleKind::Type)?;

        let ancestor = match spec.ancestor_id() {
            Some(ancestor_id) => {
                let ancestor_id = self.resolve_id(ancestor_id, Some(&canonical))?;
                if ancestor_id == canonical {
                    return Err(VizError::CyclicAncestry(canonical));
                }
                let index = self
                    .resolve_meta(&ancestor_id, ModuleKind::Type)
                    .map_err(|_| VizError::UnresolvedAncestor {
                        id: canonical.clone(),
                        ancestor: ancestor_id.clone(),
                    })?;
                Some(index)
            }
            None => None,
        };

        let index = existing.unwrap_or_else(|| self.push(canonical.clone(), ModuleKind::Type));
        let sequence = self.declared_order.len();
        self.declared_order.insert(index, sequence);

        let meta = &mut self.modules[index.0];
        meta.declared = true;
        if spec.is_abstract {
            meta.load_state = LoadState::Loaded;
        }
        if let Some(type_meta) = meta.as_type_mut() {
            type_meta.ancestor = ancestor;
            type_meta.is_abstract = spec.is_abstract;
        }

        let ancestor_name = ancestor.map(|a| self.modules[a.0].id.clone());
        if let Some(ancestor) = ancestor {
            if let Some(ancestor_meta) = self.modules[ancestor.0].as_type_mut() {
                ancestor_meta.subtypes.push(index);
            }
        }

        debug!(
            "Declared type {} (ancestor: {:?}, abstract: {})",
            canonical, ancestor_name, spec.is_abstract
        );
        self.publish(events::TypeDeclared {
            id: canonical,
            ancestor: ancestor_name,
            is_abstract: spec.is_abstract,
        });

        Ok(index)
    }

    /// Declare an instance of an already declared type
    pub fn declare_instance(&mut self, id: &str, type_id: &str) -> Result<MetaIndex> {
        let canonical = resolve_relative(id, None)?;
        let existing = self.check_declarable(&canonical, ModuleKind::Instance)?;

        let type_canonical = self.resolve_id(type_id, Some(&canonical))?;
        let type_index = self
            .resolve_meta(&type_canonical, ModuleKind::Type)
            .map_err(|_| VizError::UnresolvedType {
                id: canonical.clone(),
                type_id: type_canonical.clone(),
            })?;

        let index = existing.unwrap_or_else(|| self.push(canonical.clone(), ModuleKind::Instance));
        let sequence = self.declared_order.len();
        self.declared_order.insert(index, sequence);

        let meta = &mut self.modules[index.0];
        meta.declared = true;
        meta.detail = MetaDetail::Instance(InstanceMeta {
            type_index: Some(type_index),
        });

        if let Some(type_meta) = self.modules[type_index.0].as_type_mut() {
            type_meta.instances.push(index);
        }

        debug!("Declared instance {} of {}", canonical, type_canonical);
        self.publish(events::InstanceDeclared {
            id: canonical,
            type_id: type_canonical,
        });

        Ok(index)
    }

    /// Subtype ids of `id`: direct ones, or the whole subtree breadth-first
    pub fn subtypes_of(&self, id: &str, transitive: bool) -> Result<Subtypes<'_>> {
        let root = self.get(id)?;
        let type_meta = self.type_meta(id)?;

        let mut visited = AHashSet::new();
        visited.insert(root.index);

        Ok(Subtypes {
            registry: self,
            queue: type_meta.subtypes.iter().copied().collect(),
            visited,
            transitive,
            finished: false,
        })
    }

    /// Instance ids of `id` and, optionally, of all its transitive subtypes,
    /// in declaration order
    pub fn instances_of_type(&self, id: &str, include_subtypes: bool) -> Result<Vec<&str>> {
        let root = self.get(id)?.index;
        let mut types = vec![root];
        if include_subtypes {
            for subtype in self.subtypes_of(id, true)? {
                if let Some(&index) = self.by_id.get(subtype?) {
                    types.push(index);
                }
            }
        }

        let mut seen = AHashSet::new();
        let mut instances: Vec<MetaIndex> = Vec::new();
        for type_index in types {
            if let Some(type_meta) = self.modules[type_index.0].as_type() {
                for &instance in &type_meta.instances {
                    if seen.insert(instance) {
                        instances.push(instance);
                    }
                }
            }
        }

        instances.sort_by_key(|index| self.declared_order.get(index).copied().unwrap_or(usize::MAX));
        Ok(instances.into_iter().map(|index| self.modules[index.0].id.as_str()).collect())
    }

    /// Ancestry chain of `id`, starting with `id` itself and ending at its root
    pub fn ancestors_of(&self, id: &str) -> Result<Vec<&str>> {
        let mut chain = Vec::new();
        let mut visited = AHashSet::new();
        let mut current = Some(self.get(id)?.index);

        while let Some(index) = current {
            let meta = &self.modules[index.0];
            if !visited.insert(index) {
                return Err(VizError::CyclicAncestry(meta.id.clone()));
            }
            chain.push(meta.id.as_str());
            current = meta.as_type().and_then(|t| t.ancestor);
        }

        Ok(chain)
    }

    /// Whether `id` is `base_id` or derives from it
    pub fn is_subtype_of(&self, id: &str, base_id: &str) -> Result<bool> {
        let base = self.get(base_id)?.id.clone();
        Ok(self.ancestors_of(id)?.iter().any(|ancestor| *ancestor == base))
    }

    /// Check the loader requirement of `id`
    pub(crate) fn load_step(&self, id: &str) -> Result<LoadStep> {
        let meta = self.get(id)?;
        Ok(match &meta.load_state {
            LoadState::Loaded => LoadStep::Done,
            LoadState::Failed(reason) => LoadStep::Failed(reason.clone()),
            LoadState::Unloaded => LoadStep::Needed {
                index: meta.index,
                id: meta.id.clone(),
                kind: meta.kind(),
            },
        })
    }

    /// Record the loader outcome; a module leaves `Unloaded` exactly once.
    ///
    /// The returned notice must be published after the caller released its
    /// lock on the registry.
    pub(crate) fn finish_load(
        &mut self,
        index: MetaIndex,
        outcome: std::result::Result<(), String>,
    ) -> Option<LoadNotice> {
        let meta = self.modules.get_mut(index.0)?;
        if meta.load_state != LoadState::Unloaded {
            return None;
        }

        let id = meta.id.clone();
        let outcome = match outcome {
            Ok(()) => {
                meta.load_state = LoadState::Loaded;
                debug!("Loaded module {}", id);
                Ok(events::ModuleLoaded { id })
            }
            Err(reason) => {
                meta.load_state = LoadState::Failed(reason.clone());
                Err(events::ModuleLoadFailed { id, reason })
            }
        };

        self.event_bus.clone().map(|bus| LoadNotice { bus, outcome })
    }

    /// Existing placeholder index for a declaration, or an error if the id
    /// is taken by a declared module or an alias
    fn check_declarable(&self, canonical: &str, kind: ModuleKind) -> Result<Option<MetaIndex>> {
        if self.aliases.contains_key(canonical) {
            return Err(VizError::DuplicateId(canonical.to_string()));
        }
        match self.by_id.get(canonical) {
            None => Ok(None),
            Some(&index) => {
                let meta = &self.modules[index.0];
                if meta.declared {
                    Err(VizError::DuplicateId(canonical.to_string()))
                } else if meta.kind() != kind {
                    Err(VizError::KindMismatch {
                        id: canonical.to_string(),
                        expected: kind,
                        actual: meta.kind(),
                    })
                } else {
                    Ok(Some(index))
                }
            }
        }
    }

    fn push(&mut self, id: String, kind: ModuleKind) -> MetaIndex {
        let index = MetaIndex(self.modules.len());
        self.modules.push(ModuleMeta::placeholder(index, id.clone(), kind));
        self.by_id.insert(id, index);
        index
    }

    fn publish<E: crate::events::Event>(&self, event: E) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl MetaResolver for ModuleRegistry {
    /// Only declared modules of the requested kind resolve
    fn resolve_meta(&self, id: &str, kind: ModuleKind) -> Result<MetaIndex> {
        let meta = self.get(id)?;
        if !meta.declared {
            return Err(VizError::NotFound(meta.id.clone()));
        }
        if meta.kind() != kind {
            return Err(VizError::KindMismatch {
                id: meta.id.clone(),
                expected: kind,
                actual: meta.kind(),
            });
        }
        Ok(meta.index)
    }
}

/// Breadth-first iterator over subtype ids.
///
/// Not restartable: it drains an internal queue. A revisited node yields
/// [`VizError::CyclicAncestry`] once and ends the iteration.
pub struct Subtypes<'a> {
    registry: &'a ModuleRegistry,
    queue: VecDeque<MetaIndex>,
    visited: AHashSet<MetaIndex>,
    transitive: bool,
    finished: bool,
}

impl<'a> Iterator for Subtypes<'a> {
    type Item = Result<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let Some(index) = self.queue.pop_front() else {
            self.finished = true;
            return None;
        };
        let meta = &self.registry.modules[index.0];

        if !self.visited.insert(index) {
            self.finished = true;
            return Some(Err(VizError::CyclicAncestry(meta.id.clone())));
        }

        if self.transitive {
            if let Some(type_meta) = meta.as_type() {
                self.queue.extend(type_meta.subtypes.iter().copied());
            }
        }

        Some(Ok(meta.id.as_str()))
    }
}
