//! Lazy loading of backing implementations

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{Result, VizError};

use super::meta::ModuleKind;
use super::registry::{LoadStep, ModuleRegistry};

/// Registry handle shared between the declaring code and its readers
pub type SharedRegistry = Arc<RwLock<ModuleRegistry>>;

/// Wrap a registry for sharing
pub fn shared(registry: ModuleRegistry) -> SharedRegistry {
    Arc::new(RwLock::new(registry))
}

/// Resolves the backing implementation of a module
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, id: &str, kind: ModuleKind) -> Result<()>;
}

/// Loader for registries with no implementation source
pub struct UnavailableLoader;

#[async_trait]
impl ModuleLoader for UnavailableLoader {
    async fn load(&self, id: &str, kind: ModuleKind) -> Result<()> {
        Err(VizError::NotImplemented(format!("no loader for {} '{}'", kind, id)))
    }
}

/// Make sure the implementation of `id` is loaded.
///
/// Loaded and abstract modules return immediately. Otherwise the registry
/// lock is released while `loader` runs. A failure is recorded: the module
/// stays unloaded and later calls fail with the same reason without
/// invoking the loader again. The outcome event is published after the
/// write lock is released.
pub async fn load_module(registry: &SharedRegistry, id: &str, loader: &dyn ModuleLoader) -> Result<()> {
    let step = registry.read().load_step(id)?;

    let (index, id, kind) = match step {
        LoadStep::Done => return Ok(()),
        LoadStep::Failed(reason) => {
            return Err(VizError::LoadFailed {
                id: id.to_string(),
                reason,
            })
        }
        LoadStep::Needed { index, id, kind } => (index, id, kind),
    };

    debug!("Loading {} {}", kind, id);
    let outcome = loader.load(&id, kind).await;

    let (notice, result) = match outcome {
        Ok(()) => (registry.write().finish_load(index, Ok(())), Ok(())),
        Err(error) => {
            let reason = error.to_string();
            warn!("Loading {} failed: {}", id, reason);
            let notice = registry.write().finish_load(index, Err(reason.clone()));
            (notice, Err(VizError::LoadFailed { id, reason }))
        }
    };

    if let Some(notice) = notice {
        notice.publish();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::TypeSpec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl ModuleLoader for CountingLoader {
        async fn load(&self, id: &str, _kind: ModuleKind) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                Err(VizError::NotFound(id.to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn registry() -> SharedRegistry {
        let mut registry = ModuleRegistry::new();
        registry.declare_type("viz/model", &TypeSpec::default().abstract_type()).unwrap();
        registry.declare_type("viz/models/bar", &TypeSpec::derived("viz/model")).unwrap();
        shared(registry)
    }

    #[tokio::test]
    async fn test_load_marks_loaded_once() {
        let registry = registry();
        let loader = CountingLoader { calls: AtomicUsize::new(0), fail: false };

        load_module(&registry, "viz/models/bar", &loader).await.unwrap();
        load_module(&registry, "viz/models/bar", &loader).await.unwrap();

        assert!(registry.read().get("viz/models/bar").unwrap().is_loaded());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abstract_type_skips_loader() {
        let registry = registry();
        load_module(&registry, "viz/model", &UnavailableLoader).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_load_is_not_retried() {
        let registry = registry();
        let loader = CountingLoader { calls: AtomicUsize::new(0), fail: true };

        let first = load_module(&registry, "viz/models/bar", &loader).await;
        let second = load_module(&registry, "viz/models/bar", &loader).await;

        assert!(matches!(first, Err(VizError::LoadFailed { .. })));
        assert!(matches!(second, Err(VizError::LoadFailed { .. })));
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(!registry.read().get("viz/models/bar").unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_load_handlers_can_read_registry() {
        use crate::events::{events, EventBus};
        use std::sync::OnceLock;

        let bus = Arc::new(EventBus::new());
        let slot: Arc<OnceLock<SharedRegistry>> = Arc::new(OnceLock::new());
        let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));

        // Loaded state as seen from inside a handler; None when the lock is held
        fn observe(slot: &OnceLock<SharedRegistry>, id: &str) -> Option<Option<bool>> {
            let guard = slot.get()?.try_read()?;
            Some(guard.get(id).ok().map(|meta| meta.is_loaded()))
        }

        let (handle, sink) = (slot.clone(), observed.clone());
        bus.on(move |loaded: &events::ModuleLoaded| {
            sink.lock().push((loaded.id.clone(), observe(&handle, &loaded.id)));
        });
        let (handle, sink) = (slot.clone(), observed.clone());
        bus.on(move |failed: &events::ModuleLoadFailed| {
            sink.lock().push((failed.id.clone(), observe(&handle, &failed.id)));
        });

        let mut registry = ModuleRegistry::with_event_bus(bus);
        registry.declare_type("viz/model", &TypeSpec::default()).unwrap();
        registry.declare_type("viz/models/bar", &TypeSpec::derived("viz/model")).unwrap();
        let registry = shared(registry);
        assert!(slot.set(registry.clone()).is_ok());

        let loader = CountingLoader { calls: AtomicUsize::new(0), fail: false };
        load_module(&registry, "viz/model", &loader).await.unwrap();
        let failing = CountingLoader { calls: AtomicUsize::new(0), fail: true };
        assert!(load_module(&registry, "viz/models/bar", &failing).await.is_err());

        assert_eq!(
            *observed.lock(),
            vec![
                ("viz/model".to_string(), Some(Some(true))),
                ("viz/models/bar".to_string(), Some(Some(false))),
            ]
        );
    }

    #[tokio::test]
    async fn test_unavailable_loader() {
        let registry = registry();
        let err = load_module(&registry, "viz/models/bar", &UnavailableLoader)
            .await
            .unwrap_err();
        match err {
            VizError::LoadFailed { reason, .. } => assert!(reason.contains("Not implemented")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
