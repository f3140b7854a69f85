//! Registry notifications
//!
//! The registry publishes an event after every declaration and after every
//! load outcome. Handlers run on the publishing thread, in subscription
//! order. Load outcomes are published after the registry lock is released,
//! so a handler may read a shared registry.

use std::any::{Any, TypeId};

use ahash::AHashMap;
use parking_lot::Mutex;

/// Notification published by the registry
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Receiver of events of one type
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Registry events
pub mod events {
    use super::Event;

    /// A type was declared (or a placeholder type completed)
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TypeDeclared {
        pub id: String,
        pub ancestor: Option<String>,
        pub is_abstract: bool,
    }

    /// An instance was attached to its type
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct InstanceDeclared {
        pub id: String,
        pub type_id: String,
    }

    /// A backing implementation finished loading
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ModuleLoaded {
        pub id: String,
    }

    /// A backing implementation failed to load
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ModuleLoadFailed {
        pub id: String,
        pub reason: String,
    }

    macro_rules! registry_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    registry_event!(TypeDeclared, InstanceDeclared, ModuleLoaded, ModuleLoadFailed);
}

/// Handlers keyed by the event type they receive
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<AHashMap<TypeId, Vec<Box<dyn EventHandler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a type-erased handler to events of type `E`
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        self.handlers.lock().entry(TypeId::of::<E>()).or_default().push(handler);
    }

    /// Subscribe a closure receiving `E` directly
    pub fn on<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Whether any handler listens for `E`
    pub fn has_subscribers<E: Event>(&self) -> bool {
        self.handlers
            .lock()
            .get(&TypeId::of::<E>())
            .is_some_and(|handlers| !handlers.is_empty())
    }

    /// Publish an event to every handler subscribed to its type.
    ///
    /// Handlers must not subscribe or publish on the same bus.
    pub fn publish<E: Event>(&self, event: E) {
        let mut handlers = self.handlers.lock();
        if let Some(handlers) = handlers.get_mut(&TypeId::of::<E>()) {
            for handler in handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.lock();
        f.debug_struct("EventBus")
            .field("event_types", &handlers.len())
            .field("handlers", &handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

struct FnHandler<F>(F);

impl<F> EventHandler for FnHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.0)(event);
    }
}

/// Wrap a closure over type-erased events as a handler
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(FnHandler(f))
}
