//! Per-component event-processor registry.
//!
//! Handlers are stored by exact [`EventKind`] and looked up with fallback
//! through [`EventKind::ancestry`], so a handler registered for
//! `EventKind::Mouse` also sees `MouseMove`, `MouseButton` and `MouseScroll`
//! unless a more specific handler exists.

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::ComponentBase;
use crate::event::{EventKind, EventRef};

/// A handler: returns the input event to let it propagate, `None` when it
/// is fully consumed, or a different event to replace it.
pub type Processor<C> =
    Box<dyn Fn(&mut C, &ComponentBase, &EventRef) -> Option<EventRef> + Send + Sync>;

/// Event-kind -> handler map for one component of type `C`.
pub struct ProcessorRegistry<C> {
    handlers: HashMap<EventKind, Processor<C>>,
}

impl<C> std::fmt::Debug for ProcessorRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<C> Default for ProcessorRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ProcessorRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` for exactly `kind`.  Last write wins.
    pub fn register<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&mut C, &ComponentBase, &EventRef) -> Option<EventRef> + Send + Sync + 'static,
    {
        if self.handlers.insert(kind.clone(), Box::new(handler)).is_some() {
            log::debug!("processor for {kind:?} replaced");
        }
    }

    /// The kind whose handler would serve `kind`, walking ancestors up to
    /// the `Event` base.
    pub fn resolve(&self, kind: &EventKind) -> Option<EventKind> {
        kind.ancestry().find(|k| self.handlers.contains_key(k))
    }

    /// Handler for `kind` with ancestor fallback.
    pub fn get(&self, kind: &EventKind) -> Option<&Processor<C>> {
        kind.ancestry().find_map(|k| self.handlers.get(&k))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// How a processor call left the event.
#[derive(Debug, Clone)]
pub enum Disposition {
    /// The same event came back: keep propagating.
    Propagate,
    /// Nothing came back: fully consumed.
    Consumed,
    /// A different event came back: consumed, and the new event is emitted.
    Replaced(EventRef),
}

impl Disposition {
    pub fn classify(input: &EventRef, output: Option<EventRef>) -> Self {
        match output {
            None => Disposition::Consumed,
            Some(out) if Arc::ptr_eq(input, &out) => Disposition::Propagate,
            Some(out) => Disposition::Replaced(out),
        }
    }

    pub fn is_consumed(&self) -> bool {
        !matches!(self, Disposition::Propagate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::window::Window;

    struct Counter(u32);

    #[test]
    fn test_exact_kind_wins_over_ancestor() {
        let mut reg = ProcessorRegistry::<Counter>::new();
        reg.register(EventKind::Mouse, |_, _, e| Some(e.clone()));
        reg.register(EventKind::MouseMove, |_, _, _| None);
        assert_eq!(reg.resolve(&EventKind::MouseMove), Some(EventKind::MouseMove));
        assert_eq!(reg.resolve(&EventKind::MouseButton), Some(EventKind::Mouse));
        assert_eq!(reg.resolve(&EventKind::KeyPress), None);
    }

    #[test]
    fn test_base_handler_is_catch_all() {
        let mut reg = ProcessorRegistry::<Counter>::new();
        reg.register(EventKind::Event, |_, _, _| None);
        assert_eq!(reg.resolve(&EventKind::custom("ping")), Some(EventKind::Event));
        assert_eq!(reg.resolve(&EventKind::GamepadAxis), Some(EventKind::Event));
    }

    #[test]
    fn test_last_write_wins() {
        let mut reg = ProcessorRegistry::<Counter>::new();
        reg.register(EventKind::Char, |c, _, _| {
            c.0 += 1;
            None
        });
        reg.register(EventKind::Char, |c, _, _| {
            c.0 += 10;
            None
        });
        assert_eq!(reg.len(), 1);

        let base = ComponentBase::new(Window::headless(10.0, 10.0));
        let mut counter = Counter(0);
        let ev = Event::Char { ch: 'a' }.shared();
        let handler = reg.get(&EventKind::Char).unwrap();
        assert!(handler(&mut counter, &base, &ev).is_none());
        assert_eq!(counter.0, 10);
    }

    #[test]
    fn test_classify_by_identity() {
        let ping = Event::custom("ping").shared();
        let twin = Event::custom("ping").shared();
        assert!(matches!(
            Disposition::classify(&ping, Some(ping.clone())),
            Disposition::Propagate
        ));
        assert!(matches!(Disposition::classify(&ping, None), Disposition::Consumed));
        let replaced = Disposition::classify(&ping, Some(twin));
        assert!(replaced.is_consumed());
        assert!(matches!(replaced, Disposition::Replaced(_)));
    }
}
