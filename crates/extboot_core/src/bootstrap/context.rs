//! Container context: the listener set the tail observer feeds.

use crate::extension::component::{Component, ContainerEvent};
use crate::bootstrap::listener_detector::ListenerDetector;
use crate::logging::BootstrapLog;
use std::cell::RefCell;
use std::rc::Rc;

/// Listener components detected so far, in detection order.
#[derive(Default)]
pub struct ListenerSet {
    entries: RefCell<Vec<(String, Rc<dyn Component>)>>,
}

impl ListenerSet {
    /// Adds a listener; a name already present keeps its first position.
    pub fn add(&self, name: &str, instance: Rc<dyn Component>) -> bool {
        let mut entries = self.entries.borrow_mut();
        if entries.iter().any(|(existing, _)| existing == name) {
            return false;
        }
        entries.push((name.to_string(), instance));
        true
    }

    pub fn names(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn snapshot(&self) -> Vec<(String, Rc<dyn Component>)> {
        self.entries.borrow().clone()
    }
}

/// Surrounding container state handed to the observer phase.
pub struct ContainerContext {
    id: String,
    listeners: Rc<ListenerSet>,
    detector: Rc<ListenerDetector>,
    log: BootstrapLog,
}

impl ContainerContext {
    pub fn new(id: impl Into<String>, log: BootstrapLog) -> Self {
        let listeners = Rc::new(ListenerSet::default());
        let detector = Rc::new(ListenerDetector::new(listeners.clone(), log.clone()));
        Self {
            id: id.into(),
            listeners,
            detector,
            log,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The tail observer. Always the same instance for one context.
    pub fn listener_detector(&self) -> Rc<dyn Component> {
        self.detector.clone()
    }

    pub fn listeners(&self) -> &ListenerSet {
        &self.listeners
    }

    /// Delivers `event` to every detected listener in detection order.
    pub fn publish(&self, event: ContainerEvent) {
        let listeners = self.listeners.snapshot();
        self.log.debug(format_args!(
            "event=container_event module=bootstrap context={} kind={:?} listeners={}",
            self.id,
            event,
            listeners.len()
        ));
        for (_, instance) in listeners {
            if let Some(listener) = instance.as_listener() {
                listener.on_event(event);
            }
        }
    }
}
