//! Tail observer that registers listener components with the context.
//!
//! Installed last so that it sees fully constructed (possibly wrapped)
//! instances.

use crate::bootstrap::context::ListenerSet;
use crate::error::BootstrapResult;
use crate::extension::component::{Component, InstanceObserver};
use crate::logging::BootstrapLog;
use crate::registry::ComponentRegistry;
use std::rc::Rc;

pub struct ListenerDetector {
    listeners: Rc<ListenerSet>,
    log: BootstrapLog,
}

impl ListenerDetector {
    pub fn new(listeners: Rc<ListenerSet>, log: BootstrapLog) -> Self {
        Self { listeners, log }
    }
}

impl Component for ListenerDetector {
    fn type_name(&self) -> &str {
        "ListenerDetector"
    }

    fn as_instance_observer(&self) -> Option<&dyn InstanceObserver> {
        Some(self)
    }
}

impl InstanceObserver for ListenerDetector {
    fn after_init(
        &self,
        instance: Rc<dyn Component>,
        name: &str,
        _registry: &dyn ComponentRegistry,
    ) -> BootstrapResult<Rc<dyn Component>> {
        if instance.as_listener().is_some() && self.listeners.add(name, instance.clone()) {
            self.log.debug(format_args!(
                "event=listener_detected module=bootstrap name={} type={}",
                name,
                instance.type_name()
            ));
        }
        Ok(instance)
    }
}
