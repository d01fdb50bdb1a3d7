use crate::sink::LifecycleSink;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A trivial heap payload whose construction and destruction are observable.
///
/// Creating one emits `"<name> Constructor"`; dropping it emits
/// `"<name> Destructor"`. Both go to the sink the resource was built with.
pub struct Resource {
    id: u64,
    name: String,
    sink: Arc<dyn LifecycleSink>,
}

impl Resource {
    pub fn new(name: impl Into<String>, sink: Arc<dyn LifecycleSink>) -> Self {
        let resource = Resource {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            sink,
        };
        resource.sink.emit(&format!("{} Constructor", resource.name));
        log::debug!("resource #{} ({}) constructed", resource.id, resource.name);
        resource
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn do_something(&self) {
        self.sink.emit("Doing something...");
    }

    pub fn report(&self, line: &str) {
        self.sink.emit(line);
    }
}

impl Drop for Resource {
    fn drop(&mut self) {
        self.sink.emit(&format!("{} Destructor", self.name));
        log::debug!("resource #{} ({}) destroyed", self.id, self.name);
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
