// The three ownership walkthroughs, replayed against any sink.
use crate::error::HandleError;
use crate::exclusive::Exclusive;
use crate::resource::Resource;
use crate::shared::{Shared, Weak};
use crate::sink::LifecycleSink;
use std::sync::Arc;

/// Two exclusively owned entities live inside a scope; one is handed over
/// to a new owner. Both are destroyed when the scope ends.
pub fn run_exclusive(sink: Arc<dyn LifecycleSink>, name: &str) -> Result<(), HandleError> {
    {
        let entity = Exclusive::new(Resource::new(name, sink.clone()));
        let mut entity1 = Exclusive::new(Resource::new(name, sink.clone()));
        let number = Exclusive::new(10);

        entity.get()?.report(&format!("Holding number {}", number.get()?));

        let new_owner = entity1.move_out();
        new_owner.get()?.do_something();
        if let Err(err) = entity1.get() {
            sink.emit(&format!("Moved-from handle: {}", err));
        }
    }
    sink.emit("Entities released");
    Ok(())
}

/// Two shared handles on one object; the object outlives the first release.
pub fn run_shared(sink: Arc<dyn LifecycleSink>, name: &str) -> Result<(), HandleError> {
    let ptr1 = Shared::new(Resource::new(name, sink.clone()));
    let ptr2 = ptr1.clone();

    ptr1.get()?.do_something();
    ptr2.get()?.do_something();
    sink.emit(&format!("Use count: {}", ptr1.use_count()));

    drop(ptr1);
    sink.emit(&format!("Use count after first release: {}", ptr2.use_count()));
    Ok(())
}

/// A weak observer checks the object before and after its owner goes away.
pub fn run_weak(sink: Arc<dyn LifecycleSink>, name: &str) -> Result<(), HandleError> {
    let shared = Shared::new(Resource::new(name, sink.clone()));
    let weak = shared.downgrade();

    report_liveness(&weak, sink.as_ref());
    drop(shared);
    report_liveness(&weak, sink.as_ref());
    Ok(())
}

fn report_liveness(weak: &Weak<Resource>, sink: &dyn LifecycleSink) {
    match weak.upgrade() {
        Some(_) => sink.emit("Object is alive"),
        None => sink.emit("Object is expired"),
    }
}
