//! Single-threaded shared ownership: `Shared<T>` co-owns a value through a
//! reference count, `Weak<T>` observes it without keeping it alive.
//!
//! Both point at one heap control block holding the strong count, the weak
//! count and the value. The value is dropped when the strong count reaches
//! zero; the block is freed once no weak observers remain either. While any
//! strong handle exists, the strong side as a whole holds one extra weak
//! reference, so a weak handle dropped from inside the value's destructor
//! can never free the block underneath it.

use crate::error::{HandleError, HandleKind};
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};

struct SharedInner<T> {
    strong: Cell<usize>,
    weak: Cell<usize>,
    value: ManuallyDrop<T>,
}

pub struct Shared<T> {
    ptr: Option<NonNull<SharedInner<T>>>,
    _marker: PhantomData<SharedInner<T>>,
}

impl<T> Shared<T> {
    /// Allocates the value with a strong count of 1.
    pub fn new(value: T) -> Self {
        let inner = Box::new(SharedInner {
            strong: Cell::new(1),
            weak: Cell::new(1),
            value: ManuallyDrop::new(value),
        });
        Shared {
            ptr: NonNull::new(Box::into_raw(inner)),
            _marker: PhantomData,
        }
    }

    pub fn empty() -> Self {
        Shared {
            ptr: None,
            _marker: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn get(&self) -> Result<&T, HandleError> {
        match self.ptr {
            Some(ptr) => Ok(unsafe { &*(*ptr.as_ptr()).value }),
            None => Err(HandleError::null(HandleKind::Shared)),
        }
    }

    /// Number of strong handles sharing the value; 0 for an empty handle.
    pub fn use_count(&self) -> usize {
        self.ptr
            .map_or(0, |ptr| unsafe { (*ptr.as_ptr()).strong.get() })
    }

    pub fn weak_count(&self) -> usize {
        self.ptr
            .map_or(0, |ptr| unsafe { (*ptr.as_ptr()).weak.get() - 1 })
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self.ptr, other.ptr) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Creates a non-owning observer. The strong count is unchanged.
    pub fn downgrade(&self) -> Weak<T> {
        match self.ptr {
            Some(ptr) => {
                let weak = unsafe { &(*ptr.as_ptr()).weak };
                weak.set(weak.get() + 1);
                Weak {
                    ptr: Some(ptr),
                    _marker: PhantomData,
                }
            }
            None => Weak::new(),
        }
    }

    /// Gives up this handle's share now. Destroys the value if this was the
    /// last strong handle.
    pub fn reset(&mut self) {
        let Some(ptr) = self.ptr.take() else {
            return;
        };
        unsafe {
            let inner = ptr.as_ptr();
            let strong = (*inner).strong.get() - 1;
            (*inner).strong.set(strong);
            log::trace!("shared release: strong count now {}", strong);

            if strong == 0 {
                ManuallyDrop::drop(&mut (*inner).value);
                release_weak(ptr);
            }
        }
    }

    /// Returns the value if this is the only strong handle, otherwise gives
    /// the handle back unchanged.
    pub fn try_unwrap(mut this: Self) -> Result<T, Self> {
        let Some(ptr) = this.ptr else {
            return Err(this);
        };
        unsafe {
            let inner = ptr.as_ptr();
            if (*inner).strong.get() != 1 {
                return Err(this);
            }
            this.ptr = None;
            (*inner).strong.set(0);
            let value = ptr::read(&*(*inner).value);
            release_weak(ptr);
            Ok(value)
        }
    }
}

/// Drops one weak reference and frees the block when it was the last one.
///
/// # Safety
/// `ptr` must point to a live control block and the caller must own one of
/// its weak references.
unsafe fn release_weak<T>(ptr: NonNull<SharedInner<T>>) {
    let inner = ptr.as_ptr();
    let weak = (*inner).weak.get() - 1;
    (*inner).weak.set(weak);
    if weak == 0 {
        log::trace!("control block freed");
        drop(Box::from_raw(inner));
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        if let Some(ptr) = self.ptr {
            let strong = unsafe { &(*ptr.as_ptr()).strong };
            strong.set(strong.get() + 1);
            log::trace!("shared copy: strong count now {}", strong.get());
        }
        Shared {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Shared::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(value) => f
                .debug_struct("Shared")
                .field("value", value)
                .field("use_count", &self.use_count())
                .finish(),
            Err(_) => f.write_str("Shared(<empty>)"),
        }
    }
}

/// Observes a `Shared` value without contributing to its strong count.
pub struct Weak<T> {
    ptr: Option<NonNull<SharedInner<T>>>,
    _marker: PhantomData<SharedInner<T>>,
}

impl<T> Weak<T> {
    /// An observer that was never attached; it is always expired.
    pub fn new() -> Self {
        Weak {
            ptr: None,
            _marker: PhantomData,
        }
    }

    /// Returns a new strong handle if the value is still alive.
    pub fn upgrade(&self) -> Option<Shared<T>> {
        let ptr = self.ptr?;
        let strong = unsafe { &(*ptr.as_ptr()).strong };
        if strong.get() == 0 {
            log::trace!("weak upgrade refused: value expired");
            return None;
        }
        strong.set(strong.get() + 1);
        log::trace!("weak upgrade: strong count now {}", strong.get());
        Some(Shared {
            ptr: Some(ptr),
            _marker: PhantomData,
        })
    }

    pub fn use_count(&self) -> usize {
        self.ptr
            .map_or(0, |ptr| unsafe { (*ptr.as_ptr()).strong.get() })
    }

    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    /// Runs `f` against the value through a temporary upgrade.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, HandleError> {
        let shared = self
            .upgrade()
            .ok_or(HandleError::null(HandleKind::Weak))?;
        let value = shared.get()?;
        Ok(f(value))
    }
}

impl<T> Clone for Weak<T> {
    fn clone(&self) -> Self {
        if let Some(ptr) = self.ptr {
            let weak = unsafe { &(*ptr.as_ptr()).weak };
            weak.set(weak.get() + 1);
        }
        Weak {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for Weak<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            unsafe { release_weak(ptr) };
        }
    }
}

impl<T> Default for Weak<T> {
    fn default() -> Self {
        Weak::new()
    }
}

impl<T> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weak")
            .field("use_count", &self.use_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Resource;
    use crate::sink::{LifecycleSink, RecordingSink};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn tracked(sink: &RecordingSink) -> Shared<Resource> {
        Shared::new(Resource::new("MyClass", Arc::new(sink.clone())))
    }

    #[test]
    fn test_shared_basic() {
        let shared = Shared::new(42);
        assert_eq!(*shared.get().unwrap(), 42);
        assert_eq!(shared.use_count(), 1);
        assert_eq!(shared.weak_count(), 0);
    }

    #[test]
    fn test_copy_then_drop_both() {
        let sink = RecordingSink::new();
        let a = tracked(&sink);
        let b = a.clone();
        assert_eq!(a.use_count(), 2);
        assert!(a.ptr_eq(&b));

        drop(a);
        assert_eq!(b.use_count(), 1);
        assert_eq!(sink.destroyed(), 0);

        drop(b);
        assert_eq!(sink.lines(), vec!["MyClass Constructor", "MyClass Destructor"]);
    }

    #[test]
    fn test_destroyed_only_by_last_of_many() {
        let sink = RecordingSink::new();
        let first = tracked(&sink);
        let mut copies: Vec<_> = (0..5).map(|_| first.clone()).collect();
        assert_eq!(first.use_count(), 6);
        drop(first);

        while let Some(copy) = copies.pop() {
            assert_eq!(sink.destroyed(), 0);
            assert_eq!(copy.use_count(), copies.len() + 1);
            drop(copy);
        }
        assert_eq!(sink.destroyed(), 1);
    }

    #[test]
    fn test_reset_decrements_and_empties() {
        let sink = RecordingSink::new();
        let mut a = tracked(&sink);
        let b = a.clone();

        a.reset();
        assert!(a.is_empty());
        assert_eq!(a.use_count(), 0);
        assert_eq!(b.use_count(), 1);
        assert_eq!(a.get().unwrap_err(), HandleError::null(HandleKind::Shared));

        a.reset();
        assert_eq!(b.use_count(), 1);
        assert_eq!(sink.destroyed(), 0);
    }

    #[test]
    fn test_copy_of_empty_is_empty() {
        let empty: Shared<i32> = Shared::empty();
        let copy = empty.clone();
        assert!(copy.is_empty());
        assert!(!copy.ptr_eq(&empty));
        assert!(empty.downgrade().upgrade().is_none());
    }

    #[test]
    fn test_downgrade_does_not_change_count() {
        let shared = Shared::new(String::from("data"));
        let weak = shared.downgrade();

        assert_eq!(shared.use_count(), 1);
        assert_eq!(shared.weak_count(), 1);
        assert_eq!(weak.use_count(), 1);
        assert!(!weak.expired());
    }

    #[test]
    fn test_upgrade_while_alive_increments() {
        let shared = Shared::new(7);
        let weak = shared.downgrade();

        let upgraded = weak.upgrade().unwrap();
        assert_eq!(*upgraded.get().unwrap(), 7);
        assert_eq!(shared.use_count(), 2);

        drop(upgraded);
        assert_eq!(shared.use_count(), 1);
    }

    #[test]
    fn test_upgrade_after_release_is_empty() {
        let sink = RecordingSink::new();
        let shared = tracked(&sink);
        let weak = shared.downgrade();

        drop(shared);
        assert_eq!(sink.destroyed(), 1);
        assert!(weak.expired());
        assert!(weak.upgrade().is_none());
        assert_eq!(
            weak.with(|r| r.id()).unwrap_err(),
            HandleError::null(HandleKind::Weak)
        );
    }

    #[test]
    fn test_weak_with_alive() {
        let shared = Shared::new(vec![1, 2, 3]);
        let weak = shared.downgrade();
        assert_eq!(weak.with(|v| v.len()), Ok(3));
        assert_eq!(shared.use_count(), 1);
    }

    #[test]
    fn test_unattached_weak() {
        let weak: Weak<i32> = Weak::new();
        assert!(weak.expired());
        assert!(weak.upgrade().is_none());
        let copy = weak.clone();
        assert_eq!(copy.use_count(), 0);
    }

    #[test]
    fn test_weak_counts() {
        let strong = Shared::new(100);
        let weak1 = strong.downgrade();
        let weak2 = weak1.clone();
        assert_eq!(strong.weak_count(), 2);

        drop(weak1);
        assert_eq!(strong.weak_count(), 1);
        drop(weak2);
        assert_eq!(strong.weak_count(), 0);
    }

    #[test]
    fn test_weak_outlives_value() {
        let sink = RecordingSink::new();
        let weak = {
            let shared = tracked(&sink);
            let w = shared.downgrade();
            let w2 = w.clone();
            drop(w);
            w2
        };
        assert_eq!(sink.destroyed(), 1);
        assert_eq!(weak.use_count(), 0);
        drop(weak);
        assert_eq!(sink.destroyed(), 1);
    }

    #[test]
    fn test_try_unwrap() {
        let shared = Shared::new(String::from("only"));
        let weak = shared.downgrade();
        assert_eq!(Shared::try_unwrap(shared).unwrap(), "only");
        assert!(weak.upgrade().is_none());

        let a = Shared::new(1);
        let b = a.clone();
        let a = Shared::try_unwrap(a).unwrap_err();
        assert_eq!(a.use_count(), 2);
        drop(b);
        assert_eq!(Shared::try_unwrap(a).unwrap(), 1);
    }

    #[test]
    fn test_self_referencing_value_is_dropped() {
        struct Node {
            parent: RefCell<Weak<Node>>,
            sink: RecordingSink,
        }

        impl Drop for Node {
            fn drop(&mut self) {
                self.sink.emit("Node Destructor");
            }
        }

        let sink = RecordingSink::new();
        let node = Shared::new(Node {
            parent: RefCell::new(Weak::new()),
            sink: sink.clone(),
        });
        *node.get().unwrap().parent.borrow_mut() = node.downgrade();
        assert_eq!(node.weak_count(), 1);

        drop(node);
        assert_eq!(sink.destroyed(), 1);
    }

    #[test]
    fn test_drop_behavior() {
        let drops = Rc::new(Cell::new(0));

        struct DropCounter(Rc<Cell<usize>>);

        impl Drop for DropCounter {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        {
            let rc1 = Shared::new(DropCounter(drops.clone()));
            let rc2 = rc1.clone();
            let weak = rc1.downgrade();
            let rc3 = weak.upgrade().unwrap();

            drop(rc1);
            drop(rc2);
            assert_eq!(drops.get(), 0);
            drop(rc3);
            assert_eq!(drops.get(), 1);
        }

        assert_eq!(drops.get(), 1);
    }
}
