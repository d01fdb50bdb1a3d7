//! Thread-safe counterparts of [`Shared`](crate::shared::Shared) and
//! [`Weak`](crate::shared::Weak).
//!
//! Counts live in `AtomicUsize`. Upgrading a weak handle is a
//! compare-and-increment loop, so a strong count that has reached zero is
//! never brought back.

use crate::error::{HandleError, HandleKind};
use std::fmt;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::sync::atomic::{self, AtomicUsize, Ordering};

struct SyncInner<T> {
    strong: AtomicUsize,
    // Includes one reference owned collectively by the strong handles.
    weak: AtomicUsize,
    value: ManuallyDrop<T>,
}

pub struct SyncShared<T> {
    ptr: Option<NonNull<SyncInner<T>>>,
    _marker: PhantomData<SyncInner<T>>,
}

unsafe impl<T: Send + Sync> Send for SyncShared<T> {}
unsafe impl<T: Send + Sync> Sync for SyncShared<T> {}

impl<T> SyncShared<T> {
    pub fn new(value: T) -> Self {
        let inner = Box::new(SyncInner {
            strong: AtomicUsize::new(1),
            weak: AtomicUsize::new(1),
            value: ManuallyDrop::new(value),
        });
        SyncShared {
            ptr: NonNull::new(Box::into_raw(inner)),
            _marker: PhantomData,
        }
    }

    pub fn empty() -> Self {
        SyncShared {
            ptr: None,
            _marker: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    fn inner(&self) -> Option<&SyncInner<T>> {
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    pub fn get(&self) -> Result<&T, HandleError> {
        self.inner()
            .map(|inner| &*inner.value)
            .ok_or(HandleError::null(HandleKind::Shared))
    }

    pub fn use_count(&self) -> usize {
        self.inner()
            .map_or(0, |inner| inner.strong.load(Ordering::Acquire))
    }

    pub fn weak_count(&self) -> usize {
        self.inner()
            .map_or(0, |inner| inner.weak.load(Ordering::Acquire) - 1)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self.ptr, other.ptr) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn downgrade(&self) -> SyncWeak<T> {
        match self.inner() {
            Some(inner) => {
                inner.weak.fetch_add(1, Ordering::Relaxed);
                SyncWeak {
                    ptr: self.ptr,
                    _marker: PhantomData,
                }
            }
            None => SyncWeak::new(),
        }
    }

    pub fn reset(&mut self) {
        let Some(ptr) = self.ptr.take() else {
            return;
        };
        unsafe {
            let inner = ptr.as_ptr();
            if (*inner).strong.fetch_sub(1, Ordering::Release) != 1 {
                return;
            }
            atomic::fence(Ordering::Acquire);
            log::trace!("sync shared: last strong handle released");
            ManuallyDrop::drop(&mut (*inner).value);
            release_weak(ptr);
        }
    }
}

/// # Safety
/// `ptr` must point to a live control block and the caller must own one of
/// its weak references.
unsafe fn release_weak<T>(ptr: NonNull<SyncInner<T>>) {
    let inner = ptr.as_ptr();
    if (*inner).weak.fetch_sub(1, Ordering::Release) == 1 {
        atomic::fence(Ordering::Acquire);
        drop(Box::from_raw(inner));
    }
}

impl<T> Clone for SyncShared<T> {
    fn clone(&self) -> Self {
        if let Some(inner) = self.inner() {
            inner.strong.fetch_add(1, Ordering::Relaxed);
        }
        SyncShared {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for SyncShared<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for SyncShared<T> {
    fn default() -> Self {
        SyncShared::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for SyncShared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(value) => f.debug_tuple("SyncShared").field(value).finish(),
            Err(_) => f.write_str("SyncShared(<empty>)"),
        }
    }
}

pub struct SyncWeak<T> {
    ptr: Option<NonNull<SyncInner<T>>>,
    _marker: PhantomData<SyncInner<T>>,
}

unsafe impl<T: Send + Sync> Send for SyncWeak<T> {}
unsafe impl<T: Send + Sync> Sync for SyncWeak<T> {}

impl<T> SyncWeak<T> {
    pub fn new() -> Self {
        SyncWeak {
            ptr: None,
            _marker: PhantomData,
        }
    }

    fn inner(&self) -> Option<&SyncInner<T>> {
        self.ptr.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Increments the strong count only if it is still non-zero.
    pub fn upgrade(&self) -> Option<SyncShared<T>> {
        let inner = self.inner()?;
        let mut current = inner.strong.load(Ordering::Relaxed);

        loop {
            if current == 0 {
                return None;
            }
            match inner.strong.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    return Some(SyncShared {
                        ptr: self.ptr,
                        _marker: PhantomData,
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn use_count(&self) -> usize {
        self.inner()
            .map_or(0, |inner| inner.strong.load(Ordering::Acquire))
    }

    pub fn expired(&self) -> bool {
        self.use_count() == 0
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, HandleError> {
        let shared = self
            .upgrade()
            .ok_or(HandleError::null(HandleKind::Weak))?;
        let value = shared.get()?;
        Ok(f(value))
    }
}

impl<T> Clone for SyncWeak<T> {
    fn clone(&self) -> Self {
        if let Some(inner) = self.inner() {
            inner.weak.fetch_add(1, Ordering::Relaxed);
        }
        SyncWeak {
            ptr: self.ptr,
            _marker: PhantomData,
        }
    }
}

impl<T> Drop for SyncWeak<T> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            unsafe { release_weak(ptr) };
        }
    }
}

impl<T> Default for SyncWeak<T> {
    fn default() -> Self {
        SyncWeak::new()
    }
}

impl<T> fmt::Debug for SyncWeak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncWeak")
            .field("use_count", &self.use_count())
            .finish()
    }
}
