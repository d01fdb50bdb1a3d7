// Sole-owner handle over a heap allocation.
use crate::error::{HandleError, HandleKind};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Owns its value exclusively. Cannot be cloned; `move_out` transfers the
/// value into a fresh handle and leaves this one empty.
pub struct Exclusive<T> {
    ptr: Option<NonNull<T>>,
    _marker: PhantomData<T>,
}

impl<T> Exclusive<T> {
    pub fn new(value: T) -> Self {
        let raw = Box::into_raw(Box::new(value));
        Exclusive {
            // Box::into_raw never returns null
            ptr: NonNull::new(raw),
            _marker: PhantomData,
        }
    }

    pub fn empty() -> Self {
        Exclusive {
            ptr: None,
            _marker: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Transfers ownership into a new handle. `self` is empty afterwards.
    pub fn move_out(&mut self) -> Exclusive<T> {
        Exclusive {
            ptr: self.ptr.take(),
            _marker: PhantomData,
        }
    }

    pub fn get(&self) -> Result<&T, HandleError> {
        match self.ptr {
            Some(ptr) => Ok(unsafe { ptr.as_ref() }),
            None => Err(HandleError::null(HandleKind::Exclusive)),
        }
    }

    pub fn get_mut(&mut self) -> Result<&mut T, HandleError> {
        match self.ptr {
            Some(mut ptr) => Ok(unsafe { ptr.as_mut() }),
            None => Err(HandleError::null(HandleKind::Exclusive)),
        }
    }

    /// Destroys the owned value now, if any.
    pub fn reset(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            unsafe { drop(Box::from_raw(ptr.as_ptr())) };
        }
    }

    /// Installs a new value, returning the previous one.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let previous = self.take_value();
        *self = Exclusive::new(value);
        previous
    }

    pub fn into_inner(mut self) -> Result<T, HandleError> {
        self.take_value()
            .ok_or(HandleError::null(HandleKind::Exclusive))
    }

    fn take_value(&mut self) -> Option<T> {
        self.ptr
            .take()
            .map(|ptr| *unsafe { Box::from_raw(ptr.as_ptr()) })
    }
}

impl<T> Drop for Exclusive<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T> Default for Exclusive<T> {
    fn default() -> Self {
        Exclusive::empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Exclusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Ok(value) => f.debug_tuple("Exclusive").field(value).finish(),
            Err(_) => f.write_str("Exclusive(<empty>)"),
        }
    }
}

// Same rules as Box<T>: the handle is the only path to the value.
unsafe impl<T: Send> Send for Exclusive<T> {}
unsafe impl<T: Sync> Sync for Exclusive<T> {}
