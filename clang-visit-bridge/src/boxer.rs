//! Value boxer
//!
//! The wrapped library passes records such as cursors and types by value.
//! Callers on the other side of the boundary can only hold pointers, so every
//! record that crosses is copied into its own heap allocation and handed over
//! as an owning [`Boxed`] handle.
//!
//! Ownership rules:
//! - Each crossing allocates a fresh record; boxed records are never shared.
//! - Dropping a [`Boxed`] is the dispose operation: the record's release hook
//!   runs first (for kinds that own sub-resources such as string buffers),
//!   then the storage is freed.
//! - Once a handle leaves Rust through [`Boxed::into_raw`], the receiver owns
//!   it and must give it back through [`dispose_raw`] exactly once.
//!
//! Allocation failure is not recoverable here. `Box::new` diverts to the
//! global allocation error handler, which aborts the process, so a null
//! handle is never produced.

use std::fmt;
use std::ops::Deref;
use std::ptr::NonNull;

use crate::ledger;

/// A plain-data record the wrapped library passes by value
pub trait Record: Copy + 'static {
    /// Kind name used for accounting and logging
    const KIND: &'static str;

    /// Release resources owned by the record itself
    ///
    /// Called once, right before the boxed storage is freed. Kinds without
    /// sub-resources keep the default no-op.
    fn release(&mut self) {}
}

/// Exclusively owned heap copy of a by-value record
pub struct Boxed<T: Record> {
    ptr: NonNull<T>,
}

impl<T: Record> Boxed<T> {
    /// Copy a record onto the heap
    pub fn new(record: T) -> Self {
        let ptr = NonNull::from(Box::leak(Box::new(record)));
        ledger::note_boxed(T::KIND);
        Self { ptr }
    }

    /// Copy of the boxed record, as expected by the wrapped library's
    /// by-value entry points
    pub fn get(&self) -> T {
        // SAFETY: ptr came from Box::leak and is uniquely owned by self
        unsafe { *self.ptr.as_ptr() }
    }

    /// Borrow the storage without giving up ownership
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Hand ownership across the boundary
    ///
    /// The returned pointer must eventually reach [`dispose_raw`].
    pub fn into_raw(self) -> *mut T {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// Take back ownership of a pointer produced by [`Boxed::into_raw`]
    ///
    /// Returns `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or come from `Boxed::<T>::into_raw` and not have
    /// been reclaimed before.
    pub unsafe fn from_raw(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Release the record and free its storage
    pub fn dispose(self) {
        drop(self);
    }
}

impl<T: Record> Deref for Boxed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: see Boxed::get
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Record> Drop for Boxed<T> {
    fn drop(&mut self) {
        // SAFETY: ptr came from Box::leak and ownership ends here
        let mut record = unsafe { Box::from_raw(self.ptr.as_ptr()) };
        record.release();
        drop(record);
        ledger::note_disposed(T::KIND);
    }
}

impl<T: Record + fmt::Debug> fmt::Debug for Boxed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Boxed").field(&**self).finish()
    }
}

/// Dispose a record previously handed out with [`Boxed::into_raw`]
///
/// Null is ignored.
///
/// # Safety
/// Same contract as [`Boxed::from_raw`].
pub unsafe fn dispose_raw<T: Record>(ptr: *mut T) {
    if let Some(boxed) = Boxed::from_raw(ptr) {
        boxed.dispose();
    }
}
