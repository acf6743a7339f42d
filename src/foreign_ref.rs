//! ForeignRef: an owning, nullable handle to an object of a foreign runtime.
//!
//! Every live non-null handle holds exactly one reference on its object:
//! construction and `clone` acquire it, `drop` and overwriting release it.
//! Equality is pointer identity; hashing delegates to the runtime's
//! identity hash and may fail, so it is exposed as `try_hash` rather than
//! through `core::hash::Hash`. `HashedRef` pairs a handle with its hash,
//! computed once, and is the type to use as a container key.

use crate::error::Result;
use crate::runtime::{ForeignRuntime, RcRuntime};
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use std::rc::Rc;

/// Owning handle to a foreign object, or null.
pub struct ForeignRef<R: ForeignRuntime> {
    ptr: Option<NonNull<R::Object>>,
    // !Send + !Sync: the runtime's refcount is not synchronized.
    _nosend: PhantomData<*mut ()>,
}

impl<R: ForeignRuntime> ForeignRef<R> {
    /// A handle that refers to nothing. Touches no refcount.
    #[inline]
    pub const fn null() -> Self {
        Self {
            ptr: None,
            _nosend: PhantomData,
        }
    }

    /// Wrap `ptr`, acquiring a new reference if it is non-null.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live object of runtime `R`.
    pub unsafe fn from_borrowed_ptr(ptr: *mut R::Object) -> Self {
        let ptr = NonNull::new(ptr);
        if let Some(p) = ptr {
            R::incref(p);
        }
        Self {
            ptr,
            _nosend: PhantomData,
        }
    }

    /// Adopt a reference the caller already owns; no increment.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live object of runtime `R`, and the
    /// caller must transfer ownership of one reference to the handle.
    pub unsafe fn from_owned_ptr(ptr: *mut R::Object) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            _nosend: PhantomData,
        }
    }

    /// The wrapped identity, for calling into the foreign runtime.
    /// Null for a null handle. The handle keeps its reference.
    #[inline]
    pub fn as_ptr(&self) -> *mut R::Object {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// Hand the reference back to the caller as a raw pointer; no decrement.
    pub fn into_raw(self) -> *mut R::Object {
        let p = self.as_ptr();
        core::mem::forget(self);
        p
    }

    /// Move the identity out, leaving this handle null.
    pub fn take(&mut self) -> Self {
        Self {
            ptr: self.ptr.take(),
            _nosend: PhantomData,
        }
    }

    /// Identity hash from the foreign runtime. Null hashes to `0` without
    /// calling the runtime. Runtime failures are returned unchanged.
    pub fn try_hash(&self) -> Result<u64> {
        match self.ptr {
            None => Ok(0),
            // Safety: a non-null handle holds a reference, so the object is live.
            Some(p) => unsafe { R::identity_hash(p) },
        }
    }
}

impl<R: ForeignRuntime> Default for ForeignRef<R> {
    fn default() -> Self {
        Self::null()
    }
}

impl<R: ForeignRuntime> Clone for ForeignRef<R> {
    fn clone(&self) -> Self {
        if let Some(p) = self.ptr {
            unsafe { R::incref(p) };
        }
        Self {
            ptr: self.ptr,
            _nosend: PhantomData,
        }
    }

    /// Assignment: acquire `source`'s identity, then release the old one.
    /// Net effect is one increment on the new object and one decrement on
    /// the old one.
    fn clone_from(&mut self, source: &Self) {
        if let Some(p) = source.ptr {
            unsafe { R::incref(p) };
        }
        let old = core::mem::replace(&mut self.ptr, source.ptr);
        if let Some(p) = old {
            unsafe { R::decref(p) };
        }
    }
}

impl<R: ForeignRuntime> Drop for ForeignRef<R> {
    fn drop(&mut self) {
        if let Some(p) = self.ptr.take() {
            unsafe { R::decref(p) };
        }
    }
}

impl<R: ForeignRuntime> PartialEq for ForeignRef<R> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<R: ForeignRuntime> Eq for ForeignRef<R> {}

impl<R: ForeignRuntime> fmt::Debug for ForeignRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ForeignRef").field(&self.as_ptr()).finish()
    }
}

impl<T> ForeignRef<RcRuntime<T>> {
    /// Track a native `Rc` value; counts as one more strong reference.
    pub fn from_rc(rc: &Rc<T>) -> Self {
        unsafe { Self::from_borrowed_ptr(Rc::as_ptr(rc) as *mut T) }
    }

    /// Recover an `Rc` for the wrapped value, e.g. to invoke a listener.
    pub fn to_rc(&self) -> Option<Rc<T>> {
        let p = self.ptr?;
        unsafe {
            Rc::increment_strong_count(p.as_ptr() as *const T);
            Some(Rc::from_raw(p.as_ptr() as *const T))
        }
    }
}

impl<T> From<Rc<T>> for ForeignRef<RcRuntime<T>> {
    fn from(rc: Rc<T>) -> Self {
        unsafe { Self::from_owned_ptr(Rc::into_raw(rc) as *mut T) }
    }
}

/// A `ForeignRef` with its identity hash computed once.
///
/// Hashing a foreign object can fail, and `Hash` cannot report failure, so
/// the hash is taken fallibly at construction and replayed afterwards. The
/// runtime is never asked again for the same key.
pub struct HashedRef<R: ForeignRuntime> {
    inner: ForeignRef<R>,
    hash: u64,
}

impl<R: ForeignRuntime> HashedRef<R> {
    /// Hash `inner` through its runtime. On failure the handle is dropped,
    /// releasing its reference, and the runtime error is returned.
    pub fn new(inner: ForeignRef<R>) -> Result<Self> {
        let hash = inner.try_hash()?;
        Ok(Self { inner, hash })
    }

    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn as_foreign_ref(&self) -> &ForeignRef<R> {
        &self.inner
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut R::Object {
        self.inner.as_ptr()
    }

    pub fn into_inner(self) -> ForeignRef<R> {
        self.inner
    }
}

impl<R: ForeignRuntime> Clone for HashedRef<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            hash: self.hash,
        }
    }
}

impl<R: ForeignRuntime> PartialEq for HashedRef<R> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<R: ForeignRuntime> Eq for HashedRef<R> {}

impl<R: ForeignRuntime> Hash for HashedRef<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl<R: ForeignRuntime> fmt::Debug for HashedRef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedRef")
            .field("ptr", &self.inner.as_ptr())
            .field("hash", &self.hash)
            .finish()
    }
}
