//! The object API a foreign runtime must expose to `ForeignRef`.
//!
//! A runtime owns the lifetime of its objects; handles only contribute to
//! the reference count. Null pointers never reach a runtime: `ForeignRef`
//! filters them out, so every method here receives a `NonNull`.

use crate::error::Result;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::collections::hash_map::DefaultHasher;
use std::rc::Rc;

/// Reference counting and identity hashing for opaque foreign objects.
///
/// # Safety
///
/// Implementors guarantee that an object stays alive for as long as it has
/// at least one outstanding `incref` not yet matched by a `decref`, and that
/// `identity_hash` returns the same value for the same object for its whole
/// lifetime.
pub unsafe trait ForeignRuntime {
    /// The opaque object type. Handles never look inside it.
    type Object;

    /// Add one reference to `obj`.
    ///
    /// # Safety
    /// `obj` must point to a live object of this runtime.
    unsafe fn incref(obj: NonNull<Self::Object>);

    /// Drop one reference from `obj`. May destroy the object and run
    /// arbitrary foreign finalizers.
    ///
    /// # Safety
    /// `obj` must point to a live object and the caller must own the
    /// reference being released.
    unsafe fn decref(obj: NonNull<Self::Object>);

    /// Identity hash of `obj`, consistent with pointer identity.
    ///
    /// # Safety
    /// `obj` must point to a live object of this runtime.
    unsafe fn identity_hash(obj: NonNull<Self::Object>) -> Result<u64>;
}

/// Runtime backed by `std::rc::Rc` strong counts.
///
/// Lets native Rust values be tracked with the same handle type as objects
/// of a real foreign runtime. Increments and decrements go through the raw
/// pointer APIs of `Rc`, so a handle counts exactly like an `Rc` clone.
pub struct RcRuntime<T> {
    _pd: PhantomData<*const T>,
}

unsafe impl<T> ForeignRuntime for RcRuntime<T> {
    type Object = T;

    #[inline]
    unsafe fn incref(obj: NonNull<T>) {
        Rc::increment_strong_count(obj.as_ptr() as *const T);
    }

    #[inline]
    unsafe fn decref(obj: NonNull<T>) {
        Rc::decrement_strong_count(obj.as_ptr() as *const T);
    }

    unsafe fn identity_hash(obj: NonNull<T>) -> Result<u64> {
        // The address is fixed while any strong reference exists.
        let mut h = DefaultHasher::new();
        (obj.as_ptr() as usize).hash(&mut h);
        Ok(h.finish())
    }
}
