// Counting stand-in for a foreign object runtime.
//
// Objects live in a per-test `Heap` and start with one external reference
// (the "owner" outside any handle), so a balanced test ends with every
// object back at a count of 1. Runtime calls are tallied per thread.
#![allow(dead_code)]

use foreign_ref::{Error, ForeignRef, ForeignRuntime, Result};
use std::cell::Cell;
use std::ptr::NonNull;

#[derive(Copy, Clone, Debug)]
pub enum HashMode {
    /// Address-based identity hash.
    Identity,
    /// Every object with this mode reports the same value.
    Fixed(u64),
    /// The runtime refuses to hash the object.
    Unhashable,
}

pub struct MockObject {
    refs: Cell<usize>,
    collected: Cell<bool>,
    retired: Cell<bool>,
    hash: HashMode,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub incref: usize,
    pub decref: usize,
    pub hash: usize,
}

thread_local! {
    static CALLS: Cell<Calls> = Cell::new(Calls::default());
}

fn tally(f: impl FnOnce(&mut Calls)) {
    CALLS.with(|c| {
        let mut v = c.get();
        f(&mut v);
        c.set(v);
    });
}

pub fn calls() -> Calls {
    CALLS.with(|c| c.get())
}

pub struct MockRuntime;

unsafe impl ForeignRuntime for MockRuntime {
    type Object = MockObject;

    unsafe fn incref(obj: NonNull<MockObject>) {
        tally(|c| c.incref += 1);
        let o = obj.as_ref();
        assert!(!o.collected.get(), "incref on collected object");
        o.refs.set(o.refs.get() + 1);
    }

    unsafe fn decref(obj: NonNull<MockObject>) {
        tally(|c| c.decref += 1);
        let o = obj.as_ref();
        assert!(!o.collected.get(), "decref on collected object");
        let n = o.refs.get();
        assert!(n > 0, "refcount underflow");
        o.refs.set(n - 1);
        if n == 1 {
            o.collected.set(true);
        }
    }

    unsafe fn identity_hash(obj: NonNull<MockObject>) -> Result<u64> {
        tally(|c| c.hash += 1);
        match obj.as_ref().hash {
            HashMode::Identity => Ok(obj.as_ptr() as usize as u64),
            HashMode::Fixed(h) => Ok(h),
            HashMode::Unhashable => Err(Error::Unhashable("MockObject".into())),
        }
    }
}

pub type Handle = ForeignRef<MockRuntime>;

/// Owns mock objects for the duration of a test.
#[derive(Default)]
pub struct Heap {
    objects: Vec<Box<MockObject>>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, hash: HashMode) -> *mut MockObject {
        let mut b = Box::new(MockObject {
            refs: Cell::new(1),
            collected: Cell::new(false),
            retired: Cell::new(false),
            hash,
        });
        let p: *mut MockObject = &mut *b;
        self.objects.push(b);
        p
    }

    pub fn obj(&mut self) -> *mut MockObject {
        self.alloc(HashMode::Identity)
    }
}

pub fn refs(p: *mut MockObject) -> usize {
    unsafe { (*p).refs.get() }
}

pub fn is_collected(p: *mut MockObject) -> bool {
    unsafe { (*p).collected.get() }
}

/// Mark an object as a dead listener target.
pub fn retire(p: *mut MockObject) {
    unsafe { (*p).retired.set(true) }
}

pub fn is_retired(p: *mut MockObject) -> bool {
    !p.is_null() && unsafe { (*p).retired.get() }
}

/// A fresh handle over `p`; acquires one reference.
pub fn handle(p: *mut MockObject) -> Handle {
    unsafe { Handle::from_borrowed_ptr(p) }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
