//! foreign-ref: reference-counted opaque handles to objects owned by a
//! foreign runtime, usable as identity keys in native hash containers.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: let a native registry hold foreign listener objects as keys,
//!   find them again by identity, and erase them, without ever letting the
//!   foreign reference count drift.
//! - Layers:
//!   - ForeignRuntime: the three calls the handle needs from the host
//!     runtime (`incref`, `decref`, `identity_hash`). `RcRuntime<T>`
//!     implements it over `std::rc::Rc` strong counts.
//!   - ForeignRef<R>: nullable owning handle. One reference per live
//!     non-null copy; equality is pointer identity.
//!   - HashedRef<R>: a ForeignRef with its identity hash computed once,
//!     fallibly. This is the container key.
//!   - ListenerSet<R>: identity-keyed set with stable `ListenerId`s,
//!     removal by a fresh handle over the same object, and pruning.
//!
//! Refcount discipline
//! - Construction from a borrowed pointer and `clone` increment.
//! - `drop` decrements. `clone_from` acquires the source's object and then
//!   releases the previous one; plain assignment of a clone is equivalent.
//! - `from_owned_ptr`/`into_raw` transfer an existing reference without
//!   touching the count.
//! - Null handles never reach the runtime.
//!
//! Hashing
//! - `core::hash::Hash` cannot fail but a foreign identity hash can. The
//!   fallible call happens once, in `HashedRef::new` (or in a
//!   `ListenerSet` lookup), and its error propagates unchanged. No default
//!   hash is ever substituted.
//!
//! Reentrancy
//! - Hash functions and finalizers are foreign code and may call back in.
//!   `ListenerSet` hashes before touching its index and releases removed
//!   handles only after unlinking them. A debug-only check panics on
//!   nested structural sections.
//!
//! Constraints and non-goals
//! - Single-threaded: handles and sets are `!Send`/`!Sync`. Hosts with a
//!   global interpreter lock must hold it around every operation.
//! - No event dispatch; the set only stores and locates listeners.

pub mod error;
pub mod foreign_ref;
pub mod listener_set;
mod reentrancy;
pub mod runtime;

// Public surface
pub use error::{Error, Result};
pub use foreign_ref::{ForeignRef, HashedRef};
pub use listener_set::{ListenerId, ListenerSet};
pub use runtime::{ForeignRuntime, RcRuntime};
