//! ListenerSet: identity-keyed set of foreign listeners with stable ids.
//!
//! Each stored listener holds one reference on its foreign object. Entries
//! live in a generational `SlotMap` and are indexed by their cached identity
//! hash in a `HashTable`, so the runtime's hash function runs once per
//! insertion or lookup and never while the index is being modified.
//! Releasing a reference can run foreign finalizers; removed handles are
//! therefore dropped only after the structure is consistent again.

use crate::error::{Error, Result};
use crate::foreign_ref::{ForeignRef, HashedRef};
use crate::reentrancy::ReentrancyCheck;
use crate::runtime::ForeignRuntime;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};

/// Stable id of a stored listener. Ids of removed listeners never resolve
/// again, even if their slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ListenerId(DefaultKey);

pub struct ListenerSet<R: ForeignRuntime> {
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, HashedRef<R>>,
    busy: ReentrancyCheck,
}

impl<R: ForeignRuntime> Default for ListenerSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over stored listeners.
pub struct Iter<'a, R: ForeignRuntime> {
    it: slotmap::basic::Iter<'a, DefaultKey, HashedRef<R>>,
}

impl<'a, R: ForeignRuntime> Iterator for Iter<'a, R> {
    type Item = (ListenerId, &'a ForeignRef<R>);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it
            .next()
            .map(|(k, e)| (ListenerId(k), e.as_foreign_ref()))
    }
}

impl<R: ForeignRuntime> ListenerSet<R> {
    pub fn new() -> Self {
        Self {
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            busy: ReentrancyCheck::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store `listener`, taking over its reference.
    ///
    /// Fails with `NullListener` for a null handle, `Unhashable` when the
    /// runtime cannot hash the object and `DuplicateListener` when the
    /// identity is already present. On failure the handle is released.
    pub fn insert(&mut self, listener: ForeignRef<R>) -> Result<ListenerId> {
        if listener.is_null() {
            return Err(Error::NullListener);
        }
        let key = match HashedRef::new(listener) {
            Ok(k) => k,
            Err(e) => {
                log::debug!("rejecting listener: {e}");
                return Err(e);
            }
        };
        self.insert_hashed(key)
    }

    /// Store an already hashed listener.
    pub fn insert_hashed(&mut self, key: HashedRef<R>) -> Result<ListenerId> {
        if key.as_foreign_ref().is_null() {
            return Err(Error::NullListener);
        }
        let ptr = key.as_ptr();
        let res = {
            let _g = self.busy.enter("insert");
            let hash = key.hash_value();
            match self.index.entry(
                hash,
                |&k| self.slots.get(k).map(|e| *e == key).unwrap_or(false),
                |&k| self.slots.get(k).map(|e| e.hash_value()).unwrap_or(0),
            ) {
                hashbrown::hash_table::Entry::Occupied(_) => Err(key),
                hashbrown::hash_table::Entry::Vacant(v) => {
                    let k = self.slots.insert(key);
                    let _ = v.insert(k);
                    Ok(ListenerId(k))
                }
            }
        };
        match res {
            Ok(id) => {
                log::trace!("listener {ptr:p} stored as {id:?}");
                Ok(id)
            }
            // The rejected duplicate is released here, outside the section.
            Err(dup) => {
                drop(dup);
                Err(Error::DuplicateListener)
            }
        }
    }

    /// Locate a listener by identity. A null handle is never present.
    pub fn find(&self, listener: &ForeignRef<R>) -> Result<Option<ListenerId>> {
        if listener.is_null() {
            return Ok(None);
        }
        let hash = listener.try_hash()?;
        let _g = self.busy.enter("find");
        Ok(self
            .index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.as_foreign_ref() == listener)
                    .unwrap_or(false)
            })
            .map(|&k| ListenerId(k)))
    }

    pub fn contains(&self, listener: &ForeignRef<R>) -> Result<bool> {
        Ok(self.find(listener)?.is_some())
    }

    pub fn get(&self, id: ListenerId) -> Option<&ForeignRef<R>> {
        self.slots.get(id.0).map(HashedRef::as_foreign_ref)
    }

    /// Unlink the listener with `id` and hand its reference to the caller.
    pub fn remove_id(&mut self, id: ListenerId) -> Option<ForeignRef<R>> {
        let entry = {
            let _g = self.busy.enter("remove");
            let entry = self.slots.remove(id.0)?;
            self.index
                .find_entry(entry.hash_value(), |&k| k == id.0)
                .expect("stored listener must be indexed")
                .remove();
            entry
        };
        log::trace!("listener {:p} removed from {id:?}", entry.as_ptr());
        Some(entry.into_inner())
    }

    /// Remove the listener with the same identity as `listener` (typically
    /// a fresh handle over the same object) and return the stored handle.
    pub fn remove(&mut self, listener: &ForeignRef<R>) -> Result<Option<ForeignRef<R>>> {
        Ok(self.find(listener)?.and_then(|id| self.remove_id(id)))
    }

    /// Keep only listeners for which `keep` returns true; returns how many
    /// were removed. Used to prune listeners whose targets have died.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&ForeignRef<R>) -> bool,
    {
        let total = self.slots.len();
        let doomed: Vec<DefaultKey> = self
            .slots
            .iter()
            .filter(|(_, e)| !keep(e.as_foreign_ref()))
            .map(|(k, _)| k)
            .collect();
        let removed: Vec<ForeignRef<R>> = doomed
            .into_iter()
            .filter_map(|k| self.remove_id(ListenerId(k)))
            .collect();
        let n = removed.len();
        if n > 0 {
            log::debug!("pruned {n} of {total} listeners");
        }
        drop(removed);
        n
    }

    /// Remove every listener, releasing their references.
    pub fn clear(&mut self) {
        let drained: Vec<HashedRef<R>> = {
            let _g = self.busy.enter("clear");
            self.index.clear();
            self.slots.drain().map(|(_, e)| e).collect()
        };
        drop(drained);
    }

    pub fn iter(&self) -> Iter<'_, R> {
        Iter {
            it: self.slots.iter(),
        }
    }
}
