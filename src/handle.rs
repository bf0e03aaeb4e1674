//! Typed handles - explicit ownership of engine objects
//!
//! A [`HandleRegistry`] owns every object it issues a [`Handle`] for. The
//! handle is a move-only token: [`HandleRegistry::destroy`] consumes it, so
//! a second destroy of the same handle does not compile.
//!
//! ```compile_fail
//! use oscnet::HandleRegistry;
//!
//! let mut registry = HandleRegistry::new();
//! let handle = registry.create(1u32);
//! registry.destroy(handle).unwrap();
//! registry.destroy(handle).unwrap();
//! ```
//!
//! Slots are reused with a bumped generation, and every registry carries
//! its own id, so a handle presented to the wrong registry or to a reused
//! slot is reported as [`SyncError::StaleHandle`] instead of aliasing
//! another object. The created / destroyed counters are the allocation
//! ledger used to check that a caller released everything it created.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{SyncError, SyncResult};

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(0);

/// Opaque token for an object owned by a [`HandleRegistry`].
pub struct Handle<T> {
    registry: u64,
    slot: usize,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Slot index inside the issuing registry.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Generation of the slot when the handle was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn stale(&self) -> SyncError {
        SyncError::StaleHandle {
            slot: self.slot,
            generation: self.generation,
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.registry == other.registry && self.slot == other.slot && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.registry.hash(state);
        self.slot.hash(state);
        self.generation.hash(state);
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Owner of handle-addressed objects.
pub struct HandleRegistry<T> {
    id: u64,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    created: u64,
    destroyed: u64,
}

impl<T> HandleRegistry<T> {
    pub fn new() -> Self {
        Self {
            id: NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free: Vec::new(),
            created: 0,
            destroyed: 0,
        }
    }

    /// Take ownership of `value` and issue its handle.
    pub fn create(&mut self, value: T) -> Handle<T> {
        self.created += 1;
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].value = Some(value);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                self.slots.len() - 1
            }
        };

        Handle {
            registry: self.id,
            slot,
            generation: self.slots[slot].generation,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, handle: &Handle<T>) -> SyncResult<&T> {
        if handle.registry != self.id {
            return Err(handle.stale());
        }
        self.slots
            .get(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| handle.stale())
    }

    pub fn get_mut(&mut self, handle: &Handle<T>) -> SyncResult<&mut T> {
        if handle.registry != self.id {
            return Err(handle.stale());
        }
        self.slots
            .get_mut(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
            .ok_or_else(|| handle.stale())
    }

    /// Release the object behind `handle` and hand it back to the caller.
    pub fn destroy(&mut self, handle: Handle<T>) -> SyncResult<T> {
        if handle.registry != self.id {
            return Err(handle.stale());
        }
        let slot = self
            .slots
            .get_mut(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or_else(|| handle.stale())?;
        let value = slot.value.take().ok_or_else(|| handle.stale())?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.slot);
        self.destroyed += 1;
        Ok(value)
    }

    /// Objects created and not yet destroyed.
    pub fn live(&self) -> u64 {
        self.created - self.destroyed
    }

    /// Objects created over the registry's lifetime.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Objects destroyed over the registry's lifetime.
    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    pub fn is_empty(&self) -> bool {
        self.live() == 0
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("live", &self.live())
            .field("created", &self.created)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_destroy() {
        let mut registry = HandleRegistry::new();
        let a = registry.create(String::from("a"));
        let b = registry.create(String::from("b"));

        assert_eq!(registry.get(&a).unwrap(), "a");
        registry.get_mut(&b).unwrap().push('!');
        assert_eq!(registry.get(&b).unwrap(), "b!");
        assert_eq!(registry.live(), 2);

        assert_eq!(registry.destroy(a).unwrap(), "a");
        assert_eq!(registry.destroy(b).unwrap(), "b!");
        assert!(registry.is_empty());
        assert_eq!(registry.created(), 2);
        assert_eq!(registry.destroyed(), 2);
    }

    #[test]
    fn test_reused_slot_gets_new_generation() {
        let mut registry = HandleRegistry::new();
        let first = registry.create(1);
        let (slot, generation) = (first.slot(), first.generation());
        registry.destroy(first).unwrap();

        let second = registry.create(2);
        assert_eq!(second.slot(), slot);
        assert_eq!(second.generation(), generation + 1);
        assert_eq!(*registry.get(&second).unwrap(), 2);
    }

    #[test]
    fn test_foreign_handle_is_stale() {
        let mut left = HandleRegistry::new();
        let mut right = HandleRegistry::new();
        let handle = left.create(1);
        right.create(2);

        assert_eq!(
            right.get(&handle),
            Err(SyncError::StaleHandle { slot: 0, generation: 0 })
        );
        assert!(right.destroy(handle).is_err());
        assert_eq!(right.live(), 1);
        assert_eq!(left.live(), 1);
    }

    #[test]
    fn test_handles_compare_by_identity() {
        let mut registry = HandleRegistry::new();
        let a = registry.create(());
        let b = registry.create(());
        assert_ne!(a, b);
        assert_eq!(format!("{a:?}"), "Handle { slot: 0, generation: 0 }");
    }
}
