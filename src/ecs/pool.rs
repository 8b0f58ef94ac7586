//! Fixed-capacity generational entity pool
//!
//! Slots are addressed by [`Handle`]s that pair a slot index with the slot's
//! generation. Releasing a slot bumps its generation, so any handle still
//! held elsewhere resolves to `None` from then on. Iteration always walks
//! slots in index order; per-tick RNG consumption depends on that order.

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};

/// Stable reference to a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// The "no entity" sentinel
    pub const NULL: Handle = Handle {
        index: u32::MAX,
        generation: 0,
    };

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    pub fn is_null(self) -> bool {
        self.index == u32::MAX
    }

    pub fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }

    /// Replace this handle with [`Handle::NULL`], returning the old value
    ///
    /// Holders call this when they hand an entity to [`EntityPool::release`]
    /// so no stale copy outlives the release.
    pub fn take(&mut self) -> Handle {
        std::mem::replace(self, Handle::NULL)
    }
}

impl Default for Handle {
    fn default() -> Self {
        Handle::NULL
    }
}

/// What a successful [`EntityPool::release`] freed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Released<T> {
    Value(T),
    /// The value was checked out with [`EntityPool::take`] and stays with
    /// whoever took it
    CheckedOut,
}

impl<T> Released<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Released::Value(value) => Some(value),
            Released::CheckedOut => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SlotState<T> {
    Vacant,
    Occupied(T),
    /// Value moved out for an in-place update; the slot stays reserved
    CheckedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Slot<T> {
    generation: u32,
    state: SlotState<T>,
}

/// Arena with LIFO slot recycling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    capacity: usize,
    live: usize,
}

impl<T> EntityPool<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live entities, including any checked out for update
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn free_slots(&self) -> usize {
        self.capacity - self.live
    }

    /// Claim a slot for `value`
    pub fn allocate(&mut self, value: T) -> Result<Handle> {
        if self.live >= self.capacity {
            return Err(SimError::PoolExhausted {
                live: self.live,
                capacity: self.capacity,
            });
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::Vacant,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Occupied(value);
        self.live += 1;
        Ok(Handle {
            index,
            generation: slot.generation,
        })
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: Handle) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    /// Release the slot; the handle and every copy of it become stale
    ///
    /// A checked-out slot is freed too and reports [`Released::CheckedOut`].
    /// Stale, null and out-of-range handles are an [`SimError::InvalidHandle`]
    /// and leave the pool untouched.
    pub fn release(&mut self, handle: Handle) -> Result<Released<T>> {
        let slot = self
            .slot_mut(handle)
            .ok_or(SimError::InvalidHandle(handle))?;
        let released = match std::mem::replace(&mut slot.state, SlotState::Vacant) {
            SlotState::Vacant => return Err(SimError::InvalidHandle(handle)),
            SlotState::Occupied(value) => Released::Value(value),
            SlotState::CheckedOut => Released::CheckedOut,
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Ok(released)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Resolve a handle; stale, null and out-of-range handles yield `None`
    pub fn get(&self, handle: Handle) -> Option<&T> {
        match &self.slot(handle)?.state {
            SlotState::Occupied(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match &mut self.slot_mut(handle)?.state {
            SlotState::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Move a value out for update while keeping its slot reserved
    pub fn take(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        if !matches!(slot.state, SlotState::Occupied(_)) {
            return None;
        }
        match std::mem::replace(&mut slot.state, SlotState::CheckedOut) {
            SlotState::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Put back a value previously moved out with [`EntityPool::take`]
    pub fn restore(&mut self, handle: Handle, value: T) -> Result<()> {
        match self.slot_mut(handle) {
            Some(slot) if matches!(slot.state, SlotState::CheckedOut) => {
                slot.state = SlotState::Occupied(value);
                Ok(())
            }
            _ => Err(SimError::InvalidHandle(handle)),
        }
    }

    /// Live handles in slot order
    pub fn handles(&self) -> Vec<Handle> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Live entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.state {
                SlotState::Occupied(value) => Some((
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )),
                _ => None,
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                match &mut slot.state {
                    SlotState::Occupied(value) => Some((
                        Handle {
                            index: index as u32,
                            generation,
                        },
                        value,
                    )),
                    _ => None,
                }
            })
    }

    /// Drop every entity; generations survive so old handles stay stale
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if !matches!(slot.state, SlotState::Vacant) {
                slot.generation = slot.generation.wrapping_add(1);
                slot.state = SlotState::Vacant;
            }
            self.free.push(index as u32);
        }
        self.live = 0;
    }
}
