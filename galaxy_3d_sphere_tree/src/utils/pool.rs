/// Fixed-capacity object pool with embedded free and used lists.
///
/// All slots are allocated up front. Each slot carries `next`/`previous`
/// links that thread it either through the free list or through the used
/// list, so allocation, release and removal from the middle of the used
/// list are all O(1). The pool never grows: when the free list is empty
/// `allocate` returns `None`.
///
/// Handles are generation-checked indices. Releasing a slot bumps its
/// generation, so handles kept by callers after a release stop resolving.
///
/// # Example
///
/// ```ignore
/// let mut pool: Pool<u32> = Pool::new(2);
/// let a = pool.allocate(true).unwrap();
/// let b = pool.allocate(true).unwrap();
/// assert!(pool.allocate(true).is_none()); // exhausted
/// pool.release(a);
/// assert!(pool.get(a).is_none());         // stale handle
/// ```

use std::fmt;
use std::ops::{Index, IndexMut};

/// Generation-checked handle to a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    /// Slot index inside the pool
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    /// In the free list
    Free,
    /// Allocated and linked into the used list
    Used,
    /// Allocated without being linked into the used list
    Detached,
}

struct PoolSlot<T> {
    item: T,
    next: Option<u32>,
    previous: Option<u32>,
    generation: u32,
    state: SlotState,
}

pub struct Pool<T> {
    slots: Vec<PoolSlot<T>>,
    /// Head of the free list
    free_head: Option<u32>,
    /// Head of the used list (most recently allocated first)
    used_head: Option<u32>,
    /// Shared iteration cursor over the used list
    cursor: Option<u32>,
    used_count: usize,
    free_count: usize,
}

impl<T: Default> Pool<T> {
    /// Preallocate `capacity` slots, all of them free.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity <= u32::MAX as usize, "pool capacity {} exceeds u32 range", capacity);

        let slots = (0..capacity)
            .map(|i| PoolSlot {
                item: T::default(),
                next: if i + 1 < capacity { Some(i as u32 + 1) } else { None },
                previous: if i > 0 { Some(i as u32 - 1) } else { None },
                generation: 0,
                state: SlotState::Free,
            })
            .collect();

        Self {
            slots,
            free_head: if capacity > 0 { Some(0) } else { None },
            used_head: None,
            cursor: None,
            used_count: 0,
            free_count: capacity,
        }
    }
}

impl<T> Pool<T> {
    /// Take the head of the free list.
    ///
    /// With `link_to_used_list` the slot becomes the new head of the used
    /// list (and therefore the first one visited by `begin`). The payload is
    /// handed back as it was left by its previous user; callers re-initialize it.
    pub fn allocate(&mut self, link_to_used_list: bool) -> Option<PoolHandle> {
        let index = self.free_head?;

        let next_free = self.slots[index as usize].next;
        self.free_head = next_free;
        if let Some(next) = next_free {
            self.slots[next as usize].previous = None;
        }

        if link_to_used_list {
            let first_used = self.used_head;
            if let Some(first) = first_used {
                self.slots[first as usize].previous = Some(index);
            }
            let slot = &mut self.slots[index as usize];
            slot.next = first_used;
            slot.previous = None;
            slot.state = SlotState::Used;
            self.used_head = Some(index);
        } else {
            let slot = &mut self.slots[index as usize];
            slot.next = None;
            slot.previous = None;
            slot.state = SlotState::Detached;
        }

        self.used_count += 1;
        self.free_count -= 1;

        Some(self.handle_of(index))
    }

    /// Return a slot to the free list.
    ///
    /// Returns false if the handle is stale or does not belong to this pool.
    /// If the iteration cursor sits on the released slot it moves on first,
    /// so releasing while iterating is allowed. The slot after the released
    /// one is then already under the cursor: read it with `current()`,
    /// calling `next()` would skip it.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        if !self.contains(handle) {
            return false;
        }

        let index = handle.index;
        if self.cursor == Some(index) {
            self.cursor = self.slots[index as usize].next;
        }

        if self.slots[index as usize].state == SlotState::Used {
            let previous = self.slots[index as usize].previous;
            let next = self.slots[index as usize].next;

            match previous {
                Some(prev) => self.slots[prev as usize].next = next,
                None => self.used_head = next,
            }
            if let Some(next) = next {
                self.slots[next as usize].previous = previous;
            }
        }

        let first_free = self.free_head;
        if let Some(first) = first_free {
            self.slots[first as usize].previous = Some(index);
        }

        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.state = SlotState::Free;
        slot.previous = None;
        slot.next = first_free;
        self.free_head = Some(index);

        self.used_count -= 1;
        self.free_count += 1;
        true
    }

    /// Place the iteration cursor on the head of the used list.
    pub fn begin(&mut self) -> Option<PoolHandle> {
        self.cursor = self.used_head;
        self.cursor.map(|index| self.handle_of(index))
    }

    /// Advance the iteration cursor.
    ///
    /// The cursor is shared: only one iteration may be in flight at a time.
    /// After releasing the slot under the cursor, use `current()` instead.
    pub fn next(&mut self) -> Option<PoolHandle> {
        if let Some(index) = self.cursor {
            self.cursor = self.slots[index as usize].next;
        }
        self.cursor.map(|index| self.handle_of(index))
    }

    /// Slot under the iteration cursor, without moving it
    pub fn current(&self) -> Option<PoolHandle> {
        self.cursor.map(|index| self.handle_of(index))
    }

    /// Drop the backing storage. Capacity becomes zero and every handle dies.
    pub fn clear(&mut self) {
        self.slots = Vec::new();
        self.free_head = None;
        self.used_head = None;
        self.cursor = None;
        self.used_count = 0;
        self.free_count = 0;
    }

    /// Whether the handle refers to a live (allocated) slot of this pool
    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.slots
            .get(handle.index as usize)
            .is_some_and(|slot| slot.state != SlotState::Free && slot.generation == handle.generation)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if self.contains(handle) {
            Some(&self.slots[handle.index as usize].item)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if self.contains(handle) {
            Some(&mut self.slots[handle.index as usize].item)
        } else {
            None
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used_count(&self) -> usize {
        self.used_count
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    fn handle_of(&self, index: u32) -> PoolHandle {
        PoolHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }
}

impl<T> Index<PoolHandle> for Pool<T> {
    type Output = T;

    fn index(&self, handle: PoolHandle) -> &T {
        match self.get(handle) {
            Some(item) => item,
            None => panic!("stale pool handle {}", handle),
        }
    }
}

impl<T> IndexMut<PoolHandle> for Pool<T> {
    fn index_mut(&mut self, handle: PoolHandle) -> &mut T {
        match self.get_mut(handle) {
            Some(item) => item,
            None => panic!("stale pool handle {}", handle),
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
