// bolt-vm - Generational object heap
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Generational arena for heap objects.
//!
//! Every occupied slot carries a mark bit and an intrusive link threading all
//! live objects into a singly linked list. Handles are `(index, generation)`
//! pairs: freeing a slot bumps its generation, so a stale handle resolves to
//! nothing instead of to whatever reused the slot.
//!
//! Nothing is reclaimed unless the embedder asks: [`Heap::mark`] followed by
//! [`Heap::sweep`] is the whole collector.

use tracing::trace;

use crate::value::{BoltValue, Closure};

/// Handle to a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapRef {
    index: u32,
    generation: u32,
}

impl HeapRef {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

/// A heap-allocated aggregate.
#[derive(Debug, Clone)]
pub enum HeapObject {
    Closure(Closure),
    Cons(BoltValue, BoltValue),
}

/// Object header plus payload.
#[derive(Debug)]
struct Entry {
    object: HeapObject,
    marked: bool,
    next: Option<u32>,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// The object heap.
#[derive(Debug, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    /// Head of the live-object list.
    head: Option<u32>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an object and link it at the head of the live list.
    ///
    /// Returns `None` once every addressable slot is in use.
    pub fn allocate(&mut self, object: HeapObject) -> Option<HeapRef> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let index = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(Slot::default());
                index
            }
        };
        let slot = self.slots.get_mut(index as usize)?;
        slot.entry = Some(Entry {
            object,
            marked: false,
            next: self.head,
        });
        self.head = Some(index);
        self.live += 1;
        Some(HeapRef {
            index,
            generation: slot.generation,
        })
    }

    /// Resolve a handle. Stale handles resolve to `None`.
    pub fn get(&self, r: HeapRef) -> Option<&HeapObject> {
        self.entry(r).map(|entry| &entry.object)
    }

    /// Whether `r` still names a live object.
    pub fn contains(&self, r: HeapRef) -> bool {
        self.entry(r).is_some()
    }

    /// Unlink and release an object, returning it.
    pub fn free(&mut self, r: HeapRef) -> Option<HeapObject> {
        self.entry(r)?;
        self.unlink(r.index);
        self.release(r.index)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Handles of every live object, most recently allocated first.
    pub fn live_objects(&self) -> Vec<HeapRef> {
        let mut refs = Vec::with_capacity(self.live);
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let Some(slot) = self.slots.get(index as usize) else {
                break;
            };
            refs.push(HeapRef {
                index,
                generation: slot.generation,
            });
            cursor = slot.entry.as_ref().and_then(|entry| entry.next);
        }
        refs
    }

    pub fn is_marked(&self, r: HeapRef) -> bool {
        self.entry(r).is_some_and(|entry| entry.marked)
    }

    /// Mark the object `root` refers to and everything reachable from it.
    pub fn mark(&mut self, root: &BoltValue) {
        let mut pending: Vec<HeapRef> = root.heap_ref().into_iter().collect();
        while let Some(r) = pending.pop() {
            let Some(entry) = self.entry_mut(r) else {
                continue;
            };
            if entry.marked {
                continue;
            }
            entry.marked = true;
            if let HeapObject::Cons(car, cdr) = &entry.object {
                pending.extend(car.heap_ref());
                pending.extend(cdr.heap_ref());
            }
        }
    }

    /// Free every unmarked object and clear the marks of the survivors.
    ///
    /// Returns the number of objects reclaimed.
    pub fn sweep(&mut self) -> usize {
        let mut reclaimed = 0;
        let mut survivors: Option<u32> = None;
        let mut tail: Option<u32> = None;
        let mut cursor = self.head.take();

        while let Some(index) = cursor {
            let Some(entry) = self
                .slots
                .get_mut(index as usize)
                .and_then(|slot| slot.entry.as_mut())
            else {
                break;
            };
            cursor = entry.next.take();
            if entry.marked {
                entry.marked = false;
                match tail {
                    Some(t) => self.set_next(t, Some(index)),
                    None => survivors = Some(index),
                }
                tail = Some(index);
            } else {
                trace!(index, "reclaiming heap object");
                self.release(index);
                reclaimed += 1;
            }
        }

        self.head = survivors;
        reclaimed
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn entry(&self, r: HeapRef) -> Option<&Entry> {
        let slot = self.slots.get(r.index as usize)?;
        if slot.generation != r.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, r: HeapRef) -> Option<&mut Entry> {
        let slot = self.slots.get_mut(r.index as usize)?;
        if slot.generation != r.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    fn set_next(&mut self, index: u32, next: Option<u32>) {
        if let Some(entry) = self
            .slots
            .get_mut(index as usize)
            .and_then(|slot| slot.entry.as_mut())
        {
            entry.next = next;
        }
    }

    /// Remove `index` from the live list.
    fn unlink(&mut self, index: u32) {
        let next = self
            .slots
            .get(index as usize)
            .and_then(|slot| slot.entry.as_ref())
            .and_then(|entry| entry.next);

        if self.head == Some(index) {
            self.head = next;
            return;
        }
        let mut cursor = self.head;
        while let Some(current) = cursor {
            let following = self
                .slots
                .get(current as usize)
                .and_then(|slot| slot.entry.as_ref())
                .and_then(|entry| entry.next);
            if following == Some(index) {
                self.set_next(current, next);
                return;
            }
            cursor = following;
        }
    }

    /// Empty a slot that is no longer linked, bumping its generation.
    fn release(&mut self, index: u32) -> Option<HeapObject> {
        let slot = self.slots.get_mut(index as usize)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.live -= 1;
        Some(entry.object)
    }
}
