// bolt-vm - Value stack
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The VM's value stack: call-frame metadata and registers in one array.
//!
//! The stack grows toward lower indices. Slots `sp..len` are in use.

use crate::value::BoltValue;

use super::Interrupt;

/// One stack slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot {
    /// Never written, or reclaimed by a return.
    #[default]
    Vacant,
    Value(BoltValue),
    /// A saved return address.
    Ip(usize),
    /// A saved frame pointer.
    Fp(usize),
}

/// Fixed-capacity downward-growing stack.
#[derive(Debug)]
pub struct ValueStack {
    slots: Vec<Slot>,
    sp: usize,
}

impl ValueStack {
    /// Create an empty stack of `size` slots.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![Slot::Vacant; size],
            sp: size,
        }
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lowest slot in use.
    #[inline]
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Number of slots in use.
    #[inline]
    pub fn depth(&self) -> usize {
        self.slots.len() - self.sp
    }

    /// Claim `n` more slots, returning the new `sp`.
    pub fn reserve(&mut self, n: usize) -> Result<usize, Interrupt> {
        self.sp = self.sp.checked_sub(n).ok_or(Interrupt::StackOverflow)?;
        Ok(self.sp)
    }

    /// Give back every slot below `sp`, clearing them.
    pub fn release_to(&mut self, sp: usize) -> Result<(), Interrupt> {
        if sp > self.slots.len() || sp < self.sp {
            return Err(Interrupt::StackUnderflow);
        }
        for slot in &mut self.slots[self.sp..sp] {
            *slot = Slot::Vacant;
        }
        self.sp = sp;
        Ok(())
    }

    /// Read an in-use slot.
    #[inline]
    pub fn get(&self, index: usize) -> Result<&Slot, Interrupt> {
        if index < self.sp {
            return Err(Interrupt::StackUnderflow);
        }
        self.slots.get(index).ok_or(Interrupt::StackUnderflow)
    }

    /// Write an in-use slot.
    #[inline]
    pub fn set(&mut self, index: usize, slot: Slot) -> Result<(), Interrupt> {
        if index < self.sp {
            return Err(Interrupt::StackUnderflow);
        }
        let target = self.slots.get_mut(index).ok_or(Interrupt::StackUnderflow)?;
        *target = slot;
        Ok(())
    }

    /// Values held in the in-use region.
    pub fn live_values(&self) -> impl Iterator<Item = &BoltValue> {
        self.slots[self.sp..].iter().filter_map(|slot| match slot {
            Slot::Value(value) => Some(value),
            _ => None,
        })
    }

    /// Clear every slot.
    pub fn reset(&mut self) {
        self.slots.fill(Slot::Vacant);
        self.sp = self.slots.len();
    }
}
