// bolt-vm - Call frames
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call-frame layout on the value stack.
//!
//! ```text
//! [fp]         active closure
//! [fp - 1]     return ip
//! [fp - 2]     saved fp
//! [fp - 3 - r] register r
//! ```
//!
//! A frame for a prototype with `n` registers occupies `3 + n` slots; the
//! caller's `sp` is `fp + 1`.

/// Metadata slots preceding every register window.
pub const FRAME_HEADER: usize = 3;

/// Position and size of one call frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub fp: usize,
    /// Size of the register window.
    pub registers: usize,
}

impl Frame {
    /// Lay out a frame whose closure slot is the slot just below `sp`.
    ///
    /// Returns `None` if the frame does not fit.
    pub fn below(sp: usize, registers: usize) -> Option<Self> {
        let fp = sp.checked_sub(1)?;
        fp.checked_sub(FRAME_HEADER - 1 + registers)?;
        Some(Self { fp, registers })
    }

    /// Total slots the frame occupies.
    pub fn size(&self) -> usize {
        FRAME_HEADER + self.registers
    }

    /// `sp` of the caller, restored on return.
    pub fn caller_sp(&self) -> usize {
        self.fp + 1
    }

    pub fn closure_slot(&self) -> usize {
        self.fp
    }

    pub fn return_ip_slot(&self) -> usize {
        self.fp - 1
    }

    pub fn saved_fp_slot(&self) -> usize {
        self.fp - 2
    }

    /// Slot of register `r`, if it is inside the window.
    pub fn register_slot(&self, r: usize) -> Option<usize> {
        if r < self.registers {
            Some(self.fp - FRAME_HEADER - r)
        } else {
            None
        }
    }
}
