// bolt-vm - Opcode handlers
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Opcode handlers, organised by category.

pub(crate) mod arithmetic;
pub(crate) mod control;
