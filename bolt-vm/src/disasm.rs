// bolt-vm - Disassembler
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Human-readable listings of compiled prototypes.
//!
//! Instructions are decoded with the same accessors the VM uses.

use std::fmt::Write;

use crate::instruction::Opcode;
use crate::prototype::{Program, Prototype};
use crate::value::{format_float, BoltValue};

/// One line per instruction: `NNNN  mnemonic operands`.
pub fn disassemble(proto: &Prototype) -> String {
    let mut out = String::new();
    for (offset, instr) in proto.code.iter().enumerate() {
        let _ = write!(out, "{:04}  {}", offset, instr);
        match instr.opcode() {
            Ok(Opcode::Const) => {
                let index = instr.imm16() as usize;
                match proto.constants.get(index) {
                    Some(value) => {
                        let _ = write!(out, "    ; {}", constant_text(value));
                    }
                    None => out.push_str("    ; <missing constant>"),
                }
            }
            Ok(op) if op.is_jump() => {
                let target = offset + 1 + instr.imm16() as usize;
                let _ = write!(out, "    ; -> {:04}", target);
            }
            _ => {}
        }
        out.push('\n');
    }
    out
}

/// Every prototype of a program, each under a header.
pub fn disassemble_program(program: &Program) -> String {
    let mut out = String::new();
    for (index, proto) in program.prototypes.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "prototype {} (arity {}, locals {}, registers {}):",
            index, proto.arity, proto.n_locals, proto.register_count
        );
        out.push_str(&disassemble(proto));
    }
    out
}

fn constant_text(value: &BoltValue) -> String {
    match value {
        BoltValue::Integer(n) => n.to_string(),
        BoltValue::Float(n) => format_float(*n),
        BoltValue::Boolean(true) => "#t".to_string(),
        BoltValue::Boolean(false) => "#f".to_string(),
        BoltValue::Symbol(sym) => sym.name().to_string(),
        other => format!("#<{}>", other.type_name()),
    }
}
