// bolt-vm - Shared test helpers
// Copyright (c) 2025 Tom Waddington. MIT licensed.

#![allow(dead_code)]

use bolt_parser::Parser;
use bolt_vm::{compile, BoltValue, CompileOptions, Program, Vm};

pub fn compile_str(src: &str, options: CompileOptions) -> Result<Program, String> {
    let forms = Parser::parse_all_str(src).map_err(|e| format!("parse error: {}", e))?;
    compile(&forms, options).map_err(|e| format!("compile error: {}", e))
}

/// Compile and run, returning the value of the last form.
pub fn compile_and_run(src: &str) -> Result<BoltValue, String> {
    let program = compile_str(src, CompileOptions::default())?;
    let mut vm = Vm::default();
    vm.run(program).map_err(|e| e.to_string())
}

/// Compile and run, returning the rendered value of the last form.
pub fn run_to_string(src: &str) -> String {
    let program = compile_str(src, CompileOptions::default()).expect("compile");
    let mut vm = Vm::default();
    match vm.run(program) {
        Ok(value) => vm.render(&value),
        Err(e) => format!("Error: {}", e),
    }
}

pub fn expect_error(src: &str, expected_pattern: &str) {
    match compile_and_run(src) {
        Err(e) => {
            assert!(
                e.to_lowercase().contains(&expected_pattern.to_lowercase()),
                "Error '{}' should contain '{}' for source: {}",
                e,
                expected_pattern,
                src
            );
        }
        Ok(val) => {
            panic!(
                "Expected error containing '{}', but got success: {:?} for source: {}",
                expected_pattern, val, src
            );
        }
    }
}
