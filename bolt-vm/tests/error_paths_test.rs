// bolt-vm - Error path tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for compile and runtime error paths:
//! - Undefined symbols and malformed forms
//! - Division by zero
//! - Arity errors
//! - Type errors
//! - Stack overflow

mod common;

use bolt_parser::Span;
use bolt_vm::vm::Arity;
use bolt_vm::{CompileOptions, Interrupt, Vm, VmConfig};
use common::{compile_str, expect_error};

// =============================================================================
// Compile errors
// =============================================================================

#[test]
fn undefined_symbol() {
    expect_error("(+ x 1)", "undefined symbol 'x'");
    expect_error("(define f (lambda () (g))) (define g 1)", "undefined symbol 'g'");
}

#[test]
fn malformed_forms() {
    expect_error("(define x)", "malformed form");
    expect_error("(if #t 1)", "malformed form");
    expect_error("(lambda (x))", "malformed form");
    expect_error("()", "malformed form");
    expect_error("(1 2)", "malformed form");
}

#[test]
fn unsupported_forms() {
    expect_error("(let ((x 1)) x)", "unsupported form 'let'");
    expect_error("(cond (#t 1))", "unsupported form 'cond'");
    expect_error("\"text\"", "unsupported form");
}

#[test]
fn capture_of_enclosing_local() {
    expect_error(
        "(define adder (lambda (n) (lambda (x) (+ n x))))",
        "cannot capture 'n' (bound at 1:24)",
    );
}

#[test]
fn compile_error_position() {
    let err = compile_str("(define a 1)\n  (+ a b)", CompileOptions::default()).unwrap_err();
    assert!(err.contains("2:8"), "unexpected error: {}", err);
}

// =============================================================================
// Division by zero
// =============================================================================

#[test]
fn division_by_zero_int() {
    expect_error("(/ 10 0)", "division by zero");
    expect_error("(/ 0)", "division by zero");
}

#[test]
fn division_by_zero_float_is_infinite() {
    let program = compile_str("(/ 1.0 0)", CompileOptions::default()).unwrap();
    let mut vm = Vm::default();
    assert_eq!(vm.run(program), Ok(bolt_vm::BoltValue::Float(f64::INFINITY)));
}

// =============================================================================
// Type errors
// =============================================================================

#[test]
fn incompatible_types() {
    expect_error("(+ 1 #t)", "incompatible types for +");
    expect_error("(< #t #f)", "incompatible types for <");
    expect_error("(= (cons 1 2) 1)", "incompatible types for =");
    expect_error("(car 5)", "incompatible types for car");
}

#[test]
fn calling_a_non_closure() {
    expect_error("(define x 5) (x)", "not callable");
    expect_error("((cons 1 2))", "not callable");
}

// =============================================================================
// Arity errors
// =============================================================================

#[test]
fn virtual_arity_mismatch() {
    expect_error("((lambda (x) x))", "expected 1, got 0");
    expect_error("((lambda () 1) 2)", "expected 0, got 1");
}

#[test]
fn native_arity_mismatch() {
    let program = compile_str("(cons 1)", CompileOptions::default()).unwrap();
    let mut vm = Vm::default();
    let err = vm.run(program).unwrap_err();
    assert_eq!(
        err.interrupt,
        Interrupt::ArityMismatch {
            expected: Arity::Exactly(2),
            got: 1
        }
    );
    expect_error("(< 1)", "expected at least 2, got 1");
    expect_error("(-)", "expected at least 1, got 0");
}

// =============================================================================
// Machine state
// =============================================================================

#[test]
fn uninitialized_register() {
    expect_error("(define x x)", "read before it was written");
}

#[test]
fn stack_overflow() {
    expect_error(
        "(define loop (lambda (n) (loop n))) (loop 1)",
        "stack overflow",
    );
}

#[test]
fn stack_size_is_configurable() {
    let src = "(define count (lambda (n) (if (= n 0) 0 (+ 1 (count (- n 1)))))) (count 100)";
    let program = compile_str(src, CompileOptions::default()).unwrap();
    let mut vm = Vm::default();
    assert_eq!(vm.run(program.clone()), Ok(bolt_vm::BoltValue::Integer(100)));

    let mut small = Vm::new(VmConfig { stack_size: 256 });
    let err = small.run(program).unwrap_err();
    assert_eq!(err.interrupt, Interrupt::StackOverflow);
}

#[test]
fn runtime_error_reports_location() {
    let program = compile_str(
        "(define f (lambda (x) (/ x 0))) (f 1)",
        CompileOptions::default(),
    )
    .unwrap();
    let mut vm = Vm::default();
    let err = vm.run(program).unwrap_err();
    assert_eq!(err.interrupt, Interrupt::DivisionByZero);
    assert_eq!(err.prototype, 1);
    assert_eq!(err.span, Some(Span::new(1, 23)));
    assert!(err.to_string().contains("at 1:23"));
}
