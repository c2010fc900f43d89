// bolt-embed integration tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Tests for the bolt-embed embedding API.

use std::io::Write;

use bolt_embed::{BoltValue, Engine, EngineConfig, Error, FromBoltValue, Interrupt};

// =============================================================================
// Evaluation
// =============================================================================

mod evaluation {
    use super::*;

    #[test]
    fn last_form_wins() {
        let mut engine = Engine::new();
        let result = engine.eval("(define x 3) (define y (* x 2)) y").unwrap();
        assert_eq!(result, BoltValue::Integer(6));
    }

    #[test]
    fn recursive_function() {
        let mut engine = Engine::new();
        let src = "
            (define fact (lambda (n) (if (= n 0) 1 (* n (fact (- n 1))))))
            (fact 10)";
        assert_eq!(engine.eval_as::<i64>(src).unwrap(), 3_628_800);
    }

    #[test]
    fn definitions_do_not_survive_between_calls() {
        let mut engine = Engine::new();
        engine.eval("(define x 1)").unwrap();
        assert!(matches!(engine.eval("x"), Err(Error::Compile(_))));
    }

    #[test]
    fn render_pairs() {
        let mut engine = Engine::new();
        assert_eq!(
            engine.eval_to_string("(cons 1 (cons 2.0 #f))").unwrap(),
            "(1 . (2.0 . #f))"
        );
        assert_eq!(engine.eval_to_string("(car (cons 5 6))").unwrap(), "5");
    }

    #[test]
    fn render_closures() {
        let mut engine = Engine::new();
        assert_eq!(engine.eval_to_string("(lambda (x) x)").unwrap(), "#<closure 1>");
        assert_eq!(engine.eval_to_string("car").unwrap(), "#<native car>");
    }

    #[test]
    fn inline_primitives_give_same_results() {
        let src = "(define sq (lambda (x) (* x x))) (- (sq 7) (/ 9 3))";
        let mut plain = Engine::new();
        let mut inlined = Engine::with_config(EngineConfig {
            inline_primitives: true,
            ..EngineConfig::default()
        });
        assert_eq!(plain.eval(src).unwrap(), BoltValue::Integer(46));
        assert_eq!(inlined.eval(src).unwrap(), BoltValue::Integer(46));
    }
}

// =============================================================================
// Type Conversion
// =============================================================================

mod type_conversion {
    use super::*;

    #[test]
    fn int_boundary_values() {
        let mut engine = Engine::new();
        let max: i64 = engine.eval_as(&i64::MAX.to_string()).unwrap();
        assert_eq!(max, i64::MAX);
    }

    #[test]
    fn float_from_mixed_arithmetic() {
        let mut engine = Engine::new();
        let value: f64 = engine.eval_as("(+ 1 0.5)").unwrap();
        assert_eq!(value, 1.5);
    }

    #[test]
    fn bool_from_comparison() {
        let mut engine = Engine::new();
        assert!(engine.eval_as::<bool>("(< 1 2)").unwrap());
        assert!(!engine.eval_as::<bool>("(> 1 2)").unwrap());
    }

    #[test]
    fn conversion_mismatch() {
        let mut engine = Engine::new();
        let err = engine.eval_as::<i64>("#t").unwrap_err();
        assert!(matches!(
            err,
            Error::Conversion {
                expected: "integer",
                got: "boolean"
            }
        ));
        assert_eq!(err.to_string(), "Type error: expected integer, got boolean");
    }

    #[test]
    fn raw_value_passthrough() {
        let value = BoltValue::from_bolt_value(&BoltValue::Float(0.25)).unwrap();
        assert_eq!(value, BoltValue::Float(0.25));
    }
}

// =============================================================================
// Errors
// =============================================================================

mod errors {
    use super::*;

    #[test]
    fn parse_error() {
        let mut engine = Engine::new();
        let err = engine.eval("(+ 1 2").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn compile_error() {
        let mut engine = Engine::new();
        let err = engine.eval("(+ y 1)").unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
        assert!(err.to_string().contains("Undefined symbol 'y'"));
    }

    #[test]
    fn runtime_error() {
        let mut engine = Engine::new();
        match engine.eval("(/ 1 0)").unwrap_err() {
            Error::Runtime(e) => assert_eq!(e.interrupt, Interrupt::DivisionByZero),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn small_stack_overflows() {
        let mut engine = Engine::with_config(EngineConfig {
            stack_size: 64,
            ..EngineConfig::default()
        });
        let src = "(define down (lambda (n) (if (= n 0) 0 (down (- n 1))))) (down 50)";
        match engine.eval(src).unwrap_err() {
            Error::Runtime(e) => assert_eq!(e.interrupt, Interrupt::StackOverflow),
            other => panic!("expected stack overflow, got {:?}", other),
        }
    }

    #[test]
    fn engine_recovers_after_error() {
        let mut engine = Engine::new();
        assert!(engine.eval("(car 1)").is_err());
        assert_eq!(engine.eval("(+ 1 1)").unwrap(), BoltValue::Integer(2));
    }
}

// =============================================================================
// Files and listings
// =============================================================================

mod files {
    use super::*;

    #[test]
    fn eval_file() {
        let path = std::env::temp_dir().join(format!("bolt-embed-{}.bolt", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "(define half (lambda (x) (/ x 2)))").unwrap();
        writeln!(file, "(half 9.0)").unwrap();
        drop(file);

        let mut engine = Engine::new();
        let result = engine.eval_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result.unwrap(), BoltValue::Float(4.5));
    }

    #[test]
    fn missing_file() {
        let mut engine = Engine::new();
        let err = engine.eval_file("/nonexistent/missing.bolt").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("missing.bolt"));
    }

    #[test]
    fn disassemble_lists_every_prototype() {
        let engine = Engine::new();
        let listing = engine
            .disassemble("(define id (lambda (x) x)) (id 4)")
            .unwrap();
        assert!(listing.contains("prototype 0 (arity 0"));
        assert!(listing.contains("prototype 1 (arity 1"));
        assert!(listing.contains("ret r0"));
    }
}
