// bolt-embed - Engine implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Engine struct - main entry point for embedding Bolt.

use std::path::Path;

use bolt_parser::Parser;
use bolt_vm::{compile, disassemble_program, BoltValue, CompileOptions, Program, Vm, VmConfig};
use tracing::debug;

use crate::convert::FromBoltValue;
use crate::error::{Error, Result};

/// Settings for an [`Engine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Slots in the VM value stack.
    pub stack_size: usize,
    /// Compile calls to arithmetic and comparison primitives as opcodes.
    pub inline_primitives: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stack_size: VmConfig::default().stack_size,
            inline_primitives: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            inline_primitives: self.inline_primitives,
        }
    }

    fn vm_config(&self) -> VmConfig {
        VmConfig {
            stack_size: self.stack_size,
        }
    }
}

/// The Bolt scripting engine.
///
/// Each call to [`Engine::eval`] compiles its source as one program and runs
/// it on the engine's VM. Running a program resets the VM, so definitions do
/// not carry over between calls; pass the whole source at once.
///
/// # Example
///
/// ```rust
/// use bolt_embed::Engine;
///
/// let mut engine = Engine::new();
/// let result = engine.eval_to_string("(+ 1 2 3)").unwrap();
/// assert_eq!(result, "6");
/// ```
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    vm: Vm,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let vm = Vm::new(config.vm_config());
        Engine { config, vm }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse, analyze and compile `src` without running it.
    pub fn compile(&self, src: &str) -> Result<Program> {
        let forms = Parser::parse_all_str(src)?;
        let program = compile(&forms, self.config.compile_options())?;
        debug!(
            forms = forms.len(),
            prototypes = program.len(),
            "compiled source"
        );
        Ok(program)
    }

    /// Evaluate a string of Bolt code.
    ///
    /// Returns the value of the last top-level form, or `#f` for an empty
    /// source.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code contains syntax errors
    /// - Analysis or code generation rejects it
    /// - Execution raises an interrupt
    ///
    /// # Example
    ///
    /// ```rust
    /// use bolt_embed::Engine;
    ///
    /// let mut engine = Engine::new();
    /// let result = engine.eval("(define x 42) (* x 2)").unwrap();
    /// assert_eq!(result, bolt_embed::BoltValue::Integer(84));
    /// ```
    pub fn eval(&mut self, src: &str) -> Result<BoltValue> {
        let program = self.compile(src)?;
        Ok(self.vm.run(program)?)
    }

    /// Evaluate and convert the result to a Rust type.
    ///
    /// ```rust
    /// use bolt_embed::Engine;
    ///
    /// let mut engine = Engine::new();
    /// let n: i64 = engine.eval_as("(- 10 4)").unwrap();
    /// assert_eq!(n, 6);
    /// ```
    pub fn eval_as<T: FromBoltValue>(&mut self, src: &str) -> Result<T> {
        let value = self.eval(src)?;
        T::from_bolt_value(&value)
    }

    /// Evaluate and print the result, following cons cells through the heap.
    pub fn eval_to_string(&mut self, src: &str) -> Result<String> {
        let value = self.eval(src)?;
        Ok(self.vm.render(&value))
    }

    /// Evaluate a file of Bolt code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, and otherwise the
    /// same errors as [`Engine::eval`].
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<BoltValue> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.eval(&src)
    }

    /// Compile `src` and list the bytecode of every prototype.
    pub fn disassemble(&self, src: &str) -> Result<String> {
        let program = self.compile(src)?;
        Ok(disassemble_program(&program))
    }

    /// Print a value produced by the last evaluation.
    pub fn render(&self, value: &BoltValue) -> String {
        self.vm.render(value)
    }

    /// The VM, for inspecting state after a run.
    pub fn vm(&self) -> &Vm {
        &self.vm
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
