// bolt-vm - Virtual machine
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Register-based virtual machine for Bolt bytecode.
//!
//! Every call frame lives on one [`ValueStack`]. The machine state is the
//! active prototype, the instruction pointer into it and the active
//! [`Frame`]; a call saves the caller's `ip` and `fp` into the new frame and a
//! return restores them.

pub mod error;
pub mod frame;
pub(crate) mod handlers;
pub mod stack;

use tracing::{debug, trace, warn};

use crate::heap::{Heap, HeapObject, HeapRef};
use crate::instruction::{Instruction, Opcode};
use crate::native::Primitive;
use crate::prototype::Program;
use crate::value::{format_float, BoltValue, Closure, NativeFunction};

use handlers::control::Flow;

pub use error::{Arity, Interrupt, Result, RuntimeError};
pub use frame::Frame;
pub use stack::{Slot, ValueStack};

/// Default number of stack slots.
pub const DEFAULT_STACK_SIZE: usize = 1 << 12;

/// Runtime limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Number of slots in the value stack.
    pub stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl VmConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The Bolt virtual machine.
#[derive(Debug)]
pub struct Vm {
    config: VmConfig,
    stack: ValueStack,
    heap: Heap,
    /// Native closures, indexed by primitive id.
    natives: Vec<HeapRef>,
    program: Program,
    /// Index of the active prototype.
    prototype: usize,
    ip: usize,
    /// Offset of the instruction being executed.
    executing: usize,
    frame: Frame,
    /// Frame of the top-level procedure.
    entry: Option<Frame>,
    /// Argument count of the running native.
    native_argc: usize,
}

impl Vm {
    pub fn new(config: VmConfig) -> Self {
        let stack = ValueStack::new(config.stack_size);
        let sp = stack.sp();
        Self {
            config,
            stack,
            heap: Heap::new(),
            natives: Vec::new(),
            program: Program::default(),
            prototype: 0,
            ip: 0,
            executing: 0,
            frame: Frame {
                fp: sp,
                registers: 0,
            },
            entry: None,
            native_argc: 0,
        }
    }

    /// Execute a program from its top-level prototype.
    ///
    /// Loading a program clears the stack and the heap, so values from a
    /// previous run no longer resolve. The entry frame stays on the stack
    /// afterwards; see [`Vm::global`].
    pub fn run(&mut self, program: Program) -> Result<BoltValue> {
        debug!(prototypes = program.len(), "running program");
        self.program = program;
        self.prototype = 0;
        self.ip = 0;
        self.executing = 0;
        self.entry = None;
        if let Err(interrupt) = self.load() {
            return Err(self.fault(interrupt));
        }
        self.run_loop()
    }

    fn load(&mut self) -> std::result::Result<(), Interrupt> {
        self.stack.reset();
        self.heap = Heap::new();
        self.natives.clear();
        for primitive in Primitive::ALL {
            let native = NativeFunction {
                primitive,
                function: primitive.function(),
            };
            let handle = self.allocate(HeapObject::Closure(Closure::Native(native)))?;
            self.natives.push(handle);
        }

        let entry = self.program.entry().ok_or(Interrupt::InvalidPrototype(0))?;
        if entry.arity != 0 {
            return Err(Interrupt::ArityMismatch {
                expected: Arity::Exactly(entry.arity),
                got: 0,
            });
        }
        let registers = entry.register_count;
        let closure = self.allocate(HeapObject::Closure(Closure::Virtual(0)))?;
        let frame = self.push_frame(BoltValue::Closure(closure), registers, Slot::Vacant, Slot::Vacant)?;
        self.entry = Some(frame);
        Ok(())
    }

    fn run_loop(&mut self) -> Result<BoltValue> {
        loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Halt(value)) => {
                    debug!(result = %self.render(&value), "program finished");
                    return Ok(value);
                }
                Err(interrupt) => {
                    let error = self.fault(interrupt);
                    warn!(%error, "execution interrupted");
                    return Err(error);
                }
            }
        }
    }

    /// Fetch, decode and execute one instruction.
    fn step(&mut self) -> std::result::Result<Flow, Interrupt> {
        let instr = self.fetch()?;
        let op = instr.opcode().map_err(Interrupt::UnsupportedOpcode)?;
        trace!(prototype = self.prototype, ip = self.executing, %instr, "execute");

        match op {
            // Arithmetic and comparison - delegated to handler
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Eq
            | Opcode::Ne
            | Opcode::Lt
            | Opcode::Lte
            | Opcode::Bt
            | Opcode::Bte => {
                self.execute_arithmetic(op, instr)?;
            }

            // Register loads - handled inline
            Opcode::Mov => {
                let value = self.register(instr.rt())?;
                self.set_register(instr.rd(), value)?;
            }
            Opcode::Const => {
                let value = self.constant(instr.imm16())?;
                self.set_register(instr.rd(), value)?;
            }
            Opcode::Native => {
                let id = instr.imm16();
                let handle = self.native(id)?;
                self.set_register(instr.rd(), BoltValue::Closure(handle))?;
            }
            Opcode::GetGlobal => {
                let entry = self.entry.ok_or(Interrupt::StackUnderflow)?;
                let value = self.read_register(entry, instr.imm16() as usize)?;
                self.set_register(instr.rd(), value)?;
            }
            Opcode::Schedule => return Err(Interrupt::UnsupportedOpcode(op as u8)),

            // Control flow - delegated to handler
            Opcode::Jmp
            | Opcode::JmpIfFalse
            | Opcode::Ret
            | Opcode::Call
            | Opcode::CallNative
            | Opcode::Closure => return self.execute_control(op, instr),
        }
        Ok(Flow::Continue)
    }

    fn fetch(&mut self) -> std::result::Result<Instruction, Interrupt> {
        let proto = self
            .program
            .get(self.prototype)
            .ok_or(Interrupt::InvalidPrototype(self.prototype))?;
        self.executing = self.ip;
        let instr = proto
            .code
            .get(self.ip)
            .copied()
            .ok_or(Interrupt::IpOutOfBounds(self.ip))?;
        self.ip += 1;
        Ok(instr)
    }

    fn constant(&self, index: u16) -> std::result::Result<BoltValue, Interrupt> {
        self.program
            .get(self.prototype)
            .and_then(|proto| proto.constants.get(index as usize))
            .cloned()
            .ok_or(Interrupt::InvalidConstant(index))
    }

    pub(crate) fn native(&self, id: u16) -> std::result::Result<HeapRef, Interrupt> {
        self.natives
            .get(id as usize)
            .copied()
            .ok_or(Interrupt::UnknownPrimitive(id))
    }

    /// Attach the machine state to an interrupt.
    fn fault(&self, interrupt: Interrupt) -> RuntimeError {
        let span = self
            .program
            .get(self.prototype)
            .and_then(|proto| proto.span_at(self.executing));
        RuntimeError {
            interrupt,
            ip: self.executing,
            fp: self.frame.fp,
            prototype: self.prototype,
            span,
        }
    }

    // ========================================================================
    // Frames and registers
    // ========================================================================

    /// Push a frame below the current `sp` and make it active.
    pub(crate) fn push_frame(
        &mut self,
        closure: BoltValue,
        registers: usize,
        return_ip: Slot,
        saved_fp: Slot,
    ) -> std::result::Result<Frame, Interrupt> {
        let frame = Frame::below(self.stack.sp(), registers).ok_or(Interrupt::StackOverflow)?;
        self.stack.reserve(frame.size())?;
        self.stack.set(frame.closure_slot(), Slot::Value(closure))?;
        self.stack.set(frame.return_ip_slot(), return_ip)?;
        self.stack.set(frame.saved_fp_slot(), saved_fp)?;
        self.frame = frame;
        Ok(frame)
    }

    pub(crate) fn read_register(
        &self,
        frame: Frame,
        register: usize,
    ) -> std::result::Result<BoltValue, Interrupt> {
        let slot = frame
            .register_slot(register)
            .ok_or(Interrupt::StackUnderflow)?;
        match self.stack.get(slot)? {
            Slot::Value(value) => Ok(value.clone()),
            Slot::Vacant => Err(Interrupt::UninitializedRegister(register as u16)),
            Slot::Ip(_) | Slot::Fp(_) => Err(Interrupt::StackUnderflow),
        }
    }

    pub(crate) fn write_register(
        &mut self,
        frame: Frame,
        register: usize,
        value: BoltValue,
    ) -> std::result::Result<(), Interrupt> {
        let slot = frame
            .register_slot(register)
            .ok_or(Interrupt::StackUnderflow)?;
        self.stack.set(slot, Slot::Value(value))
    }

    /// Read a register of the active frame.
    pub fn register(&self, register: u8) -> std::result::Result<BoltValue, Interrupt> {
        self.read_register(self.frame, register as usize)
    }

    /// Write a register of the active frame.
    pub fn set_register(&mut self, register: u8, value: BoltValue) -> std::result::Result<(), Interrupt> {
        self.write_register(self.frame, register as usize, value)
    }

    /// Arguments of the running native primitive.
    pub fn native_args(&self) -> std::result::Result<Vec<BoltValue>, Interrupt> {
        (0..self.native_argc)
            .map(|r| self.read_register(self.frame, r))
            .collect()
    }

    pub fn native_argc(&self) -> usize {
        self.native_argc
    }

    /// A register of the top-level frame, once a program has run.
    pub fn global(&self, register: usize) -> Option<BoltValue> {
        let entry = self.entry?;
        self.read_register(entry, register).ok()
    }

    // ========================================================================
    // Heap
    // ========================================================================

    pub fn allocate(&mut self, object: HeapObject) -> std::result::Result<HeapRef, Interrupt> {
        self.heap.allocate(object).ok_or(Interrupt::HeapExhausted)
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Reclaim every heap object not reachable from the stack or the native
    /// table. Returns the number of objects freed.
    pub fn collect_garbage(&mut self) -> usize {
        let roots: Vec<BoltValue> = self.stack.live_values().cloned().collect();
        for root in &roots {
            self.heap.mark(root);
        }
        for native in &self.natives {
            self.heap.mark(&BoltValue::Closure(*native));
        }
        let reclaimed = self.heap.sweep();
        debug!(reclaimed, live = self.heap.len(), "garbage collected");
        reclaimed
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn stack(&self) -> &ValueStack {
        &self.stack
    }

    pub fn sp(&self) -> usize {
        self.stack.sp()
    }

    pub fn fp(&self) -> usize {
        self.frame.fp
    }

    /// Print a value, following heap references.
    pub fn render(&self, value: &BoltValue) -> String {
        match value {
            BoltValue::Integer(n) => n.to_string(),
            BoltValue::Float(n) => format_float(*n),
            BoltValue::Boolean(true) => "#t".to_string(),
            BoltValue::Boolean(false) => "#f".to_string(),
            BoltValue::Symbol(sym) => sym.name().to_string(),
            BoltValue::Cons(handle) | BoltValue::Closure(handle) => match self.heap.get(*handle) {
                Some(HeapObject::Cons(car, cdr)) => {
                    format!("({} . {})", self.render(car), self.render(cdr))
                }
                Some(HeapObject::Closure(Closure::Virtual(index))) => {
                    format!("#<closure {}>", index)
                }
                Some(HeapObject::Closure(Closure::Native(native))) => {
                    format!("#<native {}>", native.primitive.name())
                }
                None => "#<invalid>".to_string(),
            },
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use bolt_parser::Span;

    use super::*;
    use crate::prototype::Prototype;

    fn program(code: &[Instruction], constants: Vec<BoltValue>, registers: usize) -> Program {
        let mut proto = Prototype::new(0, registers);
        proto.constants = constants;
        for instr in code {
            proto.emit(*instr, Span::new(1, 1));
        }
        Program::new(vec![proto])
    }

    #[test]
    fn runs_hand_assembled_code() {
        let code = [
            Instruction::load_const(0, 0),
            Instruction::load_const(1, 1),
            Instruction::abc(Opcode::Mul, 0, 0, 1),
            Instruction::ret(0),
        ];
        let mut vm = Vm::default();
        let result = vm.run(program(&code, vec![BoltValue::Integer(6), BoltValue::Integer(7)], 2));
        assert_eq!(result, Ok(BoltValue::Integer(42)));
        assert_eq!(vm.global(0), Some(BoltValue::Integer(42)));
        assert_eq!(vm.fp(), DEFAULT_STACK_SIZE - 1);
        assert_eq!(vm.sp(), DEFAULT_STACK_SIZE - 5);
    }

    #[test]
    fn vacant_register_read_is_an_error() {
        let code = [Instruction::ret(1)];
        let mut vm = Vm::default();
        let err = vm.run(program(&code, vec![], 2)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::UninitializedRegister(1));
        assert_eq!(err.ip, 0);
        assert_eq!(err.span, Some(Span::new(1, 1)));
    }

    #[test]
    fn register_outside_window_underflows() {
        let code = [Instruction::ret(5)];
        let mut vm = Vm::default();
        let err = vm.run(program(&code, vec![], 1)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::StackUnderflow);
    }

    #[test]
    fn unknown_opcode_byte() {
        let code = [Instruction::from_raw(0xff)];
        let mut vm = Vm::default();
        let err = vm.run(program(&code, vec![], 0)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::UnsupportedOpcode(0xff));
    }

    #[test]
    fn schedule_is_reserved() {
        let code = [Instruction::abc(Opcode::Schedule, 0, 0, 0)];
        let mut vm = Vm::default();
        let err = vm.run(program(&code, vec![], 0)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::UnsupportedOpcode(5));
    }

    #[test]
    fn falling_off_the_end() {
        let code = [Instruction::load_const(0, 0)];
        let mut vm = Vm::default();
        let err = vm.run(program(&code, vec![BoltValue::Integer(1)], 1)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::IpOutOfBounds(1));
    }

    #[test]
    fn missing_constant() {
        let code = [Instruction::load_const(0, 99), Instruction::ret(0)];
        let mut vm = Vm::default();
        let err = vm.run(program(&code, vec![BoltValue::Integer(1)], 1)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::InvalidConstant(99));
        assert_eq!(err.ip, 0);
    }

    #[test]
    fn unknown_primitive() {
        let code = [Instruction::native(0, 99), Instruction::ret(0)];
        let mut vm = Vm::default();
        let err = vm.run(program(&code, vec![], 1)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::UnknownPrimitive(99));
    }

    #[test]
    fn call_through_freed_handle() {
        let mut vm = Vm::default();
        vm.program = program(&[Instruction::call(0, 0), Instruction::ret(0)], vec![], 1);
        vm.load().unwrap();
        let handle = vm
            .allocate(HeapObject::Closure(Closure::Virtual(0)))
            .unwrap();
        vm.heap.free(handle).unwrap();
        vm.set_register(0, BoltValue::Closure(handle)).unwrap();

        let err = vm.run_loop().unwrap_err();
        assert_eq!(err.interrupt, Interrupt::DanglingReference);
        assert_eq!(err.ip, 0);
        assert_eq!(vm.render(&BoltValue::Closure(handle)), "#<invalid>");
    }

    #[test]
    fn tiny_stack_overflows_on_entry() {
        let mut vm = Vm::new(VmConfig { stack_size: 2 });
        let err = vm.run(program(&[Instruction::ret(0)], vec![], 0)).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::StackOverflow);
    }

    #[test]
    fn empty_program_has_no_entry() {
        let mut vm = Vm::default();
        let err = vm.run(Program::default()).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::InvalidPrototype(0));
    }

    #[test]
    fn render_values() {
        let mut vm = Vm::default();
        vm.run(program(&[Instruction::native(0, 0), Instruction::ret(0)], vec![], 1))
            .unwrap();
        let plus = vm.global(0).unwrap();
        assert_eq!(vm.render(&plus), "#<native +>");

        let cell = vm
            .allocate(HeapObject::Cons(BoltValue::Integer(1), BoltValue::Float(2.0)))
            .unwrap();
        assert_eq!(vm.render(&BoltValue::Cons(cell)), "(1 . 2.0)");
        assert_eq!(vm.render(&BoltValue::Boolean(false)), "#f");
        assert_eq!(vm.render(&BoltValue::Float(5.1)), "5.1");
    }

    #[test]
    fn collect_garbage_keeps_roots() {
        let mut vm = Vm::default();
        vm.run(program(&[Instruction::native(0, 1), Instruction::ret(0)], vec![], 1))
            .unwrap();
        let before = vm.heap().len();
        vm.allocate(HeapObject::Cons(BoltValue::Integer(1), BoltValue::Integer(2)))
            .unwrap();
        assert_eq!(vm.collect_garbage(), 1);
        assert_eq!(vm.heap().len(), before);
    }
}
