// bolt-vm - Control flow
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Control flow opcode handlers: jmp, jmp_if_false, call, call_native, ret,
//! closure.

use tracing::debug;

use crate::heap::HeapObject;
use crate::instruction::{Instruction, Opcode};
use crate::value::{BoltValue, Closure};
use crate::vm::{Arity, Frame, Interrupt, Slot, Vm};

/// Outcome of executing one instruction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Continue,
    /// The top-level procedure returned.
    Halt(BoltValue),
}

impl Vm {
    /// Execute a control flow opcode.
    pub(crate) fn execute_control(
        &mut self,
        op: Opcode,
        instr: Instruction,
    ) -> Result<Flow, Interrupt> {
        match op {
            Opcode::Jmp => {
                self.jump(instr.imm16());
            }
            Opcode::JmpIfFalse => {
                if !self.register(instr.rd())?.is_truthy() {
                    self.jump(instr.imm16());
                }
            }
            Opcode::Ret => {
                let value = self.register(instr.rd())?;
                return self.return_value(value);
            }
            Opcode::Call => {
                let callee = self.register(instr.rd())?;
                return self.call_value(callee, instr.rd(), instr.imm16() as usize);
            }
            Opcode::CallNative => {
                let handle = self.native(instr.rs() as u16)?;
                return self.call_value(BoltValue::Closure(handle), instr.rd(), instr.rt() as usize);
            }
            Opcode::Closure => {
                let index = instr.imm16() as usize;
                if self.program.get(index).is_none() {
                    return Err(Interrupt::InvalidPrototype(index));
                }
                let handle = self.allocate(HeapObject::Closure(Closure::Virtual(index)))?;
                self.set_register(instr.rd(), BoltValue::Closure(handle))?;
            }
            _ => return Err(Interrupt::UnsupportedOpcode(op as u8)),
        }
        Ok(Flow::Continue)
    }

    /// Forward jump relative to the next instruction.
    fn jump(&mut self, offset: u16) {
        self.ip += offset as usize;
    }

    /// Call `callee` with the arguments in registers `rd+1..=rd+argc`.
    fn call_value(&mut self, callee: BoltValue, rd: u8, argc: usize) -> Result<Flow, Interrupt> {
        let BoltValue::Closure(handle) = callee else {
            return Err(Interrupt::NotCallable(callee.type_name()));
        };
        let closure = match self.heap.get(handle) {
            Some(HeapObject::Closure(closure)) => *closure,
            Some(HeapObject::Cons(..)) => return Err(Interrupt::NotCallable("cons")),
            None => return Err(Interrupt::DanglingReference),
        };

        let caller = self.frame;
        let args = (1..=argc)
            .map(|i| self.read_register(caller, rd as usize + i))
            .collect::<Result<Vec<_>, _>>()?;

        match closure {
            Closure::Virtual(index) => {
                let proto = self
                    .program
                    .get(index)
                    .ok_or(Interrupt::InvalidPrototype(index))?;
                if proto.arity != argc {
                    return Err(Interrupt::ArityMismatch {
                        expected: Arity::Exactly(proto.arity),
                        got: argc,
                    });
                }
                let registers = proto.register_count;
                let frame =
                    self.push_frame(callee, registers, Slot::Ip(self.ip), Slot::Fp(caller.fp))?;
                debug!(prototype = index, argc, fp = frame.fp, "call");
                for (r, arg) in args.into_iter().enumerate() {
                    self.write_register(frame, r, arg)?;
                }
                self.prototype = index;
                self.ip = 0;
                Ok(Flow::Continue)
            }
            Closure::Native(native) => {
                let expected = native.primitive.arity();
                if !expected.accepts(argc) {
                    return Err(Interrupt::ArityMismatch { expected, got: argc });
                }
                let frame =
                    self.push_frame(callee, argc.max(1), Slot::Ip(self.ip), Slot::Fp(caller.fp))?;
                debug!(primitive = native.primitive.name(), argc, fp = frame.fp, "native call");
                for (r, arg) in args.into_iter().enumerate() {
                    self.write_register(frame, r, arg)?;
                }
                self.native_argc = argc;
                (native.function)(self)?;
                let result = self.register(0)?;
                self.return_value(result)
            }
        }
    }

    /// Pop the active frame and deliver `value` to the caller's result
    /// register, or halt if the active frame is the entry frame.
    fn return_value(&mut self, value: BoltValue) -> Result<Flow, Interrupt> {
        let frame = self.frame;
        if self.entry == Some(frame) {
            return Ok(Flow::Halt(value));
        }

        let return_ip = match self.stack.get(frame.return_ip_slot())? {
            Slot::Ip(ip) => *ip,
            _ => return Err(Interrupt::StackUnderflow),
        };
        let saved_fp = match self.stack.get(frame.saved_fp_slot())? {
            Slot::Fp(fp) => *fp,
            _ => return Err(Interrupt::StackUnderflow),
        };
        self.stack.release_to(frame.caller_sp())?;

        let caller_closure = match self.stack.get(saved_fp)? {
            Slot::Value(BoltValue::Closure(handle)) => *handle,
            _ => return Err(Interrupt::StackUnderflow),
        };
        let prototype = match self.heap.get(caller_closure) {
            Some(HeapObject::Closure(Closure::Virtual(index))) => *index,
            Some(_) => return Err(Interrupt::NotCallable("native")),
            None => return Err(Interrupt::DanglingReference),
        };
        let proto = self
            .program
            .get(prototype)
            .ok_or(Interrupt::InvalidPrototype(prototype))?;
        let call_ip = return_ip
            .checked_sub(1)
            .ok_or(Interrupt::IpOutOfBounds(return_ip))?;
        let call = proto
            .code
            .get(call_ip)
            .copied()
            .ok_or(Interrupt::IpOutOfBounds(call_ip))?;

        self.frame = Frame {
            fp: saved_fp,
            registers: proto.register_count,
        };
        self.prototype = prototype;
        self.ip = return_ip;
        debug!(prototype, fp = saved_fp, "return");
        self.set_register(call.rd(), value)?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use bolt_parser::Span;

    use crate::instruction::{Instruction, Opcode};
    use crate::prototype::{Program, Prototype};
    use crate::value::BoltValue;
    use crate::vm::{Interrupt, Vm, VmConfig};

    fn proto(arity: usize, locals: usize, constants: Vec<BoltValue>, code: &[Instruction]) -> Prototype {
        let mut proto = Prototype::new(arity, locals);
        proto.constants = constants;
        for instr in code {
            proto.emit(*instr, Span::new(1, 1));
        }
        proto
    }

    fn double_program(arg: i64) -> Program {
        let main = proto(
            0,
            2,
            vec![BoltValue::Integer(arg)],
            &[
                Instruction::closure(0, 1),
                Instruction::load_const(1, 0),
                Instruction::call(0, 1),
                Instruction::ret(0),
            ],
        );
        let double = proto(
            1,
            1,
            vec![],
            &[
                Instruction::abc(Opcode::Add, 1, 0, 0),
                Instruction::ret(1),
            ],
        );
        Program::new(vec![main, double])
    }

    #[test]
    fn call_and_return() {
        let mut vm = Vm::default();
        assert_eq!(vm.run(double_program(21)), Ok(BoltValue::Integer(42)));
    }

    #[test]
    fn frame_is_restored_after_return() {
        let mut vm = Vm::default();
        vm.run(double_program(1)).unwrap();
        let capacity = vm.stack().capacity();
        assert_eq!(vm.fp(), capacity - 1);
        assert_eq!(vm.sp(), capacity - 5);
        assert_eq!(vm.stack().depth(), 5);
    }

    #[test]
    fn native_call() {
        let main = proto(
            0,
            3,
            vec![BoltValue::Integer(10), BoltValue::Integer(4)],
            &[
                Instruction::load_const(1, 0),
                Instruction::load_const(2, 1),
                Instruction::call_native(0, 2, 1),
                Instruction::ret(0),
            ],
        );
        let mut vm = Vm::default();
        assert_eq!(vm.run(Program::new(vec![main])), Ok(BoltValue::Integer(6)));
    }

    #[test]
    fn conditional_jump() {
        let main = proto(
            0,
            2,
            vec![BoltValue::Boolean(false), BoltValue::Integer(1), BoltValue::Integer(2)],
            &[
                Instruction::load_const(0, 0),
                Instruction::jmp_if_false(0, 2),
                Instruction::load_const(1, 1),
                Instruction::jmp(1),
                Instruction::load_const(1, 2),
                Instruction::ret(1),
            ],
        );
        let mut vm = Vm::default();
        assert_eq!(vm.run(Program::new(vec![main])), Ok(BoltValue::Integer(2)));
    }

    #[test]
    fn calling_an_integer() {
        let main = proto(
            0,
            1,
            vec![BoltValue::Integer(3)],
            &[Instruction::load_const(0, 0), Instruction::call(0, 0)],
        );
        let mut vm = Vm::default();
        let err = vm.run(Program::new(vec![main])).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::NotCallable("integer"));
        assert_eq!(err.ip, 1);
    }

    #[test]
    fn arity_is_checked() {
        let mut program = double_program(1);
        program.prototypes[0].code[2] = Instruction::call(0, 0);
        let mut vm = Vm::default();
        let err = vm.run(program).unwrap_err();
        assert!(matches!(err.interrupt, Interrupt::ArityMismatch { got: 0, .. }));
    }

    #[test]
    fn closure_over_missing_prototype() {
        let main = proto(0, 1, vec![], &[Instruction::closure(0, 9)]);
        let mut vm = Vm::default();
        let err = vm.run(Program::new(vec![main])).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::InvalidPrototype(9));
    }

    #[test]
    fn unbounded_recursion_overflows() {
        // prototype 1 calls itself through the entry frame's register 0
        let mut main = proto(
            0,
            1,
            vec![],
            &[
                Instruction::closure(0, 1),
                Instruction::mov(1, 0),
                Instruction::call(1, 0),
                Instruction::ret(1),
            ],
        );
        main.register_count = 2;
        let looping = proto(
            0,
            1,
            vec![],
            &[
                Instruction::get_global(0, 0),
                Instruction::call(0, 0),
                Instruction::ret(0),
            ],
        );
        let mut vm = Vm::new(VmConfig { stack_size: 64 });
        let err = vm.run(Program::new(vec![main, looping])).unwrap_err();
        assert_eq!(err.interrupt, Interrupt::StackOverflow);
        assert_eq!(err.prototype, 1);
    }
}
