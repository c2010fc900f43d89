// bolt-vm - Code generation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: lowers the analyzed AST to register bytecode.
//!
//! One [`Prototype`] is emitted per lambda, the top-level procedure first.
//! Registers `0..arity + n_locals` of a prototype belong to its parameters
//! and variables; temporaries are allocated above them and released in LIFO
//! order, so `next_reg` is back at `arity + n_locals` when a body is done.

use bolt_parser::Span;
use tracing::debug;

use crate::instruction::Instruction;
use crate::prototype::{Program, Prototype};
use crate::value::BoltValue;

use super::analysis::AnalyzedProgram;
use super::ast::{Atom, AtomicNode, Callee, Define, IfExpr, Lambda, Node, ProcCall, Resolution};
use super::scope::ScopeTable;
use super::types::{CompileError, CompileOptions, Result, MAX_REGISTERS};

/// A register holding the value of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reg {
    index: u8,
    /// Temporaries are released after use; named registers never are.
    temp: bool,
}

impl Reg {
    fn named(index: u8) -> Self {
        Reg { index, temp: false }
    }

    fn temp(index: u8) -> Self {
        Reg { index, temp: true }
    }
}

/// Bytecode compiler.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> CompileOptions {
        self.options
    }

    /// Compile an analyzed program into prototypes.
    pub fn compile(&self, program: &AnalyzedProgram) -> Result<Program> {
        let mut codegen = Codegen {
            options: self.options,
            scopes: &program.scopes,
            prototypes: Vec::new(),
        };
        codegen.compile_lambda(&program.root)?;
        Ok(Program::new(codegen.prototypes))
    }
}

/// Compilation state. The function being compiled is passed around as an
/// index into `prototypes`.
struct Codegen<'a> {
    options: CompileOptions,
    scopes: &'a ScopeTable,
    prototypes: Vec<Prototype>,
}

impl Codegen<'_> {
    // ========================================================================
    // Functions
    // ========================================================================

    /// Compile a lambda into a new prototype and return its index.
    fn compile_lambda(&mut self, lambda: &Lambda) -> Result<u16> {
        let index = u16::try_from(self.prototypes.len())
            .map_err(|_| CompileError::TooManyPrototypes { span: lambda.span })?;
        let f = index as usize;
        self.prototypes.push(Prototype::new(
            lambda.arity(),
            self.scopes.n_locals(lambda.scope),
        ));

        self.compile_body(f, &lambda.body, lambda.span)?;

        let proto = &self.prototypes[f];
        debug!(
            prototype = f,
            arity = proto.arity,
            locals = proto.n_locals,
            registers = proto.register_count,
            instructions = proto.code.len(),
            constants = proto.constants.len(),
            "compiled prototype"
        );
        Ok(index)
    }

    /// Compile a body, returning the value of its last form.
    fn compile_body(&mut self, f: usize, body: &[Node], span: Span) -> Result<()> {
        let Some((last, init)) = body.split_last() else {
            let r = self.alloc_temp(f, span)?;
            self.load_constant(f, r, BoltValue::Boolean(false), span)?;
            self.emit(f, Instruction::ret(r), span);
            self.release(f, Reg::temp(r));
            return Ok(());
        };

        // Earlier forms are compiled for effect.
        for node in init {
            let reg = self.compile_expr(f, node)?;
            self.release(f, reg);
        }
        let reg = self.compile_expr(f, last)?;
        self.emit(f, Instruction::ret(reg.index), last.span());
        self.release(f, reg);
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Compile an expression into some register.
    ///
    /// A local variable is its own register; a definition yields the
    /// variable's register. Everything else lands in a new temporary.
    fn compile_expr(&mut self, f: usize, node: &Node) -> Result<Reg> {
        match node {
            Node::Atomic(AtomicNode {
                atom:
                    Atom::Variable {
                        resolution: Resolution::Local(r),
                        ..
                    },
                ..
            }) => Ok(Reg::named(*r)),
            Node::Define(define) => self.compile_define(f, define),
            _ => {
                let rd = self.alloc_temp(f, node.span())?;
                self.compile_into_temp(f, node, rd)?;
                Ok(Reg::temp(rd))
            }
        }
    }

    /// Compile an expression into `rd`, the most recently allocated
    /// temporary.
    fn compile_into_temp(&mut self, f: usize, node: &Node, rd: u8) -> Result<()> {
        let span = node.span();
        match node {
            Node::Atomic(atomic) => self.compile_atomic(f, atomic, rd),
            Node::Define(define) => {
                let reg = self.compile_define(f, define)?;
                self.emit(f, Instruction::mov(rd, reg.index), span);
                Ok(())
            }
            Node::If(if_expr) => self.compile_if(f, if_expr, rd),
            Node::Lambda(lambda) => {
                let index = self.compile_lambda(lambda)?;
                self.emit(f, Instruction::closure(rd, index), span);
                Ok(())
            }
            Node::Call(call) => self.compile_call(f, call, rd),
        }
    }

    fn compile_atomic(&mut self, f: usize, atomic: &AtomicNode, rd: u8) -> Result<()> {
        let span = atomic.span;
        match &atomic.atom {
            Atom::Literal(value) => self.load_constant(f, rd, value.clone(), span),
            Atom::Str(_) => Err(CompileError::UnsupportedForm {
                form: "string literal".to_string(),
                span,
            }),
            Atom::Variable { resolution, .. } => {
                let instr = match *resolution {
                    Resolution::Local(r) => Instruction::mov(rd, r),
                    Resolution::Global(r) => Instruction::get_global(rd, r as u16),
                    Resolution::Native(primitive) => Instruction::native(rd, primitive.id() as u16),
                };
                self.emit(f, instr, span);
                Ok(())
            }
        }
    }

    /// Evaluate the value and move it into the variable's register.
    fn compile_define(&mut self, f: usize, define: &Define) -> Result<Reg> {
        let value = self.compile_expr(f, &define.value)?;
        if value.index != define.register {
            self.emit(f, Instruction::mov(define.register, value.index), define.span);
        }
        self.release(f, value);
        Ok(Reg::named(define.register))
    }

    /// Both branches leave their value in `rd`.
    fn compile_if(&mut self, f: usize, if_expr: &IfExpr, rd: u8) -> Result<()> {
        let span = if_expr.span;
        let condition = self.compile_expr(f, &if_expr.condition)?;
        let else_jump = self.emit(f, Instruction::jmp_if_false(condition.index, 0), span);
        self.release(f, condition);

        self.compile_branch(f, &if_expr.then_branch, rd)?;
        let end_jump = self.emit(f, Instruction::jmp(0), span);

        self.patch_jump(f, else_jump, span)?;
        self.compile_branch(f, &if_expr.else_branch, rd)?;
        self.patch_jump(f, end_jump, span)
    }

    fn compile_branch(&mut self, f: usize, branch: &Node, rd: u8) -> Result<()> {
        let value = self.compile_expr(f, branch)?;
        self.emit(f, Instruction::mov(rd, value.index), branch.span());
        self.release(f, value);
        Ok(())
    }

    /// Compile a call whose result lands in `rd`, the most recently
    /// allocated temporary. Arguments go to `rd+1..=rd+argc`.
    fn compile_call(&mut self, f: usize, call: &ProcCall, rd: u8) -> Result<()> {
        let span = call.span;
        match &call.callee {
            Callee::Native(primitive) => {
                if let (true, Some(op), [a, b]) = (
                    self.options.inline_primitives,
                    primitive.opcode(),
                    call.args.as_slice(),
                ) {
                    let a = self.compile_expr(f, a)?;
                    let b = self.compile_expr(f, b)?;
                    self.emit(f, Instruction::abc(op, rd, a.index, b.index), span);
                    self.release(f, b);
                    self.release(f, a);
                    return Ok(());
                }
                let args = self.compile_args(f, &call.args)?;
                let argc =
                    u8::try_from(args.len()).map_err(|_| CompileError::RegisterExhaustion { span })?;
                self.emit(f, Instruction::call_native(rd, argc, primitive.id()), span);
                self.release_all(f, args);
            }
            Callee::Procedure(callee) => {
                self.compile_into_temp(f, callee, rd)?;
                let args = self.compile_args(f, &call.args)?;
                let argc = u16::try_from(args.len())
                    .map_err(|_| CompileError::RegisterExhaustion { span })?;
                self.emit(f, Instruction::call(rd, argc), span);
                self.release_all(f, args);
            }
        }
        Ok(())
    }

    /// Evaluate arguments left to right into consecutive new temporaries.
    fn compile_args(&mut self, f: usize, args: &[Node]) -> Result<Vec<Reg>> {
        let mut regs = Vec::with_capacity(args.len());
        for arg in args {
            let r = self.alloc_temp(f, arg.span())?;
            self.compile_into_temp(f, arg, r)?;
            regs.push(Reg::temp(r));
        }
        Ok(regs)
    }

    // ========================================================================
    // Registers and emission
    // ========================================================================

    fn alloc_temp(&mut self, f: usize, span: Span) -> Result<u8> {
        let proto = &mut self.prototypes[f];
        if proto.next_reg >= MAX_REGISTERS {
            return Err(CompileError::RegisterExhaustion { span });
        }
        let r = proto.next_reg as u8;
        proto.next_reg += 1;
        proto.register_count = proto.register_count.max(proto.next_reg);
        Ok(r)
    }

    fn release(&mut self, f: usize, reg: Reg) {
        if reg.temp {
            let proto = &mut self.prototypes[f];
            debug_assert_eq!(proto.next_reg, reg.index as usize + 1, "temporaries released out of order");
            proto.next_reg -= 1;
        }
    }

    fn release_all(&mut self, f: usize, regs: Vec<Reg>) {
        for reg in regs.into_iter().rev() {
            self.release(f, reg);
        }
    }

    fn emit(&mut self, f: usize, instr: Instruction, span: Span) -> usize {
        self.prototypes[f].emit(instr, span)
    }

    fn load_constant(&mut self, f: usize, rd: u8, value: BoltValue, span: Span) -> Result<()> {
        let index = self.prototypes[f]
            .add_constant(value)
            .ok_or(CompileError::TooManyConstants { span })?;
        self.emit(f, Instruction::load_const(rd, index), span);
        Ok(())
    }

    fn patch_jump(&mut self, f: usize, offset: usize, span: Span) -> Result<()> {
        self.prototypes[f]
            .patch_jump(offset)
            .ok_or(CompileError::JumpOutOfRange { span })
    }
}

#[cfg(test)]
mod tests {
    use bolt_parser::Parser;

    use super::*;
    use crate::compiler::SemanticAnalyzer;
    use crate::instruction::Opcode;

    fn compile_with(source: &str, options: CompileOptions) -> Result<Program> {
        let forms = Parser::parse_all_str(source).unwrap();
        let analyzed = SemanticAnalyzer::new().verify(&forms)?;
        Compiler::new(options).compile(&analyzed)
    }

    fn compile(source: &str) -> Program {
        compile_with(source, CompileOptions::default()).unwrap()
    }

    fn opcodes(proto: &Prototype) -> Vec<Opcode> {
        proto.code.iter().map(|i| i.opcode().unwrap()).collect()
    }

    #[test]
    fn test_constant_dedup() {
        let program = compile("(+ 5 5)");
        let proto = program.entry().unwrap();
        assert_eq!(proto.constants, vec![BoltValue::Integer(5)]);
        let loads: Vec<_> = proto
            .code
            .iter()
            .filter(|i| i.opcode() == Ok(Opcode::Const))
            .collect();
        assert_eq!(loads.len(), 2);
        assert!(loads.iter().all(|i| i.imm16() == 0));
    }

    #[test]
    fn test_native_call_layout() {
        let program = compile("(+ 1 2)");
        let proto = program.entry().unwrap();
        assert_eq!(
            proto.code,
            vec![
                Instruction::load_const(1, 0),
                Instruction::load_const(2, 1),
                Instruction::call_native(0, 2, 0),
                Instruction::ret(0),
            ]
        );
        assert_eq!(proto.register_count, 3);
        assert_eq!(proto.next_reg, 0);
    }

    #[test]
    fn test_end_to_end_shape() {
        let program = compile("(define x 3) (define y (if (< x 10) (* x 2) (- x 2)))");
        assert_eq!(program.len(), 1);
        let proto = program.entry().unwrap();
        assert_eq!(proto.n_locals, 2);
        assert_eq!(
            proto.constants,
            vec![
                BoltValue::Integer(3),
                BoltValue::Integer(10),
                BoltValue::Integer(2)
            ]
        );
        assert_eq!(proto.next_reg, 2);
        assert_eq!(proto.code.last(), Some(&Instruction::ret(1)));
    }

    #[test]
    fn test_if_branches_share_result_register() {
        let program = compile("(if #t 10 20)");
        let proto = program.entry().unwrap();
        assert_eq!(
            opcodes(proto),
            vec![
                Opcode::Const,
                Opcode::JmpIfFalse,
                Opcode::Const,
                Opcode::Mov,
                Opcode::Jmp,
                Opcode::Const,
                Opcode::Mov,
                Opcode::Ret,
            ]
        );
        // jmp_if_false skips the then-branch and its jmp
        assert_eq!(proto.code[1].imm16(), 3);
        assert_eq!(proto.code[4].imm16(), 2);
        assert_eq!(proto.code[3].rd(), proto.code[6].rd());
        assert_eq!(proto.code[7].rd(), proto.code[3].rd());
    }

    #[test]
    fn test_lambda_prototypes_in_preorder() {
        let program = compile(
            "(define f (lambda (x) (define g (lambda (y) y)) (g x)))
             (define h (lambda () 1))",
        );
        assert_eq!(program.len(), 4);
        assert_eq!(program.get(1).unwrap().arity, 1);
        assert_eq!(program.get(1).unwrap().n_locals, 1);
        assert_eq!(program.get(2).unwrap().arity, 1);
        assert_eq!(program.get(3).unwrap().arity, 0);
        for proto in &program.prototypes {
            assert_eq!(proto.next_reg, proto.named_registers());
        }
        assert!(program.entry().unwrap().code.contains(&Instruction::closure(2, 1)));
    }

    #[test]
    fn test_virtual_call_layout() {
        let program = compile("(define id (lambda (x) x)) (id 7)");
        let proto = program.entry().unwrap();
        assert_eq!(
            &proto.code[2..],
            &[
                Instruction::mov(1, 0),
                Instruction::load_const(2, 0),
                Instruction::call(1, 1),
                Instruction::ret(1),
            ]
        );
    }

    #[test]
    fn test_global_reference_from_lambda() {
        let program = compile("(define n 1) (define f (lambda () n))");
        let body = program.get(1).unwrap();
        assert_eq!(body.code[0], Instruction::get_global(0, 0));
    }

    #[test]
    fn test_inline_primitives() {
        let options = CompileOptions {
            inline_primitives: true,
        };
        let program = compile_with("(< 1 2)", options).unwrap();
        let proto = program.entry().unwrap();
        assert_eq!(
            opcodes(proto),
            vec![Opcode::Const, Opcode::Const, Opcode::Lt, Opcode::Ret]
        );
        assert_eq!(proto.code[2], Instruction::abc(Opcode::Lt, 0, 1, 2));

        // three arguments still go through the primitive
        let program = compile_with("(+ 1 2 3)", options).unwrap();
        assert!(opcodes(program.entry().unwrap()).contains(&Opcode::CallNative));
    }

    #[test]
    fn test_empty_program_returns_false() {
        let program = compile("");
        let proto = program.entry().unwrap();
        assert_eq!(proto.constants, vec![BoltValue::Boolean(false)]);
        assert_eq!(opcodes(proto), vec![Opcode::Const, Opcode::Ret]);
    }

    #[test]
    fn test_string_literal_is_unsupported() {
        let err = compile_with("\"hello\"", CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedForm { .. }));
    }

    #[test]
    fn test_register_exhaustion_in_call() {
        let args = vec!["1"; 300].join(" ");
        let err = compile_with(&format!("(+ {})", args), CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::RegisterExhaustion { .. }));
    }

    #[test]
    fn test_constant_pool_limit() {
        let source = (0..70_000).map(|n| n.to_string()).collect::<Vec<_>>().join(" ");
        let err = compile_with(&source, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::TooManyConstants { .. }));
        // the first literal past u16::MAX + 1 entries
        let column = source.find(" 65536 ").unwrap() + 2;
        assert_eq!(err.span(), Span::new(1, column));
    }

    #[test]
    fn test_prototype_limit() {
        let source = vec!["(lambda () 1)"; 70_000].join(" ");
        let err = compile_with(&source, CompileOptions::default()).unwrap_err();
        assert!(matches!(err, CompileError::TooManyPrototypes { .. }));
        // prototype 0 is the top level, so lambda number 65536 has no index
        assert_eq!(err.span(), Span::new(1, 65_535 * 14 + 1));
    }

    #[test]
    fn test_jump_distance_limit() {
        let span = Span::new(1, 1);
        let mut proto = Prototype::new(0, 1);
        let jump = proto.emit(Instruction::jmp(0), span);
        for _ in 0..u16::MAX {
            proto.emit(Instruction::mov(0, 0), span);
        }
        assert_eq!(proto.patch_jump(jump), Some(()));
        assert_eq!(proto.code[jump].imm16(), u16::MAX);

        proto.emit(Instruction::mov(0, 0), span);
        assert_eq!(proto.patch_jump(jump), None);
    }
}
