// bolt-vm - Native primitives
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Built-in operators, dispatched by numeric id.
//!
//! A primitive runs inside an ordinary call frame: its arguments are in
//! registers `0..argc` and it leaves its result in register 0. The VM checks
//! the argument count against [`Primitive::arity`] before the call.

use crate::heap::HeapObject;
use crate::instruction::Opcode;
use crate::value::{BoltValue, NativeFn};
use crate::vm::handlers::arithmetic::{self, Relation};
use crate::vm::{Arity, Interrupt, Vm};

/// A native primitive. The discriminant is its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Primitive {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Eq = 4,
    Ne = 5,
    Lt = 6,
    Lte = 7,
    Bt = 8,
    Bte = 9,
    Cons = 10,
    Car = 11,
    Cdr = 12,
}

impl Primitive {
    /// Every primitive, in id order.
    pub const ALL: [Primitive; 13] = [
        Primitive::Add,
        Primitive::Sub,
        Primitive::Mul,
        Primitive::Div,
        Primitive::Eq,
        Primitive::Ne,
        Primitive::Lt,
        Primitive::Lte,
        Primitive::Bt,
        Primitive::Bte,
        Primitive::Cons,
        Primitive::Car,
        Primitive::Cdr,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    /// The name the primitive is bound to in source code.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Add => "+",
            Primitive::Sub => "-",
            Primitive::Mul => "*",
            Primitive::Div => "/",
            Primitive::Eq => "=",
            Primitive::Ne => "!=",
            Primitive::Lt => "<",
            Primitive::Lte => "<=",
            Primitive::Bt => ">",
            Primitive::Bte => ">=",
            Primitive::Cons => "cons",
            Primitive::Car => "car",
            Primitive::Cdr => "cdr",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn arity(self) -> Arity {
        match self {
            Primitive::Add | Primitive::Mul => Arity::AtLeast(0),
            Primitive::Sub | Primitive::Div => Arity::AtLeast(1),
            Primitive::Eq
            | Primitive::Ne
            | Primitive::Lt
            | Primitive::Lte
            | Primitive::Bt
            | Primitive::Bte => Arity::AtLeast(2),
            Primitive::Cons => Arity::Exactly(2),
            Primitive::Car | Primitive::Cdr => Arity::Exactly(1),
        }
    }

    /// The three-register opcode computing this primitive on two operands.
    pub fn opcode(self) -> Option<Opcode> {
        match self {
            Primitive::Add => Some(Opcode::Add),
            Primitive::Sub => Some(Opcode::Sub),
            Primitive::Mul => Some(Opcode::Mul),
            Primitive::Div => Some(Opcode::Div),
            Primitive::Eq => Some(Opcode::Eq),
            Primitive::Ne => Some(Opcode::Ne),
            Primitive::Lt => Some(Opcode::Lt),
            Primitive::Lte => Some(Opcode::Lte),
            Primitive::Bt => Some(Opcode::Bt),
            Primitive::Bte => Some(Opcode::Bte),
            Primitive::Cons | Primitive::Car | Primitive::Cdr => None,
        }
    }

    pub fn function(self) -> NativeFn {
        match self {
            Primitive::Add => native_add,
            Primitive::Sub => native_sub,
            Primitive::Mul => native_mul,
            Primitive::Div => native_div,
            Primitive::Eq => native_eq,
            Primitive::Ne => native_ne,
            Primitive::Lt => native_lt,
            Primitive::Lte => native_lte,
            Primitive::Bt => native_bt,
            Primitive::Bte => native_bte,
            Primitive::Cons => native_cons,
            Primitive::Car => native_car,
            Primitive::Cdr => native_cdr,
        }
    }
}

type BinaryOp = fn(&BoltValue, &BoltValue) -> Result<BoltValue, Interrupt>;

fn fold(vm: &mut Vm, identity: i64, op: BinaryOp) -> Result<(), Interrupt> {
    let args = vm.native_args()?;
    let result = args
        .iter()
        .try_fold(BoltValue::Integer(identity), |acc, arg| op(&acc, arg))?;
    vm.set_register(0, result)
}

/// `(op x)` applies `unary`; `(op x y ...)` folds left from `x`.
fn fold_from_first(
    vm: &mut Vm,
    unary: fn(&BoltValue) -> Result<BoltValue, Interrupt>,
    op: BinaryOp,
) -> Result<(), Interrupt> {
    let args = vm.native_args()?;
    let (first, rest) = args.split_first().ok_or(Interrupt::ArityMismatch {
        expected: Arity::AtLeast(1),
        got: 0,
    })?;
    let result = if rest.is_empty() {
        unary(first)?
    } else {
        rest.iter().try_fold(first.clone(), |acc, arg| op(&acc, arg))?
    };
    vm.set_register(0, result)
}

fn native_add(vm: &mut Vm) -> Result<(), Interrupt> {
    fold(vm, 0, arithmetic::add)
}

fn native_mul(vm: &mut Vm) -> Result<(), Interrupt> {
    fold(vm, 1, arithmetic::mul)
}

fn native_sub(vm: &mut Vm) -> Result<(), Interrupt> {
    fold_from_first(vm, arithmetic::negate, arithmetic::sub)
}

fn native_div(vm: &mut Vm) -> Result<(), Interrupt> {
    fold_from_first(vm, reciprocal, arithmetic::div)
}

fn reciprocal(x: &BoltValue) -> Result<BoltValue, Interrupt> {
    arithmetic::div(&BoltValue::Integer(1), x)
}

/// Pairwise relation over every adjacent pair of arguments.
fn chain(vm: &mut Vm, relation: Relation) -> Result<(), Interrupt> {
    let args = vm.native_args()?;
    let mut result = true;
    for pair in args.windows(2) {
        result &= relation.holds(&pair[0], &pair[1])?;
    }
    vm.set_register(0, BoltValue::Boolean(result))
}

fn native_eq(vm: &mut Vm) -> Result<(), Interrupt> {
    chain(vm, Relation::Eq)
}

fn native_ne(vm: &mut Vm) -> Result<(), Interrupt> {
    chain(vm, Relation::Ne)
}

fn native_lt(vm: &mut Vm) -> Result<(), Interrupt> {
    chain(vm, Relation::Lt)
}

fn native_lte(vm: &mut Vm) -> Result<(), Interrupt> {
    chain(vm, Relation::Lte)
}

fn native_bt(vm: &mut Vm) -> Result<(), Interrupt> {
    chain(vm, Relation::Bt)
}

fn native_bte(vm: &mut Vm) -> Result<(), Interrupt> {
    chain(vm, Relation::Bte)
}

fn native_cons(vm: &mut Vm) -> Result<(), Interrupt> {
    let mut args = vm.native_args()?.into_iter();
    let (Some(car), Some(cdr)) = (args.next(), args.next()) else {
        return Err(Interrupt::ArityMismatch {
            expected: Arity::Exactly(2),
            got: vm.native_argc(),
        });
    };
    let cell = vm.allocate(HeapObject::Cons(car, cdr))?;
    vm.set_register(0, BoltValue::Cons(cell))
}

fn pair_field(vm: &mut Vm, name: &'static str, first: bool) -> Result<(), Interrupt> {
    let pair = vm.register(0)?;
    let BoltValue::Cons(cell) = pair else {
        return Err(Interrupt::incompatible_unary(name, &pair));
    };
    let field = match vm.heap().get(cell) {
        Some(HeapObject::Cons(car, cdr)) => {
            if first {
                car.clone()
            } else {
                cdr.clone()
            }
        }
        _ => return Err(Interrupt::DanglingReference),
    };
    vm.set_register(0, field)
}

fn native_car(vm: &mut Vm) -> Result<(), Interrupt> {
    pair_field(vm, "car", true)
}

fn native_cdr(vm: &mut Vm) -> Result<(), Interrupt> {
    pair_field(vm, "cdr", false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_declaration_order() {
        for (id, primitive) in Primitive::ALL.iter().enumerate() {
            assert_eq!(primitive.id() as usize, id);
            assert_eq!(Primitive::from_id(id as u16), Some(*primitive));
            assert_eq!(Primitive::from_name(primitive.name()), Some(*primitive));
        }
        assert_eq!(Primitive::from_id(13), None);
        assert_eq!(Primitive::from_name("lambda"), None);
    }

    #[test]
    fn inlinable_primitives() {
        assert_eq!(Primitive::Bt.opcode(), Some(Opcode::Bt));
        assert_eq!(Primitive::Lte.opcode(), Some(Opcode::Lte));
        assert_eq!(Primitive::Car.opcode(), None);
    }

    #[test]
    fn arities() {
        assert!(Primitive::Add.arity().accepts(0));
        assert!(!Primitive::Sub.arity().accepts(0));
        assert!(!Primitive::Lt.arity().accepts(1));
        assert!(!Primitive::Cons.arity().accepts(3));
    }
}
