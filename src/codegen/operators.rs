//! Operator-to-instruction selection.
//!
//! An operator on a given operand type maps to one opcode, or for long and
//! floating-point comparisons to a compare instruction followed by a
//! conditional branch, encoded as `(compare << PRE_SHIFT) | branch`.

use super::opcodes::*;
use crate::ast::{BinaryOp, Type, UnaryOp};
use crate::error::{Error, Result};

pub const PRE_SHIFT: u32 = 9;

const fn composite(pre: u8, op: u8) -> u32 {
    ((pre as u32) << PRE_SHIFT) | op as u32
}

/// Splits a composite opcode into its prefix instruction and final opcode.
pub fn split(opcode: u32) -> (Option<u8>, u8) {
    if opcode >= 1 << PRE_SHIFT {
        (Some((opcode >> PRE_SHIFT) as u8), (opcode & 0xFF) as u8)
    } else {
        (None, opcode as u8)
    }
}

#[derive(Clone, Copy)]
enum Family {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

fn family(ty: &Type) -> Option<Family> {
    match ty {
        Type::Boolean | Type::Byte | Type::Short | Type::Char | Type::Int => Some(Family::Int),
        Type::Long => Some(Family::Long),
        Type::Float => Some(Family::Float),
        Type::Double => Some(Family::Double),
        Type::Null | Type::Class(_) | Type::Array(_) => Some(Family::Reference),
        Type::Void => None,
    }
}

/// Opcode for `lhs op rhs` carried out in `operand`. `&&`, `||` and string
/// concatenation have no opcode.
pub fn binary(op: BinaryOp, operand: &Type) -> Result<u32> {
    use BinaryOp::*;
    let unsupported = || Error::internal(format!("no instruction for `{:?}` on {}", op, operand));
    let fam = family(operand).ok_or_else(unsupported)?;
    let arith = |base: u8| -> Option<u32> {
        match fam {
            Family::Int => Some(base as u32),
            Family::Long => Some(base as u32 + 1),
            Family::Float => Some(base as u32 + 2),
            Family::Double => Some(base as u32 + 3),
            Family::Reference => None,
        }
    };
    let bitwise = |base: u8| -> Option<u32> {
        match fam {
            Family::Int => Some(base as u32),
            Family::Long => Some(base as u32 + 1),
            _ => None,
        }
    };
    let compare = |int_op: u8, cond: u8, float_pre: u8, double_pre: u8| -> Option<u32> {
        match fam {
            Family::Int => Some(int_op as u32),
            Family::Long => Some(composite(LCMP, cond)),
            Family::Float => Some(composite(float_pre, cond)),
            Family::Double => Some(composite(double_pre, cond)),
            Family::Reference => match op {
                Eq => Some(IF_ACMPEQ as u32),
                Ne => Some(IF_ACMPNE as u32),
                _ => None,
            },
        }
    };
    let opcode = match op {
        Plus => arith(IADD),
        Minus => arith(ISUB),
        Mul => arith(IMUL),
        Div => arith(IDIV),
        Mod => arith(IREM),
        BitAnd => bitwise(IAND),
        BitOr => bitwise(IOR),
        BitXor => bitwise(IXOR),
        Shl => bitwise(ISHL),
        Shr => bitwise(ISHR),
        Ushr => bitwise(IUSHR),
        Eq => compare(IF_ICMPEQ, IFEQ, FCMPL, DCMPL),
        Ne => compare(IF_ICMPNE, IFNE, FCMPL, DCMPL),
        Lt => compare(IF_ICMPLT, IFLT, FCMPG, DCMPG),
        Gt => compare(IF_ICMPGT, IFGT, FCMPL, DCMPL),
        Le => compare(IF_ICMPLE, IFLE, FCMPG, DCMPG),
        Ge => compare(IF_ICMPGE, IFGE, FCMPL, DCMPL),
        And | Or => None,
    };
    opcode.ok_or_else(unsupported)
}

/// Opcode for an arithmetic unary operator. `!`, `+` and the null check
/// are lowered without one.
pub fn unary(op: UnaryOp, operand: &Type) -> Result<u8> {
    let unsupported = || Error::internal(format!("no instruction for `{:?}` on {}", op, operand));
    let fam = family(operand).ok_or_else(unsupported)?;
    let typed = |base: u8| match fam {
        Family::Int => Some(base),
        Family::Long => Some(base + 1),
        Family::Float => Some(base + 2),
        Family::Double => Some(base + 3),
        Family::Reference => None,
    };
    let opcode = match op {
        UnaryOp::Neg => typed(INEG),
        UnaryOp::Compl => match fam {
            Family::Int => Some(IXOR),
            Family::Long => Some(LXOR),
            _ => None,
        },
        UnaryOp::PreInc | UnaryOp::PostInc => typed(IADD),
        UnaryOp::PreDec | UnaryOp::PostDec => typed(ISUB),
        UnaryOp::Pos | UnaryOp::Not | UnaryOp::NullCheck => None,
    };
    opcode.ok_or_else(unsupported)
}
