//! Type codes: the machine-level classification of values.
//!
//! The numbering is load-bearing: typed instruction families are laid out
//! so that `iload + truncate(tc)`, `iaload + tc` and
//! `i2l + 3 * from + offset` select the right opcode.

use crate::ast::Type;

pub const INT: u8 = 0;
pub const LONG: u8 = 1;
pub const FLOAT: u8 = 2;
pub const DOUBLE: u8 = 3;
pub const OBJECT: u8 = 4;
pub const BYTE: u8 = 5;
pub const CHAR: u8 = 6;
pub const SHORT: u8 = 7;
pub const VOID: u8 = 8;

/// Type code of an erased type; booleans are bytes.
pub fn of(ty: &Type) -> u8 {
    match ty {
        Type::Boolean | Type::Byte => BYTE,
        Type::Short => SHORT,
        Type::Char => CHAR,
        Type::Int => INT,
        Type::Long => LONG,
        Type::Float => FLOAT,
        Type::Double => DOUBLE,
        Type::Void => VOID,
        Type::Null | Type::Class(_) | Type::Array(_) => OBJECT,
    }
}

/// Collapses the sub-int codes onto `INT`.
pub fn truncate(tc: u8) -> u8 {
    match tc {
        BYTE | SHORT | CHAR => INT,
        _ => tc,
    }
}

/// Operand-stack words taken by a value of this code.
pub fn width(tc: u8) -> u32 {
    match tc {
        LONG | DOUBLE => 2,
        VOID => 0,
        _ => 1,
    }
}

/// `newarray` element code, 0 for reference elements, 1 for nested arrays.
pub fn array_code(elem: &Type) -> u8 {
    match elem {
        Type::Boolean => 4,
        Type::Char => 5,
        Type::Float => 6,
        Type::Double => 7,
        Type::Byte => 8,
        Type::Short => 9,
        Type::Int => 10,
        Type::Long => 11,
        Type::Class(_) | Type::Null => 0,
        Type::Array(_) => 1,
        Type::Void => 0,
    }
}

pub fn name(tc: u8) -> &'static str {
    match tc {
        INT => "int",
        LONG => "long",
        FLOAT => "float",
        DOUBLE => "double",
        OBJECT => "object",
        BYTE => "byte",
        CHAR => "char",
        SHORT => "short",
        _ => "void",
    }
}
