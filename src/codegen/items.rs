//! Addressable entities.
//!
//! An `Item` is a value or location the generator has not yet committed to
//! a particular use. Whether it is loaded, stored, invoked, duplicated or
//! turned into a condition decides which instructions are emitted, so a
//! local read for a comparison and a local incremented in place share the
//! same item.

use super::code::Code;
use super::cond_item::CondItem;
use super::constpool::ConstantPool;
use super::opcodes::*;
use super::typecodes::{self, BYTE, CHAR, DOUBLE, FLOAT, INT, LONG, OBJECT, SHORT, VOID};
use crate::ast::{ConstValue, FieldSymbol, MethodSymbol, Type};
use crate::error::{Error, Result};

/// A field or method as referenced from code.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_method: bool,
    pub is_interface: bool,
    /// Argument words popped by an invocation, receiver excluded.
    pub arg_words: u32,
    /// Type code of a field's value or a method's result.
    pub tc: u8,
}

impl MemberRef {
    pub fn field(sym: &FieldSymbol) -> Self {
        Self {
            owner: sym.owner.clone(),
            name: sym.name.clone(),
            descriptor: sym.ty.descriptor(),
            is_method: false,
            is_interface: false,
            arg_words: 0,
            tc: typecodes::of(&sym.ty),
        }
    }

    pub fn method(sym: &MethodSymbol) -> Self {
        Self {
            owner: sym.owner.clone(),
            name: sym.name.clone(),
            descriptor: sym.ty.descriptor(),
            is_method: true,
            is_interface: sym.owner_is_interface,
            arg_words: sym.ty.param_words(),
            tc: typecodes::of(&sym.ty.ret),
        }
    }

    /// The same member, referenced through another class.
    pub fn with_owner(mut self, owner: &str, is_interface: bool) -> Self {
        self.owner = owner.to_string();
        if self.is_method {
            self.is_interface = is_interface;
        }
        self
    }

    fn pool_index(&self, pool: &mut ConstantPool) -> u16 {
        if self.is_method {
            pool.put_method(&self.owner, &self.name, &self.descriptor, self.is_interface)
        } else {
            pool.put_field(&self.owner, &self.name, &self.descriptor)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// No value; the result of a `void` call.
    Void,
    /// A value already on the operand stack.
    Stack { tc: u8 },
    /// `this` or `super`.
    SelfRef { is_super: bool },
    Local { tc: u8, reg: u16 },
    Static { tc: u8, member: MemberRef },
    /// Instance member; the receiver is on the stack.
    Member { tc: u8, member: MemberRef, nonvirtual: bool },
    /// Array element; array and index are on the stack.
    Indexed { tc: u8 },
    Immediate { tc: u8, value: ConstValue },
    /// Assignment whose value has not been used yet.
    Assign { lhs: Box<Item> },
    Cond(CondItem),
}

impl Item {
    pub fn stack(tc: u8) -> Item {
        if tc == VOID {
            Item::Void
        } else {
            Item::Stack { tc }
        }
    }

    pub fn stack_of(ty: &Type) -> Item {
        Item::stack(typecodes::of(ty))
    }

    pub fn immediate(ty: &Type, value: ConstValue) -> Item {
        Item::Immediate { tc: typecodes::of(ty), value }
    }

    pub fn int(value: i32) -> Item {
        Item::Immediate { tc: INT, value: ConstValue::Int(value) }
    }

    pub fn typecode(&self) -> u8 {
        match self {
            Item::Void => VOID,
            Item::SelfRef { .. } => OBJECT,
            Item::Cond(_) => BYTE,
            Item::Assign { lhs } => lhs.typecode(),
            Item::Stack { tc }
            | Item::Local { tc, .. }
            | Item::Static { tc, .. }
            | Item::Member { tc, .. }
            | Item::Indexed { tc }
            | Item::Immediate { tc, .. } => *tc,
        }
    }

    /// Stack words this item occupies below a value being stored to it.
    pub fn width(&self) -> u32 {
        match self {
            Item::Stack { tc } => typecodes::width(*tc),
            Item::Member { .. } => 1,
            Item::Indexed { .. } => 2,
            Item::Assign { lhs } => lhs.width() + typecodes::width(lhs.typecode()),
            _ => 0,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Item::Local { .. })
    }

    fn kind(&self) -> &'static str {
        match self {
            Item::Void => "void",
            Item::Stack { .. } => "stack",
            Item::SelfRef { is_super: false } => "this",
            Item::SelfRef { is_super: true } => "super",
            Item::Local { .. } => "local",
            Item::Static { .. } => "static",
            Item::Member { .. } => "member",
            Item::Indexed { .. } => "indexed",
            Item::Immediate { .. } => "immediate",
            Item::Assign { .. } => "assign",
            Item::Cond(_) => "cond",
        }
    }

    fn illegal(&self, op: &'static str) -> Error {
        Error::IllegalItemOp { op, item: self.kind() }
    }
}

/// Item operations over one method's code buffer and the class pool.
pub struct Items<'a> {
    pub code: &'a mut Code,
    pub pool: &'a mut ConstantPool,
}

impl<'a> Items<'a> {
    pub fn new(code: &'a mut Code, pool: &'a mut ConstantPool) -> Self {
        Self { code, pool }
    }

    /// Puts the item's value on the stack.
    pub fn load(&mut self, item: Item) -> Result<Item> {
        match item {
            Item::Stack { .. } => Ok(item),
            Item::SelfRef { .. } => {
                self.code.emitop0(ALOAD_0)?;
                Ok(Item::stack(OBJECT))
            }
            Item::Local { tc, reg } => {
                let base = typecodes::truncate(tc);
                if reg <= 3 {
                    self.code.emitop0(ILOAD_0 + base * 4 + reg as u8)?;
                } else {
                    self.code.emitop1w(ILOAD + base, reg)?;
                }
                Ok(Item::stack(tc))
            }
            Item::Static { tc, ref member } => {
                let index = member.pool_index(self.pool);
                self.code.emit_field(GETSTATIC, index, tc)?;
                Ok(Item::stack(tc))
            }
            Item::Member { tc, ref member, .. } => {
                let index = member.pool_index(self.pool);
                self.code.emit_field(GETFIELD, index, tc)?;
                Ok(Item::stack(tc))
            }
            Item::Indexed { tc } => {
                self.code.emitop0(IALOAD + tc)?;
                Ok(Item::stack(tc))
            }
            Item::Immediate { tc, ref value } => {
                self.load_immediate(tc, value)?;
                Ok(Item::stack(tc))
            }
            Item::Assign { lhs } => {
                let tc = lhs.typecode();
                self.stash(&lhs, tc)?;
                self.store(&lhs)?;
                Ok(Item::stack(tc))
            }
            Item::Cond(cond) => {
                cond.load(self.code)?;
                Ok(Item::stack(BYTE))
            }
            Item::Void => Err(item.illegal("load")),
        }
    }

    fn load_immediate(&mut self, tc: u8, value: &ConstValue) -> Result<()> {
        match tc {
            INT | BYTE | SHORT | CHAR => {
                let v = value.as_int();
                if (-1..=5).contains(&v) {
                    self.code.emitop0((ICONST_0 as i32 + v) as u8)
                } else if (i8::MIN as i32..=i8::MAX as i32).contains(&v) {
                    self.code.emitop1(BIPUSH, v as i8 as u8)
                } else if (i16::MIN as i32..=i16::MAX as i32).contains(&v) {
                    self.code.emitop2(SIPUSH, v as i16 as u16)
                } else {
                    let index = self.pool.put_int(v);
                    self.code.emit_ldc(index, INT)
                }
            }
            LONG => {
                let v = value.as_long();
                if v == 0 || v == 1 {
                    self.code.emitop0(LCONST_0 + v as u8)
                } else {
                    let index = self.pool.put_long(v);
                    self.code.emit_ldc(index, LONG)
                }
            }
            FLOAT => {
                let v = value.as_float();
                let positive_zero = v == 0.0 && v.is_sign_positive();
                if positive_zero || v == 1.0 || v == 2.0 {
                    self.code.emitop0(FCONST_0 + v as u8)
                } else {
                    let index = self.pool.put_float(v);
                    self.code.emit_ldc(index, FLOAT)
                }
            }
            DOUBLE => {
                let v = value.as_double();
                let positive_zero = v == 0.0 && v.is_sign_positive();
                if positive_zero || v == 1.0 {
                    self.code.emitop0(DCONST_0 + v as u8)
                } else {
                    let index = self.pool.put_double(v);
                    self.code.emit_ldc(index, DOUBLE)
                }
            }
            _ => {
                let index = self.pool.put_value(value);
                self.code.emit_ldc(index, OBJECT)
            }
        }
    }

    /// Stores the value on top of the stack into the item.
    pub fn store(&mut self, item: &Item) -> Result<()> {
        match item {
            Item::Local { tc, reg } => {
                let base = typecodes::truncate(*tc);
                if *reg <= 3 {
                    self.code.emitop0(ISTORE_0 + base * 4 + *reg as u8)?;
                } else {
                    self.code.emitop1w(ISTORE + base, *reg)?;
                }
                self.code.set_defined(*reg);
                Ok(())
            }
            Item::Static { tc, member } => {
                let index = member.pool_index(self.pool);
                self.code.emit_field(PUTSTATIC, index, *tc)
            }
            Item::Member { tc, member, .. } => {
                let index = member.pool_index(self.pool);
                self.code.emit_field(PUTFIELD, index, *tc)
            }
            Item::Indexed { tc } => self.code.emitop0(IASTORE + tc),
            _ => Err(item.illegal("store")),
        }
    }

    /// Invokes the method the item denotes and returns its result.
    pub fn invoke(&mut self, item: &Item) -> Result<Item> {
        match item {
            Item::Static { member, .. } => {
                let index = member.pool_index(self.pool);
                self.code.emit_invoke(INVOKESTATIC, index, member.arg_words, member.tc)?;
                Ok(Item::stack(member.tc))
            }
            Item::Member { member, nonvirtual, .. } => {
                let op = if member.is_interface && !nonvirtual {
                    INVOKEINTERFACE
                } else if *nonvirtual {
                    INVOKESPECIAL
                } else {
                    INVOKEVIRTUAL
                };
                let index = member.pool_index(self.pool);
                self.code.emit_invoke(op, index, member.arg_words, member.tc)?;
                Ok(Item::stack(member.tc))
            }
            _ => Err(item.illegal("invoke")),
        }
    }

    /// Duplicates whatever the item keeps on the stack.
    pub fn duplicate(&mut self, item: &Item) -> Result<()> {
        match item {
            Item::Stack { tc } => self.code.emitop0(if typecodes::width(*tc) == 2 { DUP2 } else { DUP }),
            Item::Member { .. } => self.code.emitop0(DUP),
            Item::Indexed { .. } => self.code.emitop0(DUP2),
            Item::Assign { .. } | Item::Cond(_) => {
                let loaded = self.load(item.clone())?;
                self.duplicate(&loaded)
            }
            _ => Ok(()),
        }
    }

    /// Discards whatever the item keeps on the stack.
    pub fn drop(&mut self, item: &Item) -> Result<()> {
        match item {
            Item::Stack { tc } => self.code.emitop0(if typecodes::width(*tc) == 2 { POP2 } else { POP }),
            Item::Member { .. } => self.code.emitop0(POP),
            Item::Indexed { .. } => self.code.emitop0(POP2),
            Item::Assign { lhs } => self.store(lhs),
            Item::Cond(_) => {
                let loaded = self.load(item.clone())?;
                self.drop(&loaded)
            }
            _ => Ok(()),
        }
    }

    /// Copies a value of type code `toscode` on top of the stack below the
    /// words the item occupies.
    pub fn stash(&mut self, item: &Item, toscode: u8) -> Result<()> {
        let words = typecodes::width(toscode);
        match item {
            Item::Stack { tc } => {
                let base = if typecodes::width(*tc) == 2 { DUP_X2 } else { DUP_X1 };
                self.code.emitop0(base + 3 * (words as u8 - 1))
            }
            Item::Member { .. } => self.code.emitop0(DUP_X1 + 3 * (words as u8 - 1)),
            Item::Indexed { .. } => self.code.emitop0(DUP_X2 + 3 * (words as u8 - 1)),
            Item::Assign { .. } | Item::Cond(_) => Err(item.illegal("stash")),
            _ => self.duplicate(&Item::stack(toscode)),
        }
    }

    /// Converts the item's value to type code `target`.
    pub fn coerce(&mut self, item: Item, target: u8) -> Result<Item> {
        let tc = item.typecode();
        if tc == target {
            return Ok(item);
        }
        if let Item::Immediate { value, .. } = &item {
            let value = match target {
                INT if typecodes::truncate(tc) == INT => return Ok(item),
                INT => Some(ConstValue::Int(value.as_int())),
                LONG => Some(ConstValue::Long(value.as_long())),
                FLOAT => Some(ConstValue::Float(value.as_float())),
                DOUBLE => Some(ConstValue::Double(value.as_double())),
                BYTE => Some(ConstValue::Int(value.as_int() as i8 as i32)),
                CHAR => Some(ConstValue::Int(value.as_int() as u16 as i32)),
                SHORT => Some(ConstValue::Int(value.as_int() as i16 as i32)),
                _ => None,
            };
            if let Some(value) = value {
                return Ok(Item::Immediate { tc: target, value });
            }
        }
        self.load(item)?;
        let from = typecodes::truncate(tc);
        let to = typecodes::truncate(target);
        if from != to {
            if from > DOUBLE || to > DOUBLE {
                return Err(Error::internal(format!(
                    "cannot convert {} to {}",
                    typecodes::name(tc),
                    typecodes::name(target)
                )));
            }
            let offset = if to > from { to - 1 } else { to };
            self.code.emitop0(I2L + from * 3 + offset)?;
        }
        if target != to {
            self.code.emitop0(I2B + target - BYTE)?;
        }
        Ok(Item::stack(target))
    }

    /// Turns the item into a condition, testing non-zero for plain values.
    pub fn mk_cond(&mut self, item: Item) -> Result<CondItem> {
        match item {
            Item::Cond(cond) => Ok(cond),
            Item::Immediate { ref value, .. } => Ok(CondItem::constant(value.as_int() != 0)),
            _ => {
                self.load(item)?;
                Ok(CondItem::new(IFNE, None, None))
            }
        }
    }

    /// Adds `x` to a local in place.
    pub fn incr(&mut self, item: &Item, x: i32) -> Result<()> {
        let Item::Local { tc, reg } = *item else {
            return Err(item.illegal("incr"));
        };
        if tc == INT && (i16::MIN as i32..=i16::MAX as i32).contains(&x) {
            return self.code.emit_iinc(reg, x as i16);
        }
        self.load(item.clone())?;
        if x >= 0 {
            self.load(Item::int(x))?;
            self.code.emitop0(IADD)?;
        } else {
            self.load(Item::int(x.wrapping_neg()))?;
            self.code.emitop0(ISUB)?;
        }
        self.coerce(Item::stack(INT), tc)?;
        self.store(item)
    }
}
