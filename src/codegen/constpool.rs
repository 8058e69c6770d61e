//! Class-scoped constant pool with de-duplication.

use std::collections::HashMap;

use crate::ast::{ConstValue, Type};

/// Highest index a pool may hand out.
pub const MAX_ENTRIES: u32 = 0xFFFF;

/// A pool entry. Floating-point values are keyed by their bit patterns so
/// that entries can be hashed and `-0.0`/`NaN` payloads stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
}

impl Constant {
    /// Pool slots occupied; longs and doubles take two.
    pub fn slots(&self) -> u32 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            Constant::Utf8(_) => 1,
            Constant::Integer(_) => 3,
            Constant::Float(_) => 4,
            Constant::Long(_) => 5,
            Constant::Double(_) => 6,
            Constant::Class(_) => 7,
            Constant::String(_) => 8,
            Constant::FieldRef(..) => 9,
            Constant::MethodRef(..) => 10,
            Constant::InterfaceMethodRef(..) => 11,
            Constant::NameAndType(..) => 12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstantPool {
    /// Indexed by pool index; slot 0 and the upper half of wide entries are empty.
    slots: Vec<Option<Constant>>,
    lookup: HashMap<Constant, u16>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPool {
    pub fn new() -> Self {
        Self { slots: vec![None], lookup: HashMap::new() }
    }

    /// Drops every entry; done once per class.
    pub fn reset(&mut self) {
        self.slots.truncate(1);
        self.lookup.clear();
    }

    /// Index the next entry would receive. Exceeding [`MAX_ENTRIES`] is a
    /// limit diagnostic, reported by the class driver.
    pub fn num_entries(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.slots.get(index as usize).and_then(Option::as_ref)
    }

    /// Entries in index order.
    pub fn entries(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (i as u16, c)))
    }

    /// Adds `c` unless an equal entry exists, returning its index.
    /// Indices past the limit wrap; the class is voided in that case.
    pub fn put(&mut self, c: Constant) -> u16 {
        if let Some(&index) = self.lookup.get(&c) {
            return index;
        }
        let index = (self.slots.len() as u32 & 0xFFFF) as u16;
        let wide = c.slots() == 2;
        self.lookup.insert(c.clone(), index);
        self.slots.push(Some(c));
        if wide {
            self.slots.push(None);
        }
        index
    }

    pub fn put_utf8(&mut self, s: &str) -> u16 {
        self.put(Constant::Utf8(s.to_string()))
    }

    pub fn put_int(&mut self, v: i32) -> u16 {
        self.put(Constant::Integer(v))
    }

    pub fn put_float(&mut self, v: f32) -> u16 {
        self.put(Constant::Float(v.to_bits()))
    }

    pub fn put_long(&mut self, v: i64) -> u16 {
        self.put(Constant::Long(v))
    }

    pub fn put_double(&mut self, v: f64) -> u16 {
        self.put(Constant::Double(v.to_bits()))
    }

    pub fn put_string(&mut self, s: &str) -> u16 {
        let utf8 = self.put_utf8(s);
        self.put(Constant::String(utf8))
    }

    /// Class constant by internal name (or array descriptor).
    pub fn put_class(&mut self, name: &str) -> u16 {
        let utf8 = self.put_utf8(name);
        self.put(Constant::Class(utf8))
    }

    pub fn put_type(&mut self, ty: &Type) -> u16 {
        self.put_class(&ty.class_constant_name())
    }

    pub fn put_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let n = self.put_utf8(name);
        let d = self.put_utf8(descriptor);
        self.put(Constant::NameAndType(n, d))
    }

    pub fn put_field(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.put_class(owner);
        let nat = self.put_name_and_type(name, descriptor);
        self.put(Constant::FieldRef(class, nat))
    }

    pub fn put_method(&mut self, owner: &str, name: &str, descriptor: &str, interface: bool) -> u16 {
        let class = self.put_class(owner);
        let nat = self.put_name_and_type(name, descriptor);
        if interface {
            self.put(Constant::InterfaceMethodRef(class, nat))
        } else {
            self.put(Constant::MethodRef(class, nat))
        }
    }

    /// Loadable constant for a folded value.
    pub fn put_value(&mut self, value: &ConstValue) -> u16 {
        match value {
            ConstValue::Int(v) => self.put_int(*v),
            ConstValue::Long(v) => self.put_long(*v),
            ConstValue::Float(v) => self.put_float(*v),
            ConstValue::Double(v) => self.put_double(*v),
            ConstValue::String(s) => self.put_string(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_shared() {
        let mut pool = ConstantPool::new();
        let a = pool.put_string("hello");
        let b = pool.put_string("hello");
        assert_eq!(a, b);
        assert_eq!(pool.num_entries(), 3);
        assert_eq!(pool.get(a), Some(&Constant::String(1)));
    }

    #[test]
    fn wide_entries_take_two_slots() {
        let mut pool = ConstantPool::new();
        let l = pool.put_long(1 << 40);
        let i = pool.put_int(7);
        assert_eq!(l, 1);
        assert_eq!(i, 3);
        assert!(pool.get(2).is_none());
    }

    #[test]
    fn float_keys_use_bit_patterns() {
        let mut pool = ConstantPool::new();
        let pos = pool.put_float(0.0);
        let neg = pool.put_float(-0.0);
        assert_ne!(pos, neg);
    }

    #[test]
    fn reset_starts_over() {
        let mut pool = ConstantPool::new();
        pool.put_method("java/lang/Object", "<init>", "()V", false);
        assert!(pool.num_entries() > 1);
        pool.reset();
        assert_eq!(pool.num_entries(), 1);
        assert_eq!(pool.put_int(5), 1);
    }
}
