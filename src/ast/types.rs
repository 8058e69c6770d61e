//! Erased types, constants and resolved symbols.

use std::fmt;

/// Access and property flags carried by class members.
pub mod flags {
    pub const PUBLIC: u32 = 0x0001;
    pub const PRIVATE: u32 = 0x0002;
    pub const PROTECTED: u32 = 0x0004;
    pub const STATIC: u32 = 0x0008;
    pub const FINAL: u32 = 0x0010;
    pub const SYNCHRONIZED: u32 = 0x0020;
    pub const INTERFACE: u32 = 0x0200;
    pub const ABSTRACT: u32 = 0x0400;
    pub const SYNTHETIC: u32 = 0x1000;
}

pub const OBJECT_CLASS: &str = "java/lang/Object";
pub const STRING_CLASS: &str = "java/lang/String";
pub const THROWABLE_CLASS: &str = "java/lang/Throwable";
pub const STRING_BUILDER_CLASS: &str = "java/lang/StringBuilder";

/// An erased type as seen by the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    /// Type of the `null` literal.
    Null,
    /// Class or interface, by internal name (`java/lang/String`).
    Class(String),
    Array(Box<Type>),
}

impl Type {
    pub fn class(name: impl Into<String>) -> Type {
        Type::Class(name.into())
    }

    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn object() -> Type {
        Type::class(OBJECT_CLASS)
    }

    pub fn string() -> Type {
        Type::class(STRING_CLASS)
    }

    pub fn throwable() -> Type {
        Type::class(THROWABLE_CLASS)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Boolean
                | Type::Byte
                | Type::Short
                | Type::Char
                | Type::Int
                | Type::Long
                | Type::Float
                | Type::Double
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Null | Type::Class(_) | Type::Array(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::Class(name) if name == STRING_CLASS)
    }

    /// True for the types whose values live in an `int` slot and may select a switch.
    pub fn is_int_like(&self) -> bool {
        matches!(self, Type::Byte | Type::Short | Type::Char | Type::Int)
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Number of array dimensions, zero for non-array types.
    pub fn dimensions(&self) -> usize {
        let mut n = 0;
        let mut t = self;
        while let Type::Array(elem) = t {
            n += 1;
            t = elem;
        }
        n
    }

    /// Width in operand-stack words.
    pub fn width(&self) -> u32 {
        match self {
            Type::Void => 0,
            Type::Long | Type::Double => 2,
            _ => 1,
        }
    }

    /// Field descriptor, e.g. `I`, `[Ljava/lang/String;`.
    pub fn descriptor(&self) -> String {
        match self {
            Type::Void => "V".to_string(),
            Type::Boolean => "Z".to_string(),
            Type::Byte => "B".to_string(),
            Type::Short => "S".to_string(),
            Type::Char => "C".to_string(),
            Type::Int => "I".to_string(),
            Type::Long => "J".to_string(),
            Type::Float => "F".to_string(),
            Type::Double => "D".to_string(),
            Type::Null => format!("L{};", OBJECT_CLASS),
            Type::Class(name) => format!("L{};", name),
            Type::Array(elem) => format!("[{}", elem.descriptor()),
        }
    }

    /// Name used for a class constant: internal name for classes,
    /// descriptor for arrays.
    pub fn class_constant_name(&self) -> String {
        match self {
            Type::Class(name) => name.clone(),
            Type::Null => OBJECT_CLASS.to_string(),
            other => other.descriptor(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Boolean => write!(f, "boolean"),
            Type::Byte => write!(f, "byte"),
            Type::Short => write!(f, "short"),
            Type::Char => write!(f, "char"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Null => write!(f, "null"),
            Type::Class(name) => write!(f, "{}", name.replace('/', ".")),
            Type::Array(elem) => write!(f, "{}[]", elem),
        }
    }
}

/// Erased method signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodType {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl MethodType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self { params, ret }
    }

    pub fn void() -> Self {
        Self::new(Vec::new(), Type::Void)
    }

    pub fn descriptor(&self) -> String {
        let mut d = String::from("(");
        for p in &self.params {
            d.push_str(&p.descriptor());
        }
        d.push(')');
        d.push_str(&self.ret.descriptor());
        d
    }

    /// Stack words taken by the arguments.
    pub fn param_words(&self) -> u32 {
        self.params.iter().map(Type::width).sum()
    }
}

/// A folded compile-time constant. Booleans and chars fold to `Int`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl ConstValue {
    pub fn as_int(&self) -> i32 {
        match self {
            ConstValue::Int(v) => *v,
            ConstValue::Long(v) => *v as i32,
            ConstValue::Float(v) => *v as i32,
            ConstValue::Double(v) => *v as i32,
            ConstValue::String(_) => 0,
        }
    }

    pub fn as_long(&self) -> i64 {
        match self {
            ConstValue::Int(v) => *v as i64,
            ConstValue::Long(v) => *v,
            ConstValue::Float(v) => *v as i64,
            ConstValue::Double(v) => *v as i64,
            ConstValue::String(_) => 0,
        }
    }

    pub fn as_float(&self) -> f32 {
        match self {
            ConstValue::Int(v) => *v as f32,
            ConstValue::Long(v) => *v as f32,
            ConstValue::Float(v) => *v,
            ConstValue::Double(v) => *v as f32,
            ConstValue::String(_) => 0.0,
        }
    }

    pub fn as_double(&self) -> f64 {
        match self {
            ConstValue::Int(v) => *v as f64,
            ConstValue::Long(v) => *v as f64,
            ConstValue::Float(v) => *v as f64,
            ConstValue::Double(v) => *v,
            ConstValue::String(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Unique identity of a local variable within a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// A local variable or parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVar {
    pub id: VarId,
    pub name: String,
    pub ty: Type,
    /// Folded initializer of a `final` local, if it is a constant.
    pub const_value: Option<ConstValue>,
}

/// A resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSymbol {
    pub owner: String,
    pub name: String,
    pub ty: Type,
    pub flags: u32,
    pub const_value: Option<ConstValue>,
}

impl FieldSymbol {
    pub fn is_static(&self) -> bool {
        self.flags & flags::STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.flags & flags::PRIVATE != 0
    }
}

/// A resolved method or constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSymbol {
    pub owner: String,
    pub name: String,
    pub ty: MethodType,
    pub flags: u32,
    /// Whether the owner is an interface (selects `invokeinterface`).
    pub owner_is_interface: bool,
}

impl MethodSymbol {
    pub fn is_static(&self) -> bool {
        self.flags & flags::STATIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.flags & flags::PRIVATE != 0
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

/// What an identifier or selection refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Local(VarId),
    Field(FieldSymbol),
    Method(MethodSymbol),
    /// The `length` pseudo-field of arrays.
    ArrayLength,
    /// A type name used as a qualifier, as in `Math.max`.
    Type(Type),
}
