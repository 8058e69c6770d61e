//! Symbol queries the generator makes of the front end.
//!
//! Attribution resolves every user-written reference, but the generator
//! synthesizes a few calls of its own (string building, null checks) and
//! needs subtype and accessibility answers when it picks instructions.

use std::collections::{HashMap, HashSet};

use crate::ast::{
    flags, MethodSymbol, MethodType, Type, OBJECT_CLASS, STRING_BUILDER_CLASS, STRING_CLASS,
};
use crate::error::{Error, Result};

pub trait Resolver {
    /// Resolves a library method the generator calls on its own behalf.
    fn resolve_internal_method(&self, site: &Type, name: &str, argtypes: &[Type]) -> Result<MethodSymbol>;

    /// Whether code in class `from` may name class `owner`.
    fn is_accessible(&self, from: &str, owner: &str) -> bool;

    /// Whether `t` is a subtype of `s`.
    fn is_subtype(&self, t: &Type, s: &Type) -> bool;

    /// Whether `class` is an interface.
    fn is_interface(&self, _class: &str) -> bool {
        false
    }
}

/// A resolver that knows the members the generator synthesizes calls to
/// and whatever class hierarchy it has been told about.
#[derive(Debug, Clone, Default)]
pub struct BasicResolver {
    superclasses: HashMap<String, String>,
    interfaces: HashMap<String, Vec<String>>,
    interface_names: HashSet<String>,
    inaccessible: HashSet<String>,
    methods: Vec<MethodSymbol>,
}

impl BasicResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_superclass(mut self, class: &str, superclass: &str) -> Self {
        self.superclasses.insert(class.to_string(), superclass.to_string());
        self
    }

    pub fn with_interface(mut self, class: &str, interface: &str) -> Self {
        self.interface_names.insert(interface.to_string());
        self.interfaces.entry(class.to_string()).or_default().push(interface.to_string());
        self
    }

    /// Marks `class` as not accessible from any other class.
    pub fn with_inaccessible(mut self, class: &str) -> Self {
        self.inaccessible.insert(class.to_string());
        self
    }

    /// Makes an extra method known to [`Resolver::resolve_internal_method`].
    pub fn with_method(mut self, method: MethodSymbol) -> Self {
        self.methods.push(method);
        self
    }

    fn is_subclass(&self, class: &str, ancestor: &str) -> bool {
        if class == ancestor || ancestor == OBJECT_CLASS {
            return true;
        }
        if let Some(ifaces) = self.interfaces.get(class) {
            if ifaces.iter().any(|i| self.is_subclass(i, ancestor)) {
                return true;
            }
        }
        match self.superclasses.get(class) {
            Some(sup) => self.is_subclass(sup, ancestor),
            None => false,
        }
    }

    fn builtin(site: &Type, name: &str, argtypes: &[Type]) -> Option<MethodSymbol> {
        let method = |owner: &str, params: Vec<Type>, ret: Type| MethodSymbol {
            owner: owner.to_string(),
            name: name.to_string(),
            ty: MethodType::new(params, ret),
            flags: flags::PUBLIC,
            owner_is_interface: false,
        };
        let Type::Class(owner) = site else { return None };
        let owner = owner.as_str();
        match (owner, name, argtypes) {
            (STRING_BUILDER_CLASS, "<init>", []) => Some(method(owner, vec![], Type::Void)),
            (STRING_BUILDER_CLASS, "<init>", [s]) if s.is_string() => {
                Some(method(owner, vec![Type::string()], Type::Void))
            }
            (STRING_BUILDER_CLASS, "toString", []) => Some(method(owner, vec![], Type::string())),
            (STRING_BUILDER_CLASS, "append", [arg]) => {
                let param = match arg {
                    Type::Byte | Type::Short | Type::Int => Type::Int,
                    Type::Boolean | Type::Char | Type::Long | Type::Float | Type::Double => arg.clone(),
                    Type::Class(c) if c == STRING_CLASS => Type::string(),
                    Type::Array(elem) if **elem == Type::Char => arg.clone(),
                    Type::Null | Type::Class(_) | Type::Array(_) => Type::object(),
                    Type::Void => return None,
                };
                Some(method(owner, vec![param], Type::class(STRING_BUILDER_CLASS)))
            }
            (OBJECT_CLASS, "getClass", []) => Some(method(owner, vec![], Type::class("java/lang/Class"))),
            _ => None,
        }
    }
}

impl Resolver for BasicResolver {
    fn resolve_internal_method(&self, site: &Type, name: &str, argtypes: &[Type]) -> Result<MethodSymbol> {
        let site_name = site.class_constant_name();
        let registered = self.methods.iter().find(|m| {
            m.owner == site_name
                && m.name == name
                && m.ty.params.len() == argtypes.len()
                && m.ty.params.iter().zip(argtypes).all(|(p, a)| self.is_subtype(a, p))
        });
        if let Some(m) = registered {
            return Ok(m.clone());
        }
        Self::builtin(site, name, argtypes).ok_or_else(|| Error::UnresolvedMethod {
            owner: site_name,
            name: name.to_string(),
        })
    }

    fn is_accessible(&self, from: &str, owner: &str) -> bool {
        from == owner || !self.inaccessible.contains(owner)
    }

    fn is_subtype(&self, t: &Type, s: &Type) -> bool {
        if t == s {
            return true;
        }
        match (t, s) {
            (Type::Null, s) => s.is_reference(),
            (Type::Class(a), Type::Class(b)) => self.is_subclass(a, b),
            (Type::Array(_), Type::Class(b)) => {
                b == OBJECT_CLASS || b == "java/lang/Cloneable" || b == "java/io/Serializable"
            }
            (Type::Array(a), Type::Array(b)) => a.is_reference() && self.is_subtype(a, b),
            _ => false,
        }
    }

    fn is_interface(&self, class: &str) -> bool {
        self.interface_names.contains(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_overloads_follow_argument_types() {
        let r = BasicResolver::new();
        let sb = Type::class(STRING_BUILDER_CLASS);
        let d = |t: Type| r.resolve_internal_method(&sb, "append", &[t]).unwrap().ty.descriptor();
        assert_eq!(d(Type::Short), "(I)Ljava/lang/StringBuilder;");
        assert_eq!(d(Type::Char), "(C)Ljava/lang/StringBuilder;");
        assert_eq!(d(Type::string()), "(Ljava/lang/String;)Ljava/lang/StringBuilder;");
        assert_eq!(d(Type::class("p/Foo")), "(Ljava/lang/Object;)Ljava/lang/StringBuilder;");
    }

    #[test]
    fn unknown_methods_are_errors() {
        let r = BasicResolver::new();
        let err = r.resolve_internal_method(&Type::string(), "intern", &[]).unwrap_err();
        assert!(matches!(err, Error::UnresolvedMethod { .. }));
    }

    #[test]
    fn registered_methods_take_precedence() {
        let m = MethodSymbol {
            owner: "p/Util".into(),
            name: "check".into(),
            ty: MethodType::new(vec![Type::object()], Type::Void),
            flags: flags::PUBLIC | flags::STATIC,
            owner_is_interface: false,
        };
        let r = BasicResolver::new().with_method(m.clone());
        assert_eq!(r.resolve_internal_method(&Type::class("p/Util"), "check", &[Type::string()]).unwrap(), m);
    }

    #[test]
    fn subtyping_walks_the_hierarchy() {
        let r = BasicResolver::new()
            .with_superclass("p/B", "p/A")
            .with_interface("p/A", "p/I");
        assert!(r.is_subtype(&Type::class("p/B"), &Type::class("p/A")));
        assert!(r.is_subtype(&Type::class("p/B"), &Type::class("p/I")));
        assert!(r.is_subtype(&Type::class("p/B"), &Type::object()));
        assert!(!r.is_subtype(&Type::class("p/A"), &Type::class("p/B")));
        assert!(r.is_subtype(&Type::Null, &Type::string()));
        assert!(r.is_subtype(&Type::array_of(Type::class("p/B")), &Type::array_of(Type::class("p/A"))));
        assert!(!r.is_subtype(&Type::array_of(Type::Int), &Type::array_of(Type::Long)));
        assert!(r.is_interface("p/I"));
    }
}
