//! Distribution of field initializers.
//!
//! Instance field initializers and instance initializer blocks run at the
//! start of every constructor that does not delegate to another one of the
//! same class. Static ones are collected into a synthesized `<clinit>`.

use super::gen::Gen;
use crate::ast::{
    flags, is_synthetic_init, ClassDecl, ClassMember, Expr, ExprKind, FieldDecl, MethodDecl, MethodType,
    NodeId, Span, Stmt, StmtKind, Symbol,
};

pub const CLASS_INIT: &str = "<clinit>";

impl<'r> Gen<'r> {
    /// The methods to generate for `class`, with initializer code moved
    /// into them.
    pub(crate) fn normalize_defs(&mut self, class: &ClassDecl) -> Vec<MethodDecl> {
        let mut methods = Vec::new();
        let mut init_code = Vec::new();
        let mut clinit_code = Vec::new();
        for member in &class.members {
            match member {
                ClassMember::Method(md) => methods.push(md.clone()),
                ClassMember::Initializer { is_static: false, body, .. } => init_code.push(body.clone()),
                ClassMember::Initializer { is_static: true, body, .. } => clinit_code.push(body.clone()),
                ClassMember::Field(field) => {
                    if let Some(init) = &field.init {
                        if !field.sym.is_static() {
                            init_code.push(field_assignment(field, init));
                        } else if field.sym.const_value.is_none() {
                            clinit_code.push(field_assignment(field, init));
                        } else {
                            self.check_string_constant(init.span, field.sym.const_value.as_ref());
                        }
                    }
                    self.check_dimension(field.span, &field.sym.ty);
                }
            }
        }

        if !clinit_code.is_empty() {
            let span = Span {
                start: clinit_code[0].span.start,
                end: clinit_code[clinit_code.len() - 1].span.end,
            };
            methods.push(MethodDecl {
                span,
                name: CLASS_INIT.to_string(),
                flags: flags::STATIC,
                ty: MethodType::void(),
                params: Vec::new(),
                body: Some(Stmt { id: NodeId::SYNTHETIC, span, kind: StmtKind::Block { stats: clinit_code } }),
            });
        }
        if !init_code.is_empty() {
            for md in &mut methods {
                normalize_method(md, &init_code);
            }
        }
        methods
    }
}

/// `f = init` as a statement, assigning to the field of this class.
fn field_assignment(field: &FieldDecl, init: &Expr) -> Stmt {
    let lhs = Expr {
        span: field.span,
        ty: field.sym.ty.clone(),
        const_value: None,
        kind: ExprKind::Ident(Symbol::Field(field.sym.clone())),
    };
    let assign = Expr {
        span: init.span,
        ty: field.sym.ty.clone(),
        const_value: None,
        kind: ExprKind::Assign { lhs: Box::new(lhs), rhs: Box::new(init.clone()) },
    };
    Stmt { id: NodeId::SYNTHETIC, span: field.span, kind: StmtKind::Exec(assign) }
}

/// Inserts `init_code` into an initial constructor after its synthetic
/// outer-instance stores and its `super(...)` call.
fn normalize_method(md: &mut MethodDecl, init_code: &[Stmt]) {
    if !md.is_initial_constructor() {
        return;
    }
    let Some(Stmt { kind: StmtKind::Block { stats }, .. }) = &mut md.body else {
        return;
    };
    if stats.is_empty() {
        return;
    }
    let mut pos = stats.iter().take_while(|s| is_synthetic_init(s)).count();
    // the constructor call
    pos += 1;
    pos += stats[pos.min(stats.len())..].iter().take_while(|s| is_synthetic_init(s)).count();
    let pos = pos.min(stats.len());
    let tail = stats.split_off(pos);
    stats.extend(init_code.iter().cloned());
    stats.extend(tail);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ConstValue, TreeMaker, Type, OBJECT_CLASS};
    use crate::codegen::resolve::BasicResolver;
    use crate::config::Config;
    use crate::diagnostics::{Diagnostics, LimitKind};

    fn constructor(m: &mut TreeMaker) -> MethodDecl {
        let sup = m.method_sym(OBJECT_CLASS, "<init>", vec![], Type::Void, flags::PUBLIC);
        let call = m.exec(m.ctor_call(true, &sup, vec![]));
        let ret = m.return_stmt(None);
        let body = m.block(vec![call, ret]);
        m.method("<init>", flags::PUBLIC, vec![], Type::Void, Some(body))
    }

    #[test]
    fn instance_initializers_follow_the_super_call() {
        let mut m = TreeMaker::new();
        let f = m.field_sym("p/C", "f", Type::Int, 0);
        let ctor = constructor(&mut m);
        let class = m.class(
            "p/C",
            vec![
                ClassMember::Field(FieldDecl { span: Span::line(2), sym: f, init: Some(m.int(4)) }),
                ClassMember::Method(ctor),
            ],
        );
        let resolver = BasicResolver::new();
        let mut sink = Diagnostics::new();
        let mut gen = Gen::new(Config::default(), &resolver, &mut sink);
        let methods = gen.normalize_defs(&class);
        assert_eq!(methods.len(), 1);
        let stats = methods[0].body.as_ref().unwrap().block_stats();
        assert_eq!(stats.len(), 3);
        assert!(matches!(&stats[1].kind, StmtKind::Exec(Expr { kind: ExprKind::Assign { .. }, .. })));
        assert!(matches!(stats[2].kind, StmtKind::Return(None)));
    }

    #[test]
    fn static_initializers_become_a_class_initializer() {
        let mut m = TreeMaker::new();
        let counter = m.field_sym("p/C", "counter", Type::Int, flags::STATIC);
        let mut limit = m.field_sym("p/C", "LIMIT", Type::Int, flags::STATIC | flags::FINAL);
        limit.const_value = Some(ConstValue::Int(10));
        let block = m.block(vec![]);
        let class = m.class(
            "p/C",
            vec![
                ClassMember::Field(FieldDecl { span: Span::line(2), sym: counter, init: Some(m.int(1)) }),
                ClassMember::Field(FieldDecl { span: Span::line(3), sym: limit, init: Some(m.int(10)) }),
                ClassMember::Initializer { span: Span::line(4), is_static: true, body: block },
            ],
        );
        let resolver = BasicResolver::new();
        let mut sink = Diagnostics::new();
        let mut gen = Gen::new(Config::default(), &resolver, &mut sink);
        let methods = gen.normalize_defs(&class);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, CLASS_INIT);
        assert!(methods[0].is_static());
        // the constant field needs no code
        assert_eq!(methods[0].body.as_ref().unwrap().block_stats().len(), 2);
    }

    #[test]
    fn overlong_constant_strings_are_reported() {
        let mut m = TreeMaker::new();
        let text = "x".repeat(70_000);
        let mut sym = m.field_sym("p/C", "TEXT", Type::string(), flags::STATIC | flags::FINAL);
        sym.const_value = Some(ConstValue::String(text.clone()));
        let class = m.class(
            "p/C",
            vec![ClassMember::Field(FieldDecl { span: Span::line(2), sym, init: Some(m.string(&text)) })],
        );
        let resolver = BasicResolver::new();
        let mut sink = Diagnostics::new();
        {
            let mut gen = Gen::new(Config::default(), &resolver, &mut sink);
            assert!(gen.normalize_defs(&class).is_empty());
        }
        assert!(sink.contains(LimitKind::StringConstant));
    }
}
