mod common;

use common::*;
use stackgen::ast::{flags, ClassMember, FieldDecl, MethodDecl, Span, TreeMaker, Type, OBJECT_CLASS};
use stackgen::codegen::{CLASS_INIT, ConstantPool};
use stackgen::Config;

fn constructor(m: &mut TreeMaker) -> MethodDecl {
    let sup = m.method_sym(OBJECT_CLASS, "<init>", vec![], Type::Void, flags::PUBLIC);
    let call = m.exec(m.ctor_call(true, &sup, vec![]));
    let ret = m.return_stmt(None);
    let body = m.block(vec![call, ret]);
    m.method("<init>", flags::PUBLIC, vec![], Type::Void, Some(body))
}

fn pool_len(pool: &ConstantPool) -> usize {
    pool.entries().count()
}

#[cfg(test)]
mod class_gen_tests {
    use super::*;

    #[test]
    fn test_field_initializer_runs_after_super_call() {
        let mut m = TreeMaker::new();
        let f = m.field_sym(CLASS, "f", Type::Int, 0);
        let ctor = constructor(&mut m);
        let class = m.class(
            CLASS,
            vec![
                ClassMember::Field(FieldDecl { span: Span::line(2), sym: f, init: Some(m.int(4)) }),
                ClassMember::Method(ctor),
            ],
        );
        let (out, sink) = compile(&class);
        assert!(sink.is_empty());
        let attr = code(&out, "<init>");
        assert_eq!(
            mnemonics(attr),
            vec!["aload_0", "invokespecial", "aload_0", "iconst_4", "putfield", "return"]
        );
        assert_eq!(out.method("<init>").unwrap().descriptor, "()V");
    }

    #[test]
    fn test_static_initializer_is_synthesized() {
        let mut m = TreeMaker::new();
        let counter = m.field_sym(CLASS, "counter", Type::Int, flags::STATIC);
        let class = m.class(
            CLASS,
            vec![ClassMember::Field(FieldDecl { span: Span::line(2), sym: counter, init: Some(m.int(5)) })],
        );
        let (out, _) = compile(&class);
        let clinit = out.method(CLASS_INIT).expect("no class initializer");
        assert_ne!(clinit.flags & flags::STATIC, 0);
        assert_eq!(mnemonics(code(&out, CLASS_INIT)), vec!["iconst_5", "putstatic", "return"]);
    }

    #[test]
    fn test_abstract_method_has_no_code() {
        let m = TreeMaker::new();
        let f = m.method("f", flags::PUBLIC | flags::ABSTRACT, vec![], Type::Void, None);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        assert_eq!(out.error_count, 0);
        assert!(out.method("f").unwrap().code.is_none());
    }

    #[test]
    fn test_string_constant_is_loaded_from_the_pool() {
        let mut m = TreeMaker::new();
        let ret = m.return_stmt(Some(m.string("hi")));
        let f = static_method(&mut m, "f", vec![], Type::string(), vec![ret]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr), vec!["ldc", "areturn"]);
        let index = u16::from(attr.code[1]);
        assert!(out.pool.get(index).is_some());
    }

    #[test]
    fn test_line_numbers_follow_statements() {
        let mut m = TreeMaker::new();
        let g = m.method_sym(CLASS, "g", vec![], Type::Void, flags::STATIC);
        m.at(3);
        let first = m.exec(m.call(&g, vec![]));
        m.at(4);
        let second = m.exec(m.call(&g, vec![]));
        m.at(5);
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![first, second]);
        let class = class_of(&m, vec![f]);

        let (out, _) = compile(&class);
        let lines: Vec<(u16, u16)> = code(&out, "f")
            .line_numbers
            .as_ref()
            .expect("line numbers are on by default")
            .iter()
            .map(|e| (e.start_pc, e.line))
            .collect();
        assert_eq!(lines, vec![(0, 3), (3, 4), (6, 5)]);

        let (out, _) = compile_with(&class, Config::from_options(&["-g:none"]).unwrap());
        assert!(code(&out, "f").line_numbers.is_none());
    }

    #[test]
    fn test_local_variable_table_with_full_debug_info() {
        let mut m = TreeMaker::new();
        let n = m.local("n", Type::Int);
        let f = static_method(&mut m, "f", vec![n], Type::Void, vec![]);
        let (out, _) = compile_with(&class_of(&m, vec![f]), Config::from_options(&["-g"]).unwrap());
        let vars = code(&out, "f").local_vars.clone().expect("no local variable table");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "n");
        assert_eq!(vars[0].descriptor, "I");
        assert_eq!((vars[0].start_pc, vars[0].length, vars[0].reg), (0, 1, 0));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut m = TreeMaker::new();
        let g = m.method_sym(CLASS, "g", vec![Type::Int], Type::Int, flags::STATIC);
        let x = m.local("x", Type::Int);
        let ret = m.return_stmt(Some(m.call(&g, vec![m.ident(&x)])));
        let f = static_method(&mut m, "f", vec![x], Type::Int, vec![ret]);
        let ctor = constructor(&mut m);
        let class = class_of(&m, vec![f, ctor]);

        let (first, _) = compile(&class);
        let (second, _) = compile(&class);
        assert_eq!(first.methods.len(), second.methods.len());
        for (a, b) in first.methods.iter().zip(&second.methods) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.code, b.code);
        }
        assert_eq!(pool_len(&first.pool), pool_len(&second.pool));
        assert_eq!(first.method("f").unwrap().descriptor, "(I)I");
    }
}
