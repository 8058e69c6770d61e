mod common;

use common::*;
use stackgen::ast::{flags, MethodDecl, MethodSymbol, TreeMaker, Type};
use stackgen::config::StackMapFormat;
use stackgen::Config;

fn void_static(m: &TreeMaker, name: &str) -> MethodSymbol {
    m.method_sym(CLASS, name, vec![], Type::Void, flags::STATIC)
}

/// `static void f() { try { g(); } finally { h(); } }`
fn try_finally(m: &mut TreeMaker) -> MethodDecl {
    let g = void_static(m, "g");
    let h = void_static(m, "h");
    let call_g = m.exec(m.call(&g, vec![]));
    let body = m.block(vec![call_g]);
    let call_h = m.exec(m.call(&h, vec![]));
    let fin = m.block(vec![call_h]);
    let t = m.try_stmt(body, vec![], Some(fin));
    static_method(m, "f", vec![], Type::Void, vec![t])
}

#[cfg(test)]
mod try_finally_tests {
    use super::*;

    #[test]
    fn test_finally_is_copied_inline() {
        let mut m = TreeMaker::new();
        let f = try_finally(&mut m);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec!["invokestatic", "invokestatic", "goto", "astore_0", "invokestatic", "aload_0", "athrow", "return"]
        );
        assert_eq!(branches(attr), vec![(6, "goto", 15)]);
        // the copies of the finalizer are not covered by the catch-all
        assert_eq!(ranges(attr), vec![(0, 3, 9), (9, 10, 9)]);
        assert!(attr.exception_table.iter().all(|e| e.catch_type == 0));
    }

    #[test]
    fn test_return_value_is_saved_across_the_finalizer() {
        let mut m = TreeMaker::new();
        let g = m.method_sym(CLASS, "g", vec![], Type::Int, flags::STATIC);
        let h = void_static(&m, "h");
        let ret = m.return_stmt(Some(m.call(&g, vec![])));
        let body = m.block(vec![ret]);
        let call_h = m.exec(m.call(&h, vec![]));
        let fin = m.block(vec![call_h]);
        let t = m.try_stmt(body, vec![], Some(fin));
        let f = static_method(&mut m, "f", vec![], Type::Int, vec![t]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec![
                "invokestatic", "istore_0", "invokestatic", "iload_0", "ireturn", "astore_1", "invokestatic", "aload_1",
                "athrow",
            ]
        );
        assert_eq!(ranges(attr), vec![(0, 4, 9), (9, 10, 9)]);
        assert_eq!(attr.max_locals, 2);
    }

    #[test]
    fn test_catch_clause_gets_a_typed_handler() {
        let mut m = TreeMaker::new();
        let g = void_static(&m, "g");
        let h = void_static(&m, "h");
        let e = m.local("e", Type::class("java/lang/Exception"));
        let call_g = m.exec(m.call(&g, vec![]));
        let body = m.block(vec![call_g]);
        let call_h = m.exec(m.call(&h, vec![]));
        let handler = m.block(vec![call_h]);
        let catcher = m.catch(&e, handler);
        let t = m.try_stmt(body, vec![catcher], None);
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![t]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr), vec!["invokestatic", "goto", "astore_0", "invokestatic", "return"]);
        assert_eq!(ranges(attr), vec![(0, 3, 6)]);
        assert_ne!(attr.exception_table[0].catch_type, 0);
    }

    #[test]
    fn test_break_runs_the_finalizer_before_leaving() {
        let mut m = TreeMaker::new();
        let h = void_static(&m, "h");
        let id = m.reserve();
        let brk = m.break_stmt(id);
        let body = m.block(vec![brk]);
        let call_h = m.exec(m.call(&h, vec![]));
        let fin = m.block(vec![call_h]);
        let t = m.try_stmt(body, vec![], Some(fin));
        let loop_body = m.block(vec![t]);
        let lp = m.while_loop(id, m.boolean(true), loop_body);
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![lp]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec!["invokestatic", "goto", "astore_0", "invokestatic", "aload_0", "athrow", "return"]
        );
        assert_eq!(branches(attr), vec![(3, "goto", 12)]);
        // the protected region holds nothing but the finalizer copy
        assert_eq!(ranges(attr), vec![(6, 7, 6)]);
    }

    #[test]
    fn test_zero_jsr_limit_uses_subroutines() {
        let mut m = TreeMaker::new();
        let f = try_finally(&mut m);
        let config = Config::from_options(&["-XDjsrlimit=0"]).unwrap();
        let (out, sink) = compile_with(&class_of(&m, vec![f]), config);
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec![
                "invokestatic", "jsr", "goto", "astore_0", "jsr", "aload_0", "athrow", "astore_1", "invokestatic",
                "ret", "return",
            ]
        );
        assert_eq!(branches(attr), vec![(3, "jsr", 15), (6, "goto", 21), (10, "jsr", 15)]);
        assert_eq!(ranges(attr), vec![(0, 6, 9), (9, 13, 9)]);
        // the finalizer body exists once
        assert_eq!(count(attr, "invokestatic"), 2);
    }

    #[test]
    fn test_stack_maps_rule_out_subroutines() {
        let mut m = TreeMaker::new();
        let f = try_finally(&mut m);
        let mut config = Config::from_options(&["-XDjsrlimit=0"]).unwrap();
        config.stack_map = StackMapFormat::Jsr202;
        let (out, _) = compile_with(&class_of(&m, vec![f]), config);
        let attr = code(&out, "f");
        assert_eq!(count(attr, "jsr"), 0);
        assert_eq!(count(attr, "invokestatic"), 3);
    }

    #[test]
    fn test_synchronized_releases_the_monitor_on_every_exit() {
        let mut m = TreeMaker::new();
        let g = void_static(&m, "g");
        let o = m.local("o", Type::object());
        let call_g = m.exec(m.call(&g, vec![]));
        let body = m.block(vec![call_g]);
        let sync = m.synchronized(m.ident(&o), body);
        let f = static_method(&mut m, "f", vec![o], Type::Void, vec![sync]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec![
                "aload_0", "dup", "astore_1", "monitorenter", "invokestatic", "aload_1", "monitorexit", "goto",
                "astore_2", "aload_1", "monitorexit", "aload_2", "athrow", "return",
            ]
        );
        assert_eq!(ranges(attr), vec![(4, 9, 12), (12, 15, 12)]);
        assert_eq!(branches(attr), vec![(9, "goto", 17)]);
        assert_eq!(attr.max_stack, 2);
    }

    #[test]
    fn test_return_runs_both_nested_finalizers() {
        let mut m = TreeMaker::new();
        let g = void_static(&m, "g");
        let h = void_static(&m, "h");
        let k = void_static(&m, "k");
        let call_g = m.exec(m.call(&g, vec![]));
        let ret = m.return_stmt(None);
        let inner_body = m.block(vec![call_g, ret]);
        let call_h = m.exec(m.call(&h, vec![]));
        let inner_fin = m.block(vec![call_h]);
        let inner = m.try_stmt(inner_body, vec![], Some(inner_fin));
        let outer_body = m.block(vec![inner]);
        let call_k = m.exec(m.call(&k, vec![]));
        let outer_fin = m.block(vec![call_k]);
        let outer = m.try_stmt(outer_body, vec![], Some(outer_fin));
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![outer]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        // g, inner copy, outer copy, then the two catch-alls
        assert_eq!(
            mnemonics(attr),
            vec![
                "invokestatic", "invokestatic", "invokestatic", "return", "astore_0", "invokestatic", "aload_0",
                "athrow", "astore_1", "invokestatic", "aload_1", "athrow",
            ]
        );
        // the inner handler skips both copies, the outer one only its own
        assert_eq!(ranges(attr), vec![(0, 3, 10), (10, 11, 10), (0, 6, 16), (10, 17, 16)]);
        assert_eq!(attr.max_locals, 2);
    }
}
