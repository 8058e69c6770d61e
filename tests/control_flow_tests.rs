mod common;

use common::*;
use stackgen::ast::{flags, BinaryOp, TreeMaker, Type, UnaryOp};

#[cfg(test)]
mod control_flow_tests {
    use super::*;

    #[test]
    fn test_empty_void_method_is_a_single_return() {
        let mut m = TreeMaker::new();
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr), vec!["return"]);
        assert!(attr.exception_table.is_empty());
        assert_eq!(attr.max_stack, 0);
        assert_eq!(attr.max_locals, 0);
    }

    #[test]
    fn test_constant_true_condition_skips_else_branch() {
        let mut m = TreeMaker::new();
        let x = m.local("x", Type::Int);
        let decl = m.var_def(&x, None);
        let one = m.exec(m.assign(m.ident(&x), m.int(1)));
        let two = m.exec(m.assign(m.ident(&x), m.int(2)));
        let cond = m.if_stmt(m.boolean(true), one, Some(two));
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![decl, cond]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        assert_eq!(mnemonics(code(&out, "f")), vec!["iconst_1", "istore_0", "return"]);
    }

    #[test]
    fn test_while_loop_tests_first_and_jumps_back() {
        let mut m = TreeMaker::new();
        let n = m.local("n", Type::Int);
        let id = m.reserve();
        let dec = m.exec(m.unary(UnaryOp::PostDec, m.ident(&n)));
        let cond = m.binary(BinaryOp::Gt, m.ident(&n), m.int(0));
        let lp = m.while_loop(id, cond, dec);
        let f = static_method(&mut m, "f", vec![n], Type::Void, vec![lp]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr), vec!["iload_0", "ifle", "iinc", "goto", "return"]);
        assert_eq!(branches(attr), vec![(1, "ifle", 10), (7, "goto", 0)]);
    }

    #[test]
    fn test_do_loop_tests_last() {
        let mut m = TreeMaker::new();
        let n = m.local("n", Type::Int);
        let id = m.reserve();
        let dec = m.exec(m.unary(UnaryOp::PostDec, m.ident(&n)));
        let cond = m.binary(BinaryOp::Gt, m.ident(&n), m.int(0));
        let lp = m.do_loop(id, dec, cond);
        let f = static_method(&mut m, "f", vec![n], Type::Void, vec![lp]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr), vec!["iinc", "iload_0", "ifgt", "return"]);
        assert_eq!(branches(attr), vec![(4, "ifgt", 0)]);
    }

    #[test]
    fn test_continue_jumps_to_the_step() {
        let mut m = TreeMaker::new();
        let g = m.method_sym(CLASS, "g", vec![], Type::Void, flags::STATIC);
        let n = m.local("n", Type::Int);
        let i = m.local("i", Type::Int);
        let id = m.reserve();
        let init = m.var_def(&i, Some(m.int(0)));
        let cond = m.binary(BinaryOp::Lt, m.ident(&i), m.ident(&n));
        let step = m.exec(m.unary(UnaryOp::PostInc, m.ident(&i)));
        let skip = m.continue_stmt(id);
        let test = m.if_stmt(m.binary(BinaryOp::Eq, m.ident(&i), m.int(2)), skip, None);
        let call = m.exec(m.call(&g, vec![]));
        let body = m.block(vec![test, call]);
        let lp = m.for_loop(id, vec![init], Some(cond), vec![step], body);
        let f = static_method(&mut m, "f", vec![n], Type::Void, vec![lp]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec![
                "iconst_0", "istore_1", "iload_1", "iload_0", "if_icmpge", "iload_1", "iconst_2", "if_icmpne",
                "goto", "invokestatic", "iinc", "goto", "return",
            ]
        );
        assert_eq!(
            branches(attr),
            vec![(4, "if_icmpge", 24), (9, "if_icmpne", 15), (12, "goto", 18), (21, "goto", 2)]
        );
    }

    #[test]
    fn test_break_to_the_next_instruction_is_dropped() {
        let mut m = TreeMaker::new();
        let g = m.method_sym(CLASS, "g", vec![], Type::Void, flags::STATIC);
        let h = m.method_sym(CLASS, "h", vec![], Type::Void, flags::STATIC);
        let label = m.reserve();
        let outer = m.reserve();
        let inner = m.reserve();
        let call = m.exec(m.call(&g, vec![]));
        let brk = m.break_stmt(label);
        let inner_body = m.block(vec![call, brk]);
        let inner_loop = m.while_loop(inner, m.boolean(true), inner_body);
        let outer_body = m.block(vec![inner_loop]);
        let outer_loop = m.while_loop(outer, m.boolean(true), outer_body);
        let labelled = m.labelled(label, "outer", outer_loop);
        let after = m.exec(m.call(&h, vec![]));
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![labelled, after]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        assert_eq!(mnemonics(code(&out, "f")), vec!["invokestatic", "invokestatic", "return"]);
    }

    #[test]
    fn test_short_circuit_and_as_a_value() {
        let mut m = TreeMaker::new();
        let a = m.local("a", Type::Int);
        let b = m.local("b", Type::Int);
        let lhs = m.binary(BinaryOp::Gt, m.ident(&a), m.int(0));
        let rhs = m.binary(BinaryOp::Gt, m.ident(&b), m.int(0));
        let ret = m.return_stmt(Some(m.binary(BinaryOp::And, lhs, rhs)));
        let f = static_method(&mut m, "f", vec![a, b], Type::Boolean, vec![ret]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec!["iload_0", "ifle", "iload_1", "ifle", "iconst_1", "goto", "iconst_0", "ireturn"]
        );
        // both tests fail to the same `iconst_0`
        let targets: Vec<u32> = branches(attr).iter().map(|b| b.2).collect();
        assert_eq!(targets, vec![12, 12, 13]);
    }

    #[test]
    fn test_conditional_expression() {
        let mut m = TreeMaker::new();
        let b = m.local("b", Type::Boolean);
        let ret = m.return_stmt(Some(m.conditional(m.ident(&b), m.int(1), m.int(2))));
        let f = static_method(&mut m, "f", vec![b], Type::Int, vec![ret]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr), vec!["iload_0", "ifeq", "iconst_1", "goto", "iconst_2", "ireturn"]);
        assert_eq!(branches(attr), vec![(1, "ifeq", 8), (5, "goto", 9)]);
    }

    #[test]
    fn test_infinite_loop_needs_no_return() {
        let mut m = TreeMaker::new();
        let id = m.reserve();
        let body = m.block(vec![]);
        let lp = m.while_loop(id, m.boolean(true), body);
        let f = static_method(&mut m, "f", vec![], Type::Int, vec![lp]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr), vec!["goto"]);
        assert_eq!(branches(attr), vec![(0, "goto", 0)]);
    }
}
