mod common;

use common::*;
use stackgen::ast::{flags, MethodSymbol, Stmt, TreeMaker, Type};
use stackgen::LimitKind;

/// `n` calls of `g()`, three bytes of code each.
fn calls(m: &mut TreeMaker, g: &MethodSymbol, n: usize) -> Vec<Stmt> {
    (0..n).map(|_| m.exec(m.call(g, vec![]))).collect()
}

fn g(m: &TreeMaker) -> MethodSymbol {
    m.method_sym(CLASS, "g", vec![], Type::Void, flags::STATIC)
}

#[cfg(test)]
mod overflow_tests {
    use super::*;

    #[test]
    fn test_long_branches_switch_to_wide_jumps() {
        let mut m = TreeMaker::new();
        let g = g(&m);
        let n = m.local("n", Type::Int);
        let id = m.reserve();
        let stats = calls(&mut m, &g, 11_000);
        let body = m.block(stats);
        let cond = m.binary(stackgen::ast::BinaryOp::Gt, m.ident(&n), m.int(0));
        let lp = m.while_loop(id, cond, body);
        let f = static_method(&mut m, "f", vec![n], Type::Void, vec![lp]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        let ops = mnemonics(attr);
        assert_eq!(&ops[..3], &["iload_0", "ifgt", "goto_w"]);
        assert_eq!(&ops[ops.len() - 2..], &["goto_w", "return"]);
        assert_eq!(count(attr, "goto"), 0);

        let jumps = branches(attr);
        // the inverted test skips the wide jump out of the loop
        assert_eq!(jumps[0], (1, "ifgt", 9));
        assert_eq!(jumps[1].2 as usize, attr.code.len() - 1);
        assert_eq!(jumps[2].2, 0);
    }

    #[test]
    fn test_oversized_method_is_voided_and_reported() {
        let mut m = TreeMaker::new();
        let g = g(&m);
        let stats = calls(&mut m, &g, 22_000);
        let big = static_method(&mut m, "big", vec![], Type::Void, stats);
        let small = static_method(&mut m, "small", vec![], Type::Void, vec![]);
        let (out, sink) = compile(&class_of(&m, vec![big, small]));
        assert!(sink.contains(LimitKind::Code));
        assert_eq!(out.error_count as usize, sink.len());
        assert!(out.method("big").unwrap().code.is_none());
        // other members are unaffected
        assert_eq!(mnemonics(code(&out, "small")), vec!["return"]);
    }

    #[test]
    fn test_try_range_beyond_the_offset_limit_is_reported() {
        let mut m = TreeMaker::new();
        let g = g(&m);
        let h = m.method_sym(CLASS, "h", vec![], Type::Void, flags::STATIC);
        let stats = calls(&mut m, &g, 22_000);
        let body = m.block(stats);
        let call_h = m.exec(m.call(&h, vec![]));
        let fin = m.block(vec![call_h]);
        let t = m.try_stmt(body, vec![], Some(fin));
        let f = static_method(&mut m, "f", vec![], Type::Void, vec![t]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.contains(LimitKind::CodeTooLargeForTry));
        assert!(sink.contains(LimitKind::Code));
        assert!(out.method("f").unwrap().code.is_none());
    }

    #[test]
    fn test_try_overflow_recovers_with_subroutines() {
        let mut m = TreeMaker::new();
        let g = g(&m);
        let b = m.local("b", Type::Boolean);
        // each return copies the finalizer inline: 1400 copies of 48 bytes
        let mut stats = Vec::new();
        for _ in 0..1400 {
            let ret = m.return_stmt(None);
            stats.push(m.if_stmt(m.ident(&b), ret, None));
        }
        let body = m.block(stats);
        let fin_stats = calls(&mut m, &g, 16);
        let fin = m.block(fin_stats);
        let t = m.try_stmt(body, vec![], Some(fin));
        let f = static_method(&mut m, "f", vec![b], Type::Void, vec![t]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        assert!(attr.code.len() < 65_536);
        // every return, the fallthrough and the catch-all call one subroutine
        assert_eq!(count(attr, "jsr_w"), 1402);
        assert_eq!(count(attr, "jsr"), 0);
        assert_eq!(count(attr, "ret"), 1);
        assert_eq!(count(attr, "invokestatic"), 16);
    }

    #[test]
    fn test_too_many_parameters() {
        let mut m = TreeMaker::new();
        let params = (0..256).map(|i| m.local(&format!("p{}", i), Type::Int)).collect();
        let f = static_method(&mut m, "f", params, Type::Void, vec![]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert_eq!(sink.len(), 1);
        assert!(sink.contains(LimitKind::Parameters));
        assert!(out.method("f").unwrap().code.is_none());
    }

    #[test]
    fn test_parameter_limit_counts_long_words_and_this() {
        let mut m = TreeMaker::new();
        // 127 longs take 254 words, plus the receiver
        let params = (0..127).map(|i| m.local(&format!("p{}", i), Type::Long)).collect();
        let body = m.block(vec![]);
        let f = m.method("f", flags::PUBLIC, params, Type::Void, Some(body));
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        assert_eq!(code(&out, "f").max_locals, 255);
    }
}
