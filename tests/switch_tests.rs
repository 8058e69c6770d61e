mod common;

use common::*;
use stackgen::ast::{flags, TreeMaker, Type};
use stackgen::codegen::inspect::{self, SwitchTable};
use stackgen::CodeAttr;

fn switch_table(attr: &CodeAttr) -> SwitchTable {
    inspect::decode(&attr.code)
        .unwrap()
        .iter()
        .find_map(|insn| insn.switch_table(&attr.code).unwrap())
        .expect("no switch instruction")
}

#[cfg(test)]
mod switch_tests {
    use super::*;

    #[test]
    fn test_dense_keys_use_a_table() {
        let mut m = TreeMaker::new();
        let k = m.local("k", Type::Int);
        let id = m.reserve();
        let mut cases = Vec::new();
        for (label, value) in [(Some(1), 10), (Some(2), 20), (Some(3), 30), (None, 0)] {
            let ret = m.return_stmt(Some(m.int(value)));
            cases.push(m.case(label, vec![ret]));
        }
        let sw = m.switch(id, m.ident(&k), cases);
        let f = static_method(&mut m, "f", vec![k], Type::Int, vec![sw]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec![
                "iload_0", "tableswitch", "bipush", "ireturn", "bipush", "ireturn", "bipush", "ireturn", "iconst_0",
                "ireturn",
            ]
        );
        let table = switch_table(attr);
        assert_eq!(table.cases, vec![(1, 28), (2, 31), (3, 34)]);
        assert_eq!(table.default, 37);
        assert_eq!(attr.code.len(), 39);
    }

    #[test]
    fn test_sparse_keys_use_sorted_pairs() {
        let mut m = TreeMaker::new();
        let k = m.local("k", Type::Int);
        let id = m.reserve();
        let mut cases = Vec::new();
        for label in [100, 0, 2, 1] {
            let ret = m.return_stmt(None);
            cases.push(m.case(Some(label), vec![ret]));
        }
        let sw = m.switch(id, m.ident(&k), cases);
        let f = static_method(&mut m, "f", vec![k], Type::Void, vec![sw]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        assert_eq!(mnemonics(attr)[1], "lookupswitch");
        let table = switch_table(attr);
        assert_eq!(table.cases, vec![(0, 45), (1, 47), (2, 46), (100, 44)]);
        // without a default case, unmatched keys continue after the switch
        assert_eq!(table.default, 48);
        assert_eq!(mnemonics(attr).last(), Some(&"return"));
    }

    #[test]
    fn test_fallthrough_and_break() {
        let mut m = TreeMaker::new();
        let g = m.method_sym(CLASS, "g", vec![], Type::Void, flags::STATIC);
        let h = m.method_sym(CLASS, "h", vec![], Type::Void, flags::STATIC);
        let k = m.local("k", Type::Int);
        let id = m.reserve();
        let first = m.exec(m.call(&g, vec![]));
        let second = m.exec(m.call(&h, vec![]));
        let brk = m.break_stmt(id);
        let cases = vec![m.case(Some(1), vec![first]), m.case(Some(2), vec![second, brk])];
        let sw = m.switch(id, m.ident(&k), cases);
        let f = static_method(&mut m, "f", vec![k], Type::Void, vec![sw]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        let attr = code(&out, "f");
        // the break lands on the next instruction and needs no jump
        assert_eq!(
            mnemonics(attr),
            vec!["iload_0", "lookupswitch", "invokestatic", "invokestatic", "return"]
        );
        let table = switch_table(attr);
        assert_eq!(table.cases, vec![(1, 28), (2, 31)]);
        assert_eq!(table.default, 34);
    }

    #[test]
    fn test_local_declared_in_unreachable_case_code_gets_a_slot() {
        let mut m = TreeMaker::new();
        let k = m.local("k", Type::Int);
        let y = m.local("y", Type::Int);
        let id = m.reserve();
        let ret = m.return_stmt(None);
        let decl = m.var_def(&y, None);
        let set = m.exec(m.assign(m.ident(&y), m.int(5)));
        let cases = vec![m.case(Some(0), vec![ret, decl]), m.case(Some(1), vec![set])];
        let sw = m.switch(id, m.ident(&k), cases);
        let f = static_method(&mut m, "f", vec![k], Type::Void, vec![sw]);
        let (out, sink) = compile(&class_of(&m, vec![f]));
        assert!(sink.is_empty());
        let attr = code(&out, "f");
        assert_eq!(
            mnemonics(attr),
            vec!["iload_0", "lookupswitch", "return", "iconst_5", "istore_1", "return"]
        );
        let table = switch_table(attr);
        assert_eq!(table.cases, vec![(0, 28), (1, 29)]);
        assert_eq!(table.default, 31);
        assert_eq!(attr.max_locals, 2);
    }

    #[test]
    fn test_switch_without_cases_discards_the_selector() {
        let mut m = TreeMaker::new();
        let k = m.local("k", Type::Int);
        let id = m.reserve();
        let sw = m.switch(id, m.ident(&k), vec![]);
        let f = static_method(&mut m, "f", vec![k], Type::Void, vec![sw]);
        let (out, _) = compile(&class_of(&m, vec![f]));
        assert_eq!(mnemonics(code(&out, "f")), vec!["iload_0", "pop", "return"]);
    }
}
