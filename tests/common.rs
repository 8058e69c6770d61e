// Common test utilities
#![allow(dead_code)]

use stackgen::ast::{flags, ClassDecl, ClassMember, LocalVar, MethodDecl, Stmt, TreeMaker, Type};
use stackgen::codegen::{inspect, opcodes};
use stackgen::{generate, BasicResolver, ClassOutput, CodeAttr, Config, Diagnostics};

pub const CLASS: &str = "p/C";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A class named [`CLASS`] holding `methods`.
pub fn class_of(m: &TreeMaker, methods: Vec<MethodDecl>) -> ClassDecl {
    m.class(CLASS, methods.into_iter().map(ClassMember::Method).collect())
}

/// `static ret name(params) { stats }`
pub fn static_method(m: &mut TreeMaker, name: &str, params: Vec<LocalVar>, ret: Type, stats: Vec<Stmt>) -> MethodDecl {
    let body = m.block(stats);
    m.method(name, flags::STATIC, params, ret, Some(body))
}

pub fn compile_with(class: &ClassDecl, config: Config) -> (ClassOutput, Diagnostics) {
    init_logging();
    let resolver = BasicResolver::new();
    let mut sink = Diagnostics::new();
    let out = generate(class, config, &resolver, &mut sink).expect("generation failed");
    (out, sink)
}

pub fn compile(class: &ClassDecl) -> (ClassOutput, Diagnostics) {
    compile_with(class, Config::default())
}

pub fn code<'a>(out: &'a ClassOutput, name: &str) -> &'a CodeAttr {
    out.method(name)
        .and_then(|m| m.code.as_ref())
        .unwrap_or_else(|| panic!("method {} has no code", name))
}

pub fn mnemonics(attr: &CodeAttr) -> Vec<&'static str> {
    inspect::mnemonics(&attr.code).expect("undecodable code")
}

pub fn count(attr: &CodeAttr, mnemonic: &str) -> usize {
    mnemonics(attr).iter().filter(|m| **m == mnemonic).count()
}

/// `(pc, mnemonic, target)` of every branch.
pub fn branches(attr: &CodeAttr) -> Vec<(u32, &'static str, u32)> {
    let mut out = Vec::new();
    for insn in inspect::decode(&attr.code).expect("undecodable code") {
        if let Some(target) = insn.branch_target(&attr.code).expect("bad branch") {
            out.push((insn.pc, opcodes::mnemonic(insn.opcode), target));
        }
    }
    out
}

/// `(start, end, handler)` of every exception table entry.
pub fn ranges(attr: &CodeAttr) -> Vec<(u16, u16, u16)> {
    attr.exception_table.iter().map(|e| (e.start_pc, e.end_pc, e.handler_pc)).collect()
}
