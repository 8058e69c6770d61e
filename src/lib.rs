//! stackgen: lowering of attributed syntax trees to stack-machine bytecode.
//!
//! The crate takes a class whose methods have already been parsed,
//! attributed and desugared, and produces the code attribute of every
//! method: instructions, exception table, line numbers and, optionally,
//! local variable and character-range tables.
//!
//! - **ast**: the attributed tree and a builder for it
//! - **codegen**: the generator, code buffer, jump chains, switch and
//!   finalizer handling
//! - **config**: generator options, parsed from compiler-style switches
//! - **diagnostics**: limit violations reported against the source
//!
//! ```text
//! ClassDecl → normalize initializers → per method: Gen (retry once wide) → ClassOutput
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;

pub use codegen::{BasicResolver, ClassOutput, CodeAttr, Gen, MethodOutput, Resolver};
pub use config::Config;
pub use diagnostics::{DiagnosticSink, Diagnostics, LimitKind};
pub use error::{Error, Result};

/// Generates code for `class` with a fresh generator.
pub fn generate(
    class: &ast::ClassDecl,
    config: Config,
    resolver: &dyn Resolver,
    sink: &mut dyn DiagnosticSink,
) -> Result<ClassOutput> {
    let mut gen = Gen::new(config, resolver, sink);
    gen.gen_class(class)
}
