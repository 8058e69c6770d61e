//! Code generation: lowering attributed methods to stack-machine bytecode.
//!
//! [`Gen`] drives one class at a time. Emission goes through [`code::Code`],
//! which simulates the operand stack and resolves jump chains; statements
//! and expressions are generated in `gen_stmt`, `gen_expr` and `gen_cond`.

pub mod chain;
pub mod code;
pub mod complexity;
pub mod cond_item;
pub mod constpool;
pub mod crt;
pub mod env;
pub mod gen;
mod gen_cond;
mod gen_expr;
mod gen_stmt;
pub mod inspect;
pub mod items;
mod normalize;
pub mod opcodes;
pub mod operators;
pub mod resolve;
pub mod switch;
pub mod typecodes;

pub use code::{CatchEntry, CodeAttr};
pub use constpool::ConstantPool;
pub use gen::{ClassOutput, Gen, MethodOutput};
pub use normalize::CLASS_INIT;
pub use resolve::{BasicResolver, Resolver};
