//! Bytecode generation for one class.
//!
//! `Gen` walks each method body once, emitting instructions into a fresh
//! [`Code`] buffer. Expressions become [`Item`]s that are loaded, stored or
//! branched on as their context demands; statements thread jump chains
//! through the [`Scopes`] of the constructs enclosing them.
//!
//! A method whose exception ranges or branch offsets outgrow the narrow
//! encodings is generated a second time with wide jumps throughout.

use std::collections::HashMap;

use log::{debug, trace};

use super::code::{Code, CodeAttr};
use super::constpool::{ConstantPool, MAX_ENTRIES};
use super::crt::CRT_BLOCK;
use super::chain::Chain;
use super::env::{Finalizer, ScopeId, Scopes};
use super::inspect;
use super::items::{Item, Items, MemberRef};
use super::opcodes::*;
use super::resolve::Resolver;
use super::typecodes::{self, OBJECT};
use crate::ast::{
    flags, ClassDecl, ConstValue, LocalVar, MethodDecl, MethodSymbol, MethodType, Span, Type, VarId,
    OBJECT_CLASS,
};
use crate::config::{Config, StackMapFormat};
use crate::diagnostics::{DiagnosticSink, LimitKind, MAX_DIMENSIONS, MAX_PARAMETERS, MAX_STRING_LENGTH};
use crate::error::{Error, Result};

/// Generated code of one class.
#[derive(Debug)]
pub struct ClassOutput {
    pub name: String,
    pub pool: ConstantPool,
    pub methods: Vec<MethodOutput>,
    /// Limit diagnostics reported while generating the class.
    pub error_count: u32,
}

impl ClassOutput {
    pub fn method(&self, name: &str) -> Option<&MethodOutput> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug)]
pub struct MethodOutput {
    pub name: String,
    pub descriptor: String,
    pub flags: u32,
    /// `None` for abstract methods and for methods whose code was voided
    /// by a limit diagnostic.
    pub code: Option<CodeAttr>,
}

/// How one attempt at a method body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodOutcome {
    Done,
    /// An exception range did not fit the narrow encoding; start over with
    /// wide jumps, using subroutine finalizers if `subroutines`.
    RetryWithWideEncoding { subroutines: bool },
}

/// Per-method generation state.
pub struct MethodContext<'t> {
    pub code: Code,
    pub pool: ConstantPool,
    pub scopes: Scopes<'t>,
    /// Scope of the statement being generated.
    pub env: ScopeId,
    pub method: &'t MethodDecl,
    pub class: &'t ClassDecl,
    /// Finalizers become subroutines from the first `try` that needs it on.
    pub use_jsr: bool,
    /// Nesting depth of `let` expressions; statements inside one may leave
    /// values on the stack.
    pub let_depth: u32,
    locals: HashMap<VarId, u16>,
}

impl<'t> MethodContext<'t> {
    fn new(
        config: &Config,
        pool: ConstantPool,
        class: &'t ClassDecl,
        method: &'t MethodDecl,
        fatcode: bool,
        use_jsr: bool,
    ) -> Self {
        let scopes = Scopes::new();
        let env = scopes.method();
        Self {
            code: Code::new(fatcode, config),
            pool,
            scopes,
            env,
            method,
            class,
            use_jsr,
            let_depth: 0,
            locals: HashMap::new(),
        }
    }

    pub fn items(&mut self) -> Items<'_> {
        Items::new(&mut self.code, &mut self.pool)
    }

    /// Register of a local variable declared earlier in the method.
    pub fn local_reg(&self, id: VarId) -> Result<u16> {
        self.locals
            .get(&id)
            .copied()
            .ok_or_else(|| Error::internal(format!("local variable {:?} used before its declaration", id)))
    }

    /// Allocates a register for a declared variable.
    pub fn new_local(&mut self, var: &LocalVar) -> u16 {
        let reg = self.code.new_local(&var.name, &var.ty);
        self.locals.insert(var.id, reg);
        reg
    }

    /// An untracked register for a value of type `ty`.
    pub fn make_temp(&mut self, ty: &Type) -> Item {
        let tc = typecodes::of(ty);
        Item::Local { tc, reg: self.code.new_local_reg(tc) }
    }
}

/// The code generator.
pub struct Gen<'r> {
    pub(crate) config: Config,
    pub(crate) resolver: &'r dyn Resolver,
    sink: &'r mut dyn DiagnosticSink,
    pool: ConstantPool,
    /// Diagnostics reported for the current class.
    pub(crate) nerrs: u32,
    /// `StringBuilder.append` overloads already looked up, by argument type.
    pub(crate) append_cache: HashMap<Type, MethodSymbol>,
}

impl<'r> Gen<'r> {
    pub fn new(config: Config, resolver: &'r dyn Resolver, sink: &'r mut dyn DiagnosticSink) -> Self {
        Self {
            config,
            resolver,
            sink,
            pool: ConstantPool::new(),
            nerrs: 0,
            append_cache: HashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Generates code for every method of `class`, including the class
    /// initializer synthesized from static field initializers.
    pub fn gen_class(&mut self, class: &ClassDecl) -> Result<ClassOutput> {
        debug!("generating class {}", class.name);
        self.nerrs = 0;
        let methods = self.normalize_defs(class);
        self.pool.reset();
        let mut outputs = Vec::with_capacity(methods.len());
        for method in &methods {
            let code = self.gen_method(class, method)?;
            outputs.push(MethodOutput {
                name: method.name.clone(),
                descriptor: method.ty.descriptor(),
                flags: method.flags,
                code,
            });
        }
        if self.pool.num_entries() > MAX_ENTRIES {
            self.report(class.span, LimitKind::PoolEntries);
            for output in &mut outputs {
                output.code = None;
            }
        }
        Ok(ClassOutput {
            name: class.name.clone(),
            pool: std::mem::take(&mut self.pool),
            methods: outputs,
            error_count: self.nerrs,
        })
    }

    fn gen_method(&mut self, class: &ClassDecl, method: &MethodDecl) -> Result<Option<CodeAttr>> {
        let errs_before = self.nerrs;
        self.check_method_dimensions(method.span, &method.ty);
        let mut words = method.ty.param_words();
        if !method.is_static() || method.is_constructor() {
            words += 1;
        }
        if words > MAX_PARAMETERS {
            self.report(method.span, LimitKind::Parameters);
            return Ok(None);
        }
        if method.body.is_none() {
            return Ok(None);
        }

        let mut fatcode = false;
        let mut use_jsr = false;
        let code = loop {
            trace!(
                "method {}.{}{}{}",
                class.name,
                method.name,
                method.ty.descriptor(),
                if fatcode { " (wide jumps)" } else { "" }
            );
            let pool = std::mem::take(&mut self.pool);
            let mut cx = MethodContext::new(&self.config, pool, class, method, fatcode, use_jsr);
            let outcome = self.gen_method_body(&mut cx);
            self.pool = std::mem::take(&mut cx.pool);
            let retry_with_subroutines = match outcome? {
                MethodOutcome::RetryWithWideEncoding { subroutines } => subroutines,
                MethodOutcome::Done => {
                    let over = cx.code.check_limits();
                    if !over.is_empty() {
                        for kind in over {
                            self.report(method.span, kind);
                        }
                        return Ok(None);
                    }
                    if fatcode || !cx.code.needs_wide() {
                        break cx.code;
                    }
                    false
                }
            };
            // Invariant guard: register_catch only signals a retry while
            // jumps are narrow.
            if fatcode {
                return Err(Error::internal(format!(
                    "method {} still overflows with wide jumps",
                    method.name
                )));
            }
            debug!("regenerating {}.{} with wide jumps", class.name, method.name);
            fatcode = true;
            use_jsr = retry_with_subroutines && self.config.stack_map == StackMapFormat::None;
        };

        if self.nerrs > errs_before {
            return Ok(None);
        }
        let attr = code.finish();
        if self.config.debug_code {
            match inspect::disassemble(&attr.code) {
                Ok(listing) => trace!("code of {}.{}:\n{}", class.name, method.name, listing),
                Err(e) => debug!("cannot list code of {}.{}: {}", class.name, method.name, e),
            }
        }
        Ok(Some(attr))
    }

    fn gen_method_body(&mut self, cx: &mut MethodContext<'_>) -> Result<MethodOutcome> {
        let method = cx.method;
        let Some(body) = &method.body else {
            return Ok(MethodOutcome::Done);
        };
        if !method.is_static() {
            let this = LocalVar {
                id: VarId(u32::MAX),
                name: "this".to_string(),
                ty: Type::class(cx.class.name.clone()),
                const_value: None,
            };
            let reg = cx.code.new_local(&this.name, &this.ty);
            cx.code.set_defined(reg);
        }
        for param in &method.params {
            let reg = cx.new_local(param);
            cx.code.set_defined(reg);
            self.check_dimension(method.span, &param.ty);
        }
        cx.code.entry_point()?;

        let start = if cx.code.crt.is_some() { cx.code.cur_cp()? } else { 0 };
        let method_scope = cx.scopes.method();
        match self.gen_stat(cx, body, method_scope) {
            Err(Error::CodeSizeOverflow) => {
                debug!("exception range overflow in {}", method.name);
                return Ok(MethodOutcome::RetryWithWideEncoding { subroutines: true });
            }
            other => other?,
        }
        let depth = cx.code.state.stack_size();
        if depth != 0 {
            return Err(Error::StackDepth { depth, line: body.span.last_line() });
        }
        if cx.code.is_alive() {
            cx.code.stat_begin(body.span.last_line());
            if method.ty.ret.is_void() {
                cx.code.emitop0(RETURN)?;
            } else {
                // only reachable when the body never completes normally
                let start = cx.code.entry_point()?;
                let jump = cx.code.branch(GOTO)?;
                cx.code.resolve_to(jump, start)?;
            }
        }
        if cx.code.crt.is_some() {
            let end = cx.code.cur_cp()?;
            if let Some(crt) = &mut cx.code.crt {
                crt.put(body.span, CRT_BLOCK, start, end);
            }
        }
        cx.code.end_scopes(0)?;
        Ok(MethodOutcome::Done)
    }

    // ----- diagnostics -----

    pub(crate) fn report(&mut self, span: Span, kind: LimitKind) {
        self.nerrs += 1;
        self.sink.report(span, kind);
    }

    /// Reports array types the target cannot describe.
    pub(crate) fn check_dimension(&mut self, span: Span, ty: &Type) {
        if ty.dimensions() > MAX_DIMENSIONS {
            self.report(span, LimitKind::Dimensions);
        }
    }

    fn check_method_dimensions(&mut self, span: Span, ty: &MethodType) {
        for param in &ty.params {
            self.check_dimension(span, param);
        }
        self.check_dimension(span, &ty.ret);
    }

    /// Reports string constants too long for the pool. Skipped once the
    /// class has errors, since the constant may be a cascade of one.
    pub(crate) fn check_string_constant(&mut self, span: Span, value: Option<&ConstValue>) {
        if self.nerrs != 0 {
            return;
        }
        if let Some(ConstValue::String(s)) = value {
            if s.encode_utf16().count() >= MAX_STRING_LENGTH {
                self.report(span, LimitKind::StringConstant);
            }
        }
    }

    /// Pool index of a class or array type, checking its dimensions.
    pub(crate) fn make_ref(&mut self, cx: &mut MethodContext<'_>, span: Span, ty: &Type) -> u16 {
        self.check_dimension(span, ty);
        cx.pool.put_type(ty)
    }

    // ----- members -----

    /// The member reference to emit for `member` accessed through `site`.
    /// Under binary compatibility, members are referenced through the type
    /// they were qualified with rather than the class declaring them.
    pub(crate) fn binary_qualifier(
        &self,
        cx: &MethodContext<'_>,
        member: MemberRef,
        member_flags: u32,
        site: &Type,
    ) -> MemberRef {
        let Type::Class(site_name) = site else {
            return member;
        };
        if member.owner == *site_name
            || member_flags & (flags::STATIC | flags::SYNTHETIC) == flags::STATIC | flags::SYNTHETIC
        {
            return member;
        }
        if !self.config.obey_binary_compatibility {
            if self.resolver.is_accessible(&cx.class.name, &member.owner) {
                return member;
            }
        } else if member.owner == OBJECT_CLASS {
            return member;
        }
        let is_interface = self.resolver.is_interface(site_name);
        member.with_owner(site_name, is_interface)
    }

    /// Calls a library method on whatever receiver and arguments are on
    /// the stack.
    pub(crate) fn call_method(
        &mut self,
        cx: &mut MethodContext<'_>,
        site: &Type,
        name: &str,
        argtypes: &[Type],
        is_static: bool,
    ) -> Result<Item> {
        let sym = self.resolver.resolve_internal_method(site, name, argtypes)?;
        let member = MemberRef::method(&sym);
        let item = if is_static {
            Item::Static { tc: member.tc, member }
        } else {
            Item::Member { tc: member.tc, member, nonvirtual: name == "<init>" }
        };
        cx.items().invoke(&item)
    }

    // ----- exception table -----

    /// Adds a handler row for `[start, end)`. Offsets beyond the narrow
    /// encoding abort the attempt, or are reported once wide jumps are in use.
    pub(crate) fn register_catch(
        &mut self,
        cx: &mut MethodContext<'_>,
        span: Span,
        start: u32,
        end: u32,
        handler: u32,
        catch_type: u16,
    ) -> Result<()> {
        if start == end {
            return Ok(());
        }
        let fits = |pc: u32| pc <= 0xFFFF;
        if fits(start) && fits(end) && fits(handler) {
            cx.code.add_catch(start as u16, end as u16, handler as u16, catch_type);
            return Ok(());
        }
        if !cx.code.fatcode {
            return Err(Error::CodeSizeOverflow);
        }
        self.report(span, LimitKind::CodeTooLargeForTry);
        Ok(())
    }

    // ----- finalizers -----

    /// Emits the cleanup of every scope from `env` out to `target`.
    pub(crate) fn unwind(&mut self, cx: &mut MethodContext<'_>, target: ScopeId, env: ScopeId) -> Result<()> {
        for id in cx.scopes.path(env, target) {
            self.gen_finalizer(cx, id)?;
        }
        Ok(())
    }

    /// Emits the cleanup of scope `id`, if it has one and code is reachable,
    /// and opens a gap so the copy is not covered by the scope's handlers.
    pub(crate) fn gen_finalizer(&mut self, cx: &mut MethodContext<'_>, id: ScopeId) -> Result<()> {
        if !cx.code.is_alive() {
            return Ok(());
        }
        let Some(finalizer) = cx.scopes.get(id).finalizer else {
            return Ok(());
        };
        match finalizer {
            Finalizer::Try { body, .. } if cx.use_jsr => {
                if body.is_some() {
                    let mut state = cx.code.state.clone();
                    state.push(OBJECT);
                    let pc = cx.code.emit_jump(JSR)?;
                    let scope = cx.scopes.get_mut(id);
                    let rest = scope.cont.take();
                    scope.cont = Chain::new(pc, state, rest).boxed();
                }
                let pc = cx.code.cur_cp()?;
                cx.scopes.get_mut(id).open_gap(pc)
            }
            Finalizer::Try { .. } => {
                let pc = cx.code.cur_cp()?;
                cx.scopes.get_mut(id).open_gap(pc)?;
                self.gen_finalizer_last(cx, id)
            }
            Finalizer::Synchronized { .. } => {
                self.gen_finalizer_last(cx, id)?;
                let pc = cx.code.cur_cp()?;
                cx.scopes.get_mut(id).open_gap(pc)
            }
        }
    }

    /// The cleanup code itself.
    pub(crate) fn gen_finalizer_last(&mut self, cx: &mut MethodContext<'_>, id: ScopeId) -> Result<()> {
        match cx.scopes.get(id).finalizer {
            Some(Finalizer::Try { body: Some(body), outer }) => self.gen_stat_crt(cx, body, outer, CRT_BLOCK),
            Some(Finalizer::Synchronized { lock_reg }) => {
                if cx.code.is_alive() {
                    cx.items().load(Item::Local { tc: OBJECT, reg: lock_reg })?;
                    cx.code.emitop0(MONITOREXIT)?;
                    cx.code.state.unlock(lock_reg)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Closes the gap left open by the last finalizer copy in scope `id`.
    pub(crate) fn end_finalizer_gap(&mut self, cx: &mut MethodContext<'_>, id: ScopeId) -> Result<()> {
        if cx.scopes.get(id).has_open_gap() {
            let pc = cx.code.cur_cp()?;
            cx.scopes.get_mut(id).close_gap(pc);
        }
        Ok(())
    }

    /// Closes the open gaps of every scope from `from` out to `to`.
    pub(crate) fn end_finalizer_gaps(&mut self, cx: &mut MethodContext<'_>, from: ScopeId, to: ScopeId) -> Result<()> {
        for id in cx.scopes.path(from, to) {
            self.end_finalizer_gap(cx, id)?;
        }
        Ok(())
    }
}
