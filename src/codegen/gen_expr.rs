//! Expression generation.
//!
//! Every expression yields an [`Item`]; the caller decides whether it is
//! loaded, stored, invoked or branched on.

use super::crt::{CRT_FLOW_CONTROLLER, CRT_FLOW_TARGET};
use super::gen::{Gen, MethodContext};
use super::items::{Item, MemberRef};
use super::opcodes::*;
use super::operators;
use super::typecodes::{self, BYTE, DOUBLE, FLOAT, INT, LONG, OBJECT};
use crate::ast::{
    flags, BinaryOp, ConstValue, Expr, ExprKind, MethodSymbol, Span, Symbol, Type, UnaryOp,
    STRING_BUILDER_CLASS,
};
use crate::error::{Error, Result};

impl<'r> Gen<'r> {
    /// Generates `expr` and converts the result to the type code of `pt`.
    pub(crate) fn gen_expr<'t>(&mut self, cx: &mut MethodContext<'t>, expr: &'t Expr, pt: &Type) -> Result<Item> {
        let item = self.gen_item(cx, expr, pt)?;
        cx.items().coerce(item, typecodes::of(pt))
    }

    /// Generates `expr` without converting the result. Constant expressions
    /// emit nothing here; they become immediate items.
    fn gen_item<'t>(&mut self, cx: &mut MethodContext<'t>, expr: &'t Expr, pt: &Type) -> Result<Item> {
        if let Some(value) = &expr.const_value {
            self.check_string_constant(expr.span, Some(value));
            return Ok(Item::immediate(&expr.ty, value.clone()));
        }
        match &expr.kind {
            ExprKind::Literal => self.gen_literal(cx, expr, pt),
            ExprKind::Ident(sym) => self.gen_ident(cx, expr, sym),
            ExprKind::SelfRef { is_super, ctor } => {
                let item = Item::SelfRef { is_super: *is_super };
                match ctor {
                    Some(ctor) => {
                        cx.items().load(item)?;
                        Ok(member_item(MemberRef::method(ctor), true))
                    }
                    None => Ok(item),
                }
            }
            ExprKind::Select { target, sym } => self.gen_select(cx, target, sym),
            ExprKind::ClassLiteral(ty) => {
                let index = self.make_ref(cx, expr.span, ty);
                cx.code.emit_ldc(index, OBJECT)?;
                Ok(Item::stack(OBJECT))
            }
            ExprKind::Apply { callee, args } => {
                let item = self.gen_item(cx, callee, &Type::Void)?;
                let method = callee_symbol(callee)?;
                self.gen_args(cx, args, &method.ty.params)?;
                cx.items().invoke(&item)
            }
            ExprKind::NewClass { ctor, args } => {
                let index = self.make_ref(cx, expr.span, &expr.ty);
                cx.code.emitop2(NEW, index)?;
                cx.code.emitop0(DUP)?;
                self.gen_args(cx, args, &ctor.ty.params)?;
                cx.items().invoke(&member_item(MemberRef::method(ctor), true))?;
                Ok(Item::stack_of(&expr.ty))
            }
            ExprKind::NewArray { dims, elems } => self.gen_new_array(cx, expr, dims, elems.as_deref()),
            ExprKind::Parens(inner) => self.gen_expr(cx, inner, &inner.ty),
            ExprKind::Assign { lhs, rhs } => {
                let l = self.gen_expr(cx, lhs, &lhs.ty)?;
                let r = self.gen_expr(cx, rhs, &lhs.ty)?;
                cx.items().load(r)?;
                Ok(Item::Assign { lhs: Box::new(l) })
            }
            ExprKind::AssignOp { op, operand, lhs, rhs } => self.gen_assign_op(cx, expr.span, *op, operand, lhs, rhs),
            ExprKind::Unary { op, operand, arg } => self.gen_unary(cx, expr, *op, operand, arg),
            ExprKind::Binary { op, operand, lhs, rhs } => match op {
                BinaryOp::And | BinaryOp::Or => self.gen_short_circuit(cx, *op, lhs, rhs),
                BinaryOp::Plus if operand.is_string() => {
                    self.make_string_buffer(cx, expr.span)?;
                    self.append_strings(cx, expr)?;
                    self.buffer_to_string(cx)
                }
                _ => {
                    let l = self.gen_expr(cx, lhs, operand)?;
                    cx.items().load(l)?;
                    self.complete_binop(cx, *op, operand, rhs, &expr.ty)
                }
            },
            ExprKind::TypeCast { target, expr: inner } => {
                let v = self.gen_expr(cx, inner, target)?;
                let v = cx.items().load(v)?;
                if target.is_reference() && !self.resolver.is_subtype(&inner.ty, target) {
                    let index = self.make_ref(cx, expr.span, target);
                    cx.code.emitop2(CHECKCAST, index)?;
                }
                Ok(v)
            }
            ExprKind::TypeTest { expr: inner, target } => {
                let v = self.gen_expr(cx, inner, &inner.ty)?;
                cx.items().load(v)?;
                let index = self.make_ref(cx, expr.span, target);
                cx.code.emitop2(INSTANCEOF, index)?;
                Ok(Item::stack(BYTE))
            }
            ExprKind::Indexed { array, index } => {
                let a = self.gen_expr(cx, array, &array.ty)?;
                cx.items().load(a)?;
                let i = self.gen_expr(cx, index, &Type::Int)?;
                cx.items().load(i)?;
                Ok(Item::Indexed { tc: typecodes::of(&expr.ty) })
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                self.gen_conditional(cx, expr, cond, then_expr, else_expr, pt)
            }
            ExprKind::Let { stats, expr: value } => {
                let limit = cx.code.next_reg();
                cx.let_depth += 1;
                let env = cx.env;
                self.gen_stats(cx, stats, env)?;
                let v = self.gen_expr(cx, value, &value.ty)?;
                let v = cx.items().load(v)?;
                cx.let_depth -= 1;
                cx.code.end_scopes(limit)?;
                Ok(v)
            }
        }
    }

    fn gen_literal(&mut self, cx: &mut MethodContext<'_>, expr: &Expr, pt: &Type) -> Result<Item> {
        if expr.ty != Type::Null {
            return Err(Error::internal(format!("literal on line {} has no value", expr.span.first_line())));
        }
        cx.code.emitop0(ACONST_NULL)?;
        if pt.dimensions() > 1 {
            let index = self.make_ref(cx, expr.span, pt);
            cx.code.emitop2(CHECKCAST, index)?;
            return Ok(Item::stack_of(pt));
        }
        Ok(Item::stack(OBJECT))
    }

    fn gen_ident(&mut self, cx: &mut MethodContext<'_>, expr: &Expr, sym: &Symbol) -> Result<Item> {
        let (member, member_flags) = match sym {
            Symbol::Local(id) => {
                return Ok(Item::Local { tc: typecodes::of(&expr.ty), reg: cx.local_reg(*id)? });
            }
            Symbol::Field(f) => (MemberRef::field(f), f.flags),
            Symbol::Method(m) => (MemberRef::method(m), m.flags),
            Symbol::ArrayLength | Symbol::Type(_) => {
                return Err(Error::internal(format!(
                    "identifier on line {} does not name a value",
                    expr.span.first_line()
                )));
            }
        };
        let site = Type::class(cx.class.name.clone());
        if member_flags & flags::STATIC != 0 {
            let member = if cx.method.is_access_super() {
                member
            } else {
                self.binary_qualifier(cx, member, member_flags, &site)
            };
            Ok(Item::Static { tc: member.tc, member })
        } else {
            cx.items().load(Item::SelfRef { is_super: false })?;
            let member = self.binary_qualifier(cx, member, member_flags, &site);
            Ok(member_item(member, member_flags & flags::PRIVATE != 0))
        }
    }

    fn gen_select<'t>(&mut self, cx: &mut MethodContext<'t>, target: &'t Expr, sym: &'t Symbol) -> Result<Item> {
        let selected = target.skip_parens();
        let select_super = matches!(
            selected.kind,
            ExprKind::Ident(Symbol::Type(_)) | ExprKind::SelfRef { is_super: true, ctor: None }
        );
        let access_super = cx.method.is_access_super();
        let base = if select_super {
            Item::SelfRef { is_super: true }
        } else {
            self.gen_expr(cx, target, &target.ty)?
        };

        let (member, member_flags) = match sym {
            Symbol::ArrayLength => {
                cx.items().load(base)?;
                cx.code.emitop0(ARRAYLENGTH)?;
                return Ok(Item::stack(INT));
            }
            Symbol::Field(f) => {
                if let Some(value) = &f.const_value {
                    if f.is_static() {
                        self.drop_base(cx, base, select_super)?;
                    } else {
                        cx.items().load(base)?;
                        self.gen_null_check(cx)?;
                    }
                    return Ok(Item::immediate(&f.ty, value.clone()));
                }
                (MemberRef::field(f), f.flags)
            }
            Symbol::Method(m) => (MemberRef::method(m), m.flags),
            Symbol::Local(_) | Symbol::Type(_) => {
                return Err(Error::internal(format!(
                    "selection on line {} does not name a member",
                    target.span.first_line()
                )));
            }
        };
        let member = if access_super {
            member
        } else {
            self.binary_qualifier(cx, member, member_flags, &target.ty)
        };
        if member_flags & flags::STATIC != 0 {
            self.drop_base(cx, base, select_super)?;
            Ok(Item::Static { tc: member.tc, member })
        } else {
            cx.items().load(base)?;
            let nonvirtual = member_flags & flags::PRIVATE != 0 || select_super || access_super;
            Ok(member_item(member, nonvirtual))
        }
    }

    /// Evaluates the qualifier of a static member for its side effects.
    fn drop_base(&mut self, cx: &mut MethodContext<'_>, base: Item, select_super: bool) -> Result<()> {
        let base = if select_super { base } else { cx.items().load(base)? };
        cx.items().drop(&base)
    }

    fn gen_args<'t>(&mut self, cx: &mut MethodContext<'t>, args: &'t [Expr], params: &[Type]) -> Result<()> {
        if args.len() != params.len() {
            return Err(Error::internal(format!(
                "call passes {} arguments to {} parameters",
                args.len(),
                params.len()
            )));
        }
        for (arg, pt) in args.iter().zip(params) {
            let a = self.gen_expr(cx, arg, pt)?;
            cx.items().load(a)?;
        }
        Ok(())
    }

    /// Leaves the receiver's class on the stack and pops it, so a null
    /// receiver throws.
    fn gen_null_check(&mut self, cx: &mut MethodContext<'_>) -> Result<()> {
        self.call_method(cx, &Type::object(), "getClass", &[], false)?;
        cx.code.emitop0(POP)
    }

    // ----- arrays -----

    fn gen_new_array<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        expr: &'t Expr,
        dims: &'t [Expr],
        elems: Option<&'t [Expr]>,
    ) -> Result<Item> {
        let Some(elems) = elems else {
            for dim in dims {
                let d = self.gen_expr(cx, dim, &Type::Int)?;
                cx.items().load(d)?;
            }
            return self.make_new_array(cx, expr.span, &expr.ty, dims.len());
        };
        let elem_ty = expr.ty.element_type().cloned().ok_or_else(|| {
            Error::internal(format!("array initializer on line {} has no array type", expr.span.first_line()))
        })?;
        cx.items().load(Item::int(elems.len() as i32))?;
        let arr = self.make_new_array(cx, expr.span, &expr.ty, 1)?;
        let elem_tc = typecodes::of(&elem_ty);
        for (i, elem) in elems.iter().enumerate() {
            cx.items().duplicate(&arr)?;
            cx.items().load(Item::int(i as i32))?;
            let v = self.gen_expr(cx, elem, &elem_ty)?;
            cx.items().load(v)?;
            cx.items().store(&Item::Indexed { tc: elem_tc })?;
        }
        Ok(arr)
    }

    /// Allocates an array of type `ty` from `ndims` lengths on the stack.
    fn make_new_array(&mut self, cx: &mut MethodContext<'_>, span: Span, ty: &Type, ndims: usize) -> Result<Item> {
        let elem = ty
            .element_type()
            .ok_or_else(|| Error::internal(format!("allocating non-array type {}", ty.descriptor())))?;
        self.check_dimension(span, ty);
        let code = typecodes::array_code(elem);
        if code == 0 || (code == 1 && ndims == 1) {
            let index = self.make_ref(cx, span, elem);
            cx.code.emitop2(ANEWARRAY, index)?;
        } else if code == 1 {
            let index = self.make_ref(cx, span, ty);
            cx.code.emit_multianewarray(ndims.min(255) as u8, index)?;
        } else {
            cx.code.emitop1(NEWARRAY, code)?;
        }
        Ok(Item::stack(OBJECT))
    }

    // ----- operators -----

    fn gen_assign_op<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        span: Span,
        op: BinaryOp,
        operand: &Type,
        lhs: &'t Expr,
        rhs: &'t Expr,
    ) -> Result<Item> {
        if op == BinaryOp::Plus && operand.is_string() {
            self.make_string_buffer(cx, span)?;
            let l = self.gen_expr(cx, lhs, &lhs.ty)?;
            let width = l.width();
            if width > 0 {
                cx.code.emitop0(DUP_X1 + 3 * (width as u8 - 1))?;
            }
            cx.items().load(l.clone())?;
            self.append_string(cx, &lhs.ty)?;
            self.append_strings(cx, rhs)?;
            self.buffer_to_string(cx)?;
            return Ok(Item::Assign { lhs: Box::new(l) });
        }

        let l = self.gen_expr(cx, lhs, &lhs.ty)?;
        if matches!(op, BinaryOp::Plus | BinaryOp::Minus)
            && l.is_local()
            && lhs.ty.is_int_like()
            && rhs.ty.is_int_like()
        {
            if let Some(value) = &rhs.const_value {
                let delta = value.as_int();
                let delta = if op == BinaryOp::Minus { delta.wrapping_neg() } else { delta };
                cx.items().incr(&l, delta)?;
                return Ok(l);
            }
        }
        cx.items().duplicate(&l)?;
        let od = cx.items().coerce(l.clone(), typecodes::of(operand))?;
        cx.items().load(od)?;
        let res = self.complete_binop(cx, op, operand, rhs, operand)?;
        cx.items().coerce(res, typecodes::of(&lhs.ty))?;
        Ok(Item::Assign { lhs: Box::new(l) })
    }

    /// Unary operators. Increments of int locals become `iinc`; all other
    /// increments load, add one, narrow and store back.
    pub(crate) fn gen_unary<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        expr: &'t Expr,
        op: UnaryOp,
        operand: &Type,
        arg: &'t Expr,
    ) -> Result<Item> {
        if op == UnaryOp::Not {
            let cond = self.gen_cond(cx, arg)?;
            return Ok(Item::Cond(cond.negate()));
        }
        let od = self.gen_expr(cx, arg, operand)?;
        match op {
            UnaryOp::Pos => cx.items().load(od),
            UnaryOp::Neg => {
                let res = cx.items().load(od)?;
                cx.code.emitop0(operators::unary(op, operand)?)?;
                Ok(res)
            }
            UnaryOp::Compl => {
                let res = cx.items().load(od)?;
                if res.typecode() == LONG {
                    cx.items().load(Item::Immediate { tc: LONG, value: ConstValue::Long(-1) })?;
                } else {
                    cx.code.emitop0(ICONST_M1)?;
                }
                cx.code.emitop0(operators::unary(op, operand)?)?;
                Ok(res)
            }
            UnaryOp::PreInc | UnaryOp::PreDec => {
                let opcode = operators::unary(op, operand)?;
                cx.items().duplicate(&od)?;
                if od.is_local() && (opcode == IADD || opcode == ISUB) {
                    cx.items().incr(&od, if op == UnaryOp::PreInc { 1 } else { -1 })?;
                    return Ok(od);
                }
                let tc = od.typecode();
                cx.items().load(od.clone())?;
                cx.code.emitop0(one(tc))?;
                cx.code.emitop0(opcode)?;
                narrow(cx, tc)?;
                Ok(Item::Assign { lhs: Box::new(od) })
            }
            UnaryOp::PostInc | UnaryOp::PostDec => {
                let opcode = operators::unary(op, operand)?;
                cx.items().duplicate(&od)?;
                if od.is_local() && (opcode == IADD || opcode == ISUB) {
                    let res = cx.items().load(od.clone())?;
                    cx.items().incr(&od, if op == UnaryOp::PostInc { 1 } else { -1 })?;
                    return Ok(res);
                }
                let tc = od.typecode();
                let res = cx.items().load(od.clone())?;
                cx.items().stash(&od, tc)?;
                cx.code.emitop0(one(tc))?;
                cx.code.emitop0(opcode)?;
                narrow(cx, tc)?;
                cx.items().store(&od)?;
                Ok(res)
            }
            UnaryOp::NullCheck => {
                let res = cx.items().load(od)?;
                cx.code.emitop0(DUP)?;
                self.gen_null_check(cx)?;
                Ok(res)
            }
            UnaryOp::Not => Err(Error::internal(format!(
                "negation on line {} reached value generation",
                expr.span.first_line()
            ))),
        }
    }

    /// `c ? a : b` as a value.
    fn gen_conditional<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        expr: &'t Expr,
        cond: &'t Expr,
        then_expr: &'t Expr,
        else_expr: &'t Expr,
        pt: &Type,
    ) -> Result<Item> {
        let mut c = self.gen_cond_crt(cx, cond, CRT_FLOW_CONTROLLER)?;
        let is_false = c.is_false();
        let true_jumps = c.true_jumps.take();
        let else_chain = c.jump_false(&mut cx.code)?;
        let tc = typecodes::of(&expr.ty);
        let mut then_exit = None;
        if !is_false {
            cx.code.resolve(true_jumps)?;
            self.gen_arm(cx, then_expr, pt, tc)?;
            then_exit = cx.code.branch(GOTO)?;
        }
        if else_chain.is_some() {
            cx.code.resolve(else_chain)?;
            self.gen_arm(cx, else_expr, pt, tc)?;
        }
        cx.code.resolve(then_exit)?;
        Ok(Item::stack_of(pt))
    }

    fn gen_arm<'t>(&mut self, cx: &mut MethodContext<'t>, arm: &'t Expr, pt: &Type, tc: u8) -> Result<()> {
        let start = if cx.code.crt.is_some() { cx.code.cur_cp()? } else { 0 };
        let v = self.gen_expr(cx, arm, pt)?;
        cx.items().load(v)?;
        cx.code.state.force_stack_top(tc);
        if cx.code.crt.is_some() {
            let end = cx.code.cur_cp()?;
            if let Some(crt) = &mut cx.code.crt {
                crt.put(arm.span, CRT_FLOW_TARGET, start, end);
            }
        }
        Ok(())
    }

    // ----- string concatenation -----

    fn make_string_buffer(&mut self, cx: &mut MethodContext<'_>, span: Span) -> Result<()> {
        let builder = Type::class(STRING_BUILDER_CLASS);
        let index = self.make_ref(cx, span, &builder);
        cx.code.emitop2(NEW, index)?;
        cx.code.emitop0(DUP)?;
        self.call_method(cx, &builder, "<init>", &[], false)?;
        Ok(())
    }

    /// Appends the value on the stack, of type `ty`, to the builder below it.
    fn append_string(&mut self, cx: &mut MethodContext<'_>, ty: &Type) -> Result<()> {
        let ty = if ty.is_reference() && !ty.is_string() { Type::object() } else { ty.clone() };
        let method = match self.append_cache.get(&ty) {
            Some(m) => m.clone(),
            None => {
                let m = self.resolver.resolve_internal_method(
                    &Type::class(STRING_BUILDER_CLASS),
                    "append",
                    std::slice::from_ref(&ty),
                )?;
                self.append_cache.insert(ty, m.clone());
                m
            }
        };
        cx.items().invoke(&member_item(MemberRef::method(&method), false))?;
        Ok(())
    }

    /// Appends every operand of a chain of string `+`, left to right.
    fn append_strings<'t>(&mut self, cx: &mut MethodContext<'t>, expr: &'t Expr) -> Result<()> {
        let expr = expr.skip_parens();
        if expr.const_value.is_none() {
            if let ExprKind::Binary { op: BinaryOp::Plus, operand, lhs, rhs } = &expr.kind {
                if operand.is_string() {
                    self.append_strings(cx, lhs)?;
                    return self.append_strings(cx, rhs);
                }
            }
        }
        let v = self.gen_expr(cx, expr, &expr.ty)?;
        cx.items().load(v)?;
        self.append_string(cx, &expr.ty)
    }

    fn buffer_to_string(&mut self, cx: &mut MethodContext<'_>) -> Result<Item> {
        self.call_method(cx, &Type::class(STRING_BUILDER_CLASS), "toString", &[], false)?;
        Ok(Item::stack(OBJECT))
    }
}

fn member_item(member: MemberRef, nonvirtual: bool) -> Item {
    Item::Member { tc: member.tc, member, nonvirtual }
}

/// The method a call expression invokes.
fn callee_symbol(callee: &Expr) -> Result<&MethodSymbol> {
    match &callee.skip_parens().kind {
        ExprKind::Ident(Symbol::Method(m))
        | ExprKind::Select { sym: Symbol::Method(m), .. }
        | ExprKind::SelfRef { ctor: Some(m), .. } => Ok(m),
        _ => Err(Error::internal(format!("call on line {} has no method", callee.span.first_line()))),
    }
}

/// The constant one in the arithmetic type of `tc`.
fn one(tc: u8) -> u8 {
    match typecodes::truncate(tc) {
        LONG => LCONST_1,
        FLOAT => FCONST_1,
        DOUBLE => DCONST_1,
        _ => ICONST_1,
    }
}

/// Truncates an int result back to a byte, char or short location.
fn narrow(cx: &mut MethodContext<'_>, tc: u8) -> Result<()> {
    if tc != INT && typecodes::truncate(tc) == INT {
        cx.code.emitop0(I2B + tc - BYTE)?;
    }
    Ok(())
}
