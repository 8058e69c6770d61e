//! Conditions and binary operators.
//!
//! Boolean expressions in branch position are generated as [`CondItem`]s so
//! that `&&`, `||`, `!` and `?:` become jumps instead of 0/1 values.

use super::cond_item::CondItem;
use super::crt::{CRT_FLOW_CONTROLLER, CRT_FLOW_TARGET};
use super::gen::{Gen, MethodContext};
use super::items::Item;
use super::opcodes::*;
use super::operators;
use super::{chain, typecodes};
use crate::ast::{BinaryOp, ConstValue, Expr, ExprKind, Type};
use crate::error::Result;

impl<'r> Gen<'r> {
    /// Generates `expr` as a condition, recording its code range with
    /// `crt_flags` when a character-range table is kept.
    pub(crate) fn gen_cond_crt<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        expr: &'t Expr,
        crt_flags: u16,
    ) -> Result<CondItem> {
        if cx.code.crt.is_none() {
            return self.gen_cond(cx, expr);
        }
        let start = cx.code.cur_cp()?;
        let cond = self.gen_cond(cx, expr)?;
        let end = cx.code.cur_cp()?;
        if let Some(crt) = &mut cx.code.crt {
            crt.put(expr.span, crt_flags, start, end);
        }
        Ok(cond)
    }

    pub(crate) fn gen_cond<'t>(&mut self, cx: &mut MethodContext<'t>, expr: &'t Expr) -> Result<CondItem> {
        let inner = expr.skip_parens();
        if let ExprKind::Conditional { cond, then_expr, else_expr } = &inner.kind {
            return self.gen_conditional_cond(cx, cond, then_expr, else_expr);
        }
        let item = self.gen_expr(cx, expr, &Type::Boolean)?;
        cx.items().mk_cond(item)
    }

    /// `c ? a : b` where `a` and `b` are conditions themselves.
    fn gen_conditional_cond<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        cond: &'t Expr,
        then_expr: &'t Expr,
        else_expr: &'t Expr,
    ) -> Result<CondItem> {
        let mut c = self.gen_cond_crt(cx, cond, CRT_FLOW_CONTROLLER)?;
        if c.is_true() {
            cx.code.resolve(c.true_jumps.take())?;
            return self.gen_cond_crt(cx, then_expr, CRT_FLOW_TARGET);
        }
        if c.is_false() {
            cx.code.resolve(c.false_jumps.take())?;
            return self.gen_cond_crt(cx, else_expr, CRT_FLOW_TARGET);
        }
        let true_jumps = c.true_jumps.take();
        let second_jumps = c.jump_false(&mut cx.code)?;
        cx.code.resolve(true_jumps)?;

        let mut first = self.gen_cond_crt(cx, then_expr, CRT_FLOW_TARGET)?;
        let first_true = first.true_jumps.take();
        let false_jumps = first.jump_false(&mut cx.code)?;
        cx.code.resolve(first_true)?;
        let true_jumps = cx.code.branch(GOTO)?;

        cx.code.resolve(second_jumps)?;
        let second = self.gen_cond_crt(cx, else_expr, CRT_FLOW_TARGET)?;
        Ok(CondItem::new(
            second.opcode,
            chain::merge(true_jumps, second.true_jumps)?,
            chain::merge(false_jumps, second.false_jumps)?,
        ))
    }

    /// `a && b` and `a || b`. The right operand is skipped entirely when the
    /// left one already decides the outcome.
    pub(crate) fn gen_short_circuit<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        op: BinaryOp,
        lhs: &'t Expr,
        rhs: &'t Expr,
    ) -> Result<Item> {
        let mut lcond = self.gen_cond_crt(cx, lhs, CRT_FLOW_CONTROLLER)?;
        if op == BinaryOp::And {
            if lcond.is_false() {
                return Ok(Item::Cond(lcond));
            }
            let true_jumps = lcond.true_jumps.take();
            let false_jumps = lcond.jump_false(&mut cx.code)?;
            cx.code.resolve(true_jumps)?;
            let rcond = self.gen_cond_crt(cx, rhs, CRT_FLOW_TARGET)?;
            Ok(Item::Cond(CondItem::new(
                rcond.opcode,
                rcond.true_jumps,
                chain::merge(false_jumps, rcond.false_jumps)?,
            )))
        } else {
            if lcond.is_true() {
                return Ok(Item::Cond(lcond));
            }
            let false_jumps = lcond.false_jumps.take();
            let true_jumps = lcond.jump_true(&mut cx.code)?;
            cx.code.resolve(false_jumps)?;
            let rcond = self.gen_cond_crt(cx, rhs, CRT_FLOW_TARGET)?;
            Ok(Item::Cond(CondItem::new(
                rcond.opcode,
                chain::merge(true_jumps, rcond.true_jumps)?,
                rcond.false_jumps,
            )))
        }
    }

    /// Finishes a binary operation whose left operand is on the stack.
    ///
    /// Comparisons against the constant zero or the `null` literal use the
    /// single-operand branch forms and leave the right side unevaluated.
    pub(crate) fn complete_binop<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        op: BinaryOp,
        operand: &Type,
        rhs: &'t Expr,
        result: &Type,
    ) -> Result<Item> {
        let mut opcode = operators::binary(op, operand)?;
        let (icmpeq, icmple) = (u32::from(IF_ICMPEQ), u32::from(IF_ICMPLE));
        let (acmpeq, acmpne) = (u32::from(IF_ACMPEQ), u32::from(IF_ACMPNE));
        if (icmpeq..=icmple).contains(&opcode) && matches!(rhs.const_value, Some(ConstValue::Int(0))) {
            opcode = opcode - icmpeq + u32::from(IFEQ);
        } else if (acmpeq..=acmpne).contains(&opcode) && rhs.is_null_literal() {
            opcode = opcode - acmpeq + u32::from(IFNULL);
        } else {
            let rtype = if op.is_shift() { Type::Int } else { operand.clone() };
            let r = self.gen_expr(cx, rhs, &rtype)?;
            cx.items().load(r)?;
            let (pre, base) = operators::split(opcode);
            if let Some(pre) = pre {
                cx.code.emitop0(pre)?;
            }
            opcode = u32::from(base);
        }
        let opcode = opcode as u8;
        if is_conditional_branch(opcode) {
            Ok(Item::Cond(CondItem::new(opcode, None, None)))
        } else {
            cx.code.emitop0(opcode)?;
            Ok(Item::stack(typecodes::of(result)))
        }
    }
}
