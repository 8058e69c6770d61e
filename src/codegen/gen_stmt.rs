//! Statement generation.

use std::collections::VecDeque;

use log::debug;

use super::code::State;
use super::complexity;
use super::cond_item::CondItem;
use super::crt::{CRT_BLOCK, CRT_FLOW_CONTROLLER, CRT_FLOW_TARGET, CRT_STATEMENT};
use super::env::{Finalizer, ScopeId, ScopeKind};
use super::gen::{Gen, MethodContext};
use super::items::Item;
use super::opcodes::*;
use super::switch::{self, SwitchKind, UNFILLED};
use super::typecodes::{self, OBJECT};
use crate::ast::{Case, Catch, Expr, ExprKind, NodeId, Span, Stmt, StmtKind, Type, UnaryOp};
use crate::config::StackMapFormat;
use crate::error::{Error, Result};

impl<'r> Gen<'r> {
    /// Generates `stmt` in scope `env`. Unreachable statements emit nothing,
    /// but locals declared in dead switch cases still get their register.
    pub(crate) fn gen_stat<'t>(&mut self, cx: &mut MethodContext<'t>, stmt: &'t Stmt, env: ScopeId) -> Result<()> {
        if cx.code.is_alive() {
            let depth = cx.code.state.stack_size();
            cx.code.stat_begin(stmt.span.first_line());
            let saved = std::mem::replace(&mut cx.env, env);
            let result = self.gen_def(cx, stmt, env);
            cx.env = saved;
            result?;
            let after = cx.code.state.stack_size();
            let expected = if cx.let_depth == 0 { 0 } else { depth };
            if after != expected {
                return Err(Error::StackDepth { depth: after, line: stmt.span.first_line() });
            }
        } else if cx.scopes.get(env).is_switch {
            if let StmtKind::VarDef { var, .. } = &stmt.kind {
                cx.new_local(var);
            }
        }
        Ok(())
    }

    /// Like [`Gen::gen_stat`], recording the statement's code range.
    pub(crate) fn gen_stat_crt<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        stmt: &'t Stmt,
        env: ScopeId,
        crt_flags: u16,
    ) -> Result<()> {
        if cx.code.crt.is_none() {
            return self.gen_stat(cx, stmt, env);
        }
        let start = cx.code.cur_cp()?;
        self.gen_stat(cx, stmt, env)?;
        let flags = if stmt.is_block() { crt_flags | CRT_BLOCK } else { crt_flags };
        let end = cx.code.cur_cp()?;
        if let Some(crt) = &mut cx.code.crt {
            crt.put(stmt.span, flags, start, end);
        }
        Ok(())
    }

    pub(crate) fn gen_stats<'t>(&mut self, cx: &mut MethodContext<'t>, stats: &'t [Stmt], env: ScopeId) -> Result<()> {
        for stmt in stats {
            self.gen_stat(cx, stmt, env)?;
        }
        Ok(())
    }

    fn gen_stats_crt<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        stats: &'t [Stmt],
        env: ScopeId,
        crt_flags: u16,
    ) -> Result<()> {
        if cx.code.crt.is_none() {
            return self.gen_stats(cx, stats, env);
        }
        match stats {
            [] => Ok(()),
            [single] => self.gen_stat_crt(cx, single, env, crt_flags | CRT_STATEMENT),
            [first, .., last] => {
                let start = cx.code.cur_cp()?;
                self.gen_stats(cx, stats, env)?;
                let end = cx.code.cur_cp()?;
                if let Some(crt) = &mut cx.code.crt {
                    crt.put(Span { start: first.span.start, end: last.span.end }, crt_flags, start, end);
                }
                Ok(())
            }
        }
    }

    fn gen_def<'t>(&mut self, cx: &mut MethodContext<'t>, stmt: &'t Stmt, env: ScopeId) -> Result<()> {
        let line = stmt.span.first_line();
        match &stmt.kind {
            StmtKind::Block { stats } => self.gen_block(cx, stmt, stats, env),
            StmtKind::VarDef { var, init } => {
                let reg = cx.new_local(var);
                if let Some(init) = init {
                    self.check_string_constant(init.span, var.const_value.as_ref());
                    if var.const_value.is_none() || self.config.var_debug_info {
                        let value = self.gen_expr(cx, init, &var.ty)?;
                        cx.items().load(value)?;
                        cx.items().store(&Item::Local { tc: typecodes::of(&var.ty), reg })?;
                    }
                }
                self.check_dimension(stmt.span, &var.ty);
                Ok(())
            }
            StmtKind::Skip => Ok(()),
            StmtKind::DoLoop { body, cond } => self.gen_loop(cx, stmt, body, Some(cond), &[], false, env),
            StmtKind::WhileLoop { cond, body } => self.gen_loop(cx, stmt, body, Some(cond), &[], true, env),
            StmtKind::ForLoop { init, cond, step, body } => {
                let limit = cx.code.next_reg();
                self.gen_stats(cx, init, env)?;
                self.gen_loop(cx, stmt, body, cond.as_ref(), step, true, env)?;
                cx.code.end_scopes(limit)
            }
            StmtKind::Labelled { body, .. } => {
                let scope = cx.scopes.open(ScopeKind::Labelled, Some(stmt.id), env);
                self.gen_stat_crt(cx, body, scope, CRT_STATEMENT)?;
                let exit = cx.scopes.get_mut(scope).exit.take();
                cx.code.resolve(exit)?;
                cx.scopes.close(scope)
            }
            StmtKind::Switch { selector, cases } => self.gen_switch(cx, stmt.id, selector, cases, env),
            StmtKind::Synchronized { lock, body } => self.gen_synchronized(cx, stmt, lock, body, env),
            StmtKind::Try { body, catchers, finalizer } => {
                self.gen_try_stmt(cx, stmt, body, catchers, finalizer.as_deref(), env)
            }
            StmtKind::If { cond, then_part, else_part } => {
                let limit = cx.code.next_reg();
                let mut c = self.gen_cond_crt(cx, cond.skip_parens(), CRT_FLOW_CONTROLLER)?;
                let is_false = c.is_false();
                let true_jumps = c.true_jumps.take();
                let else_chain = c.jump_false(&mut cx.code)?;
                let mut then_exit = None;
                if !is_false {
                    cx.code.resolve(true_jumps)?;
                    self.gen_stat_crt(cx, then_part, env, CRT_STATEMENT | CRT_FLOW_TARGET)?;
                    then_exit = cx.code.branch(GOTO)?;
                }
                if else_chain.is_some() {
                    cx.code.resolve(else_chain)?;
                    if let Some(else_part) = else_part {
                        self.gen_stat_crt(cx, else_part, env, CRT_STATEMENT | CRT_FLOW_TARGET)?;
                    }
                }
                cx.code.resolve(then_exit)?;
                cx.code.end_scopes(limit)
            }
            StmtKind::Exec(expr) => {
                // a postfix increment whose value is unused is a prefix one
                let item = match &expr.kind {
                    ExprKind::Unary { op: UnaryOp::PostInc, operand, arg } => {
                        self.gen_unary(cx, expr, UnaryOp::PreInc, operand, arg)?
                    }
                    ExprKind::Unary { op: UnaryOp::PostDec, operand, arg } => {
                        self.gen_unary(cx, expr, UnaryOp::PreDec, operand, arg)?
                    }
                    _ => self.gen_expr(cx, expr, &expr.ty)?,
                };
                let item = cx.items().coerce(item, typecodes::of(&expr.ty))?;
                cx.items().drop(&item)
            }
            StmtKind::Break { target } => self.gen_jump(cx, *target, env, false, line),
            StmtKind::Continue { target } => self.gen_jump(cx, *target, env, true, line),
            StmtKind::Return(expr) => self.gen_return(cx, expr.as_ref(), env),
            StmtKind::Throw(expr) => {
                let exc = self.gen_expr(cx, expr, &expr.ty)?;
                cx.items().load(exc)?;
                cx.code.emitop0(ATHROW)
            }
            StmtKind::ForeachLoop { .. } => Err(Error::Unlowered { kind: "enhanced for loop", line }),
            StmtKind::Assert { .. } => Err(Error::Unlowered { kind: "assert statement", line }),
            StmtKind::ClassDef(_) => Err(Error::Unlowered { kind: "local class declaration", line }),
        }
    }

    fn gen_block<'t>(&mut self, cx: &mut MethodContext<'t>, stmt: &'t Stmt, stats: &'t [Stmt], env: ScopeId) -> Result<()> {
        let limit = cx.code.next_reg();
        let scope = cx.scopes.open(ScopeKind::Block, Some(stmt.id), env);
        self.gen_stats(cx, stats, scope)?;
        cx.scopes.close(scope)?;
        if cx.scopes.get(env).kind != ScopeKind::Method {
            cx.code.stat_begin(stmt.span.last_line());
            cx.code.end_scopes(limit)?;
            cx.code.set_pending_stat(None);
        }
        Ok(())
    }

    /// A loop testing `cond` before (`test_first`) or after each iteration.
    /// A missing condition is always true.
    #[allow(clippy::too_many_arguments)]
    fn gen_loop<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        stmt: &'t Stmt,
        body: &'t Stmt,
        cond: Option<&'t Expr>,
        step: &'t [Stmt],
        test_first: bool,
        env: ScopeId,
    ) -> Result<()> {
        let loop_env = cx.scopes.open(ScopeKind::Loop, Some(stmt.id), env);
        let start = cx.code.entry_point()?;
        if test_first {
            let mut c = self.gen_loop_cond(cx, cond)?;
            let true_jumps = c.true_jumps.take();
            let loop_done = c.jump_false(&mut cx.code)?;
            cx.code.resolve(true_jumps)?;
            self.gen_stat_crt(cx, body, loop_env, CRT_STATEMENT | CRT_FLOW_TARGET)?;
            let cont = cx.scopes.get_mut(loop_env).cont.take();
            cx.code.resolve(cont)?;
            self.gen_stats(cx, step, loop_env)?;
            let back = cx.code.branch(GOTO)?;
            cx.code.resolve_to(back, start)?;
            cx.code.resolve(loop_done)?;
        } else {
            self.gen_stat_crt(cx, body, loop_env, CRT_STATEMENT | CRT_FLOW_TARGET)?;
            let cont = cx.scopes.get_mut(loop_env).cont.take();
            cx.code.resolve(cont)?;
            self.gen_stats(cx, step, loop_env)?;
            if cx.code.is_alive() {
                let mut c = self.gen_loop_cond(cx, cond)?;
                let false_jumps = c.false_jumps.take();
                let back = c.jump_true(&mut cx.code)?;
                cx.code.resolve_to(back, start)?;
                cx.code.resolve(false_jumps)?;
            }
        }
        let exit = cx.scopes.get_mut(loop_env).exit.take();
        cx.code.resolve(exit)?;
        cx.scopes.close(loop_env)
    }

    fn gen_loop_cond<'t>(&mut self, cx: &mut MethodContext<'t>, cond: Option<&'t Expr>) -> Result<CondItem> {
        match cond {
            Some(cond) => {
                cx.code.stat_begin(cond.span.first_line());
                self.gen_cond_crt(cx, cond.skip_parens(), CRT_FLOW_CONTROLLER)
            }
            None => Ok(CondItem::constant(true)),
        }
    }

    fn gen_switch<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        id: NodeId,
        selector: &'t Expr,
        cases: &'t [Case],
        env: ScopeId,
    ) -> Result<()> {
        let limit = cx.code.next_reg();
        if !selector.ty.is_int_like() {
            return Err(Error::Unlowered {
                kind: "switch on a non-integral selector",
                line: selector.span.first_line(),
            });
        }
        let crt_start = if cx.code.crt.is_some() { cx.code.cur_cp()? } else { 0 };
        let sel = self.gen_expr(cx, selector, &Type::Int)?;
        let sel = cx.items().load(sel)?;
        if cx.code.crt.is_some() {
            let end = cx.code.cur_cp()?;
            if let Some(crt) = &mut cx.code.crt {
                crt.put(selector.skip_parens().span, CRT_FLOW_CONTROLLER, crt_start, end);
            }
        }
        if cases.is_empty() {
            cx.items().drop(&sel)?;
            return cx.code.end_scopes(limit);
        }

        let switch_env = cx.scopes.open(ScopeKind::Switch, Some(id), env);
        cx.scopes.get_mut(switch_env).is_switch = true;

        let mut labels = vec![0i32; cases.len()];
        let mut lo = i32::MAX;
        let mut hi = i32::MIN;
        let mut nlabels = 0;
        let mut default_index = None;
        for (i, case) in cases.iter().enumerate() {
            match &case.label {
                Some(label) => {
                    let value = label.const_value.as_ref().map(|v| v.as_int()).ok_or_else(|| {
                        Error::internal(format!("case label on line {} is not a constant", case.span.first_line()))
                    })?;
                    labels[i] = value;
                    lo = lo.min(value);
                    hi = hi.max(value);
                    nlabels += 1;
                }
                None => {
                    if default_index.is_some() {
                        return Err(Error::internal("switch has more than one default case"));
                    }
                    default_index = Some(i);
                }
            }
        }

        let kind = switch::choose(nlabels, lo, hi);
        let start_pc = cx.code.cur_cp()?;
        cx.code.emitop0(kind.opcode())?;
        cx.code.align(4)?;
        let table_base = cx.code.cur_cp()?;
        cx.code.emit4(UNFILLED);
        let mut offsets = Vec::new();
        match kind {
            SwitchKind::Dense => {
                cx.code.emit4(lo);
                cx.code.emit4(hi);
                for _ in lo as i64..=hi as i64 {
                    cx.code.emit4(UNFILLED);
                }
            }
            SwitchKind::Sparse => {
                cx.code.emit4(nlabels as i32);
                for _ in 0..nlabels {
                    cx.code.emit4(UNFILLED);
                    cx.code.emit4(UNFILLED);
                }
                offsets = vec![0i32; cases.len()];
            }
        }
        let slot = |label: i32| table_base + 4 * (label as i64 - lo as i64 + 3) as u32;
        let state_switch: State = cx.code.state.clone();
        cx.code.mark_dead();

        for (i, case) in cases.iter().enumerate() {
            let pc = cx.code.entry_point_with(&state_switch)?;
            let offset = (pc - start_pc) as i32;
            if Some(i) == default_index {
                cx.code.put4(table_base, offset);
            } else if kind == SwitchKind::Dense {
                cx.code.put4(slot(labels[i]), offset);
            } else {
                offsets[i] = offset;
            }
            self.gen_stats_crt(cx, &case.stats, switch_env, CRT_FLOW_TARGET)?;
        }

        let exit = cx.scopes.get_mut(switch_env).exit.take();
        cx.code.resolve(exit)?;
        if cx.code.get4(table_base) == UNFILLED {
            let pc = cx.code.entry_point_with(&state_switch)?;
            cx.code.put4(table_base, (pc - start_pc) as i32);
        }
        match kind {
            SwitchKind::Dense => {
                let default_offset = cx.code.get4(table_base);
                for label in lo as i64..=hi as i64 {
                    let at = slot(label as i32);
                    if cx.code.get4(at) == UNFILLED {
                        cx.code.put4(at, default_offset);
                    }
                }
            }
            SwitchKind::Sparse => {
                if let Some(d) = default_index {
                    labels.remove(d);
                    offsets.remove(d);
                }
                switch::sort_pairs(&mut labels, &mut offsets);
                for (i, (label, offset)) in labels.iter().zip(&offsets).enumerate() {
                    let at = table_base + 8 * (i as u32 + 1);
                    cx.code.put4(at, *label);
                    cx.code.put4(at + 4, *offset);
                }
            }
        }
        cx.scopes.close(switch_env)?;
        cx.code.end_scopes(limit)
    }

    fn gen_synchronized<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        stmt: &'t Stmt,
        lock: &'t Expr,
        body: &'t Stmt,
        env: ScopeId,
    ) -> Result<()> {
        let limit = cx.code.next_reg();
        let lock_var = cx.make_temp(&Type::object());
        let Item::Local { reg: lock_reg, .. } = lock_var else {
            return Err(Error::internal("lock temporary is not a local"));
        };
        let monitor = self.gen_expr(cx, lock, &lock.ty)?;
        let monitor = cx.items().load(monitor)?;
        cx.items().duplicate(&monitor)?;
        cx.items().store(&lock_var)?;
        cx.code.emitop0(MONITORENTER)?;
        cx.code.state.lock(lock_reg);

        let sync_env = cx.scopes.open(ScopeKind::Synchronized, Some(stmt.id), env);
        {
            let scope = cx.scopes.get_mut(sync_env);
            scope.finalizer = Some(Finalizer::Synchronized { lock_reg });
            scope.gaps = Some(VecDeque::new());
        }
        self.gen_try(cx, stmt, body, &[], stmt.span.last_line(), sync_env)?;
        cx.scopes.close(sync_env)?;
        cx.code.end_scopes(limit)
    }

    fn gen_try_stmt<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        stmt: &'t Stmt,
        body: &'t Stmt,
        catchers: &'t [Catch],
        finalizer: Option<&'t Stmt>,
        env: ScopeId,
    ) -> Result<()> {
        if !cx.use_jsr {
            let limit = self.config.jsr_limit;
            let too_complex = || {
                let cost = finalizer.map_or(0, |f| complexity::estimate(f, limit));
                limit < 100 && cost as i64 > limit as i64
            };
            cx.use_jsr = self.config.stack_map == StackMapFormat::None && (limit <= 0 || too_complex());
            if cx.use_jsr {
                debug!("finalizers in {} are generated as subroutines", cx.method.name);
            }
        }
        let try_env = cx.scopes.open(ScopeKind::Try, Some(stmt.id), env);
        {
            let scope = cx.scopes.get_mut(try_env);
            scope.finalizer = Some(Finalizer::Try { body: finalizer, outer: env });
            scope.gaps = Some(VecDeque::new());
        }
        let finalizer_line = finalizer.map_or(stmt.span.last_line(), |f| f.span.first_line());
        self.gen_try(cx, stmt, body, catchers, finalizer_line, try_env)?;
        cx.scopes.close(try_env)
    }

    /// The protected region, its handlers, and the catch-all that runs the
    /// finalizer on abrupt exits. `env` is the scope carrying the finalizer.
    fn gen_try<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        stmt: &'t Stmt,
        body: &'t Stmt,
        catchers: &'t [Catch],
        finalizer_line: usize,
        env: ScopeId,
    ) -> Result<()> {
        let limit = cx.code.next_reg();
        let start_pc = cx.code.cur_cp()?;
        let state_try = cx.code.state.clone();
        self.gen_stat_crt(cx, body, env, CRT_BLOCK)?;
        let end_pc = cx.code.cur_cp()?;
        let has_finalizer = cx.scopes.get(env).finalizer.map_or(false, |f| f.has_cleanup());
        let gaps: Vec<u32> = cx.scopes.get(env).gaps.iter().flatten().copied().collect();

        cx.code.stat_begin(body.span.last_line());
        self.gen_finalizer(cx, env)?;
        cx.code.stat_begin(stmt.span.last_line());
        let mut exit_chain = cx.code.branch(GOTO)?;
        self.end_finalizer_gap(cx, env)?;

        if start_pc != end_pc {
            for (i, catcher) in catchers.iter().enumerate() {
                cx.code.entry_point_pushed(&state_try, OBJECT)?;
                self.gen_catch(cx, catcher, env, start_pc, end_pc, &gaps)?;
                self.gen_finalizer(cx, env)?;
                if has_finalizer || i + 1 < catchers.len() {
                    cx.code.stat_begin(stmt.span.last_line());
                    let jump = cx.code.branch(GOTO)?;
                    exit_chain = super::chain::merge(exit_chain, jump)?;
                }
                self.end_finalizer_gap(cx, env)?;
            }
        }

        if has_finalizer {
            cx.code.new_reg_segment();
            let catch_all_pc = cx.code.entry_point_pushed(&state_try, OBJECT)?;
            let mut start_seg = start_pc;
            while let Some(end_seg) = pop_gap(cx, env) {
                self.register_catch(cx, body.span, start_seg, end_seg, catch_all_pc, 0)?;
                start_seg = pop_gap(cx, env).ok_or(Error::OddGapList)?;
            }
            cx.code.stat_begin(finalizer_line);
            cx.code.mark_stat_begin();
            let exc = cx.make_temp(&Type::throwable());
            cx.items().store(&exc)?;
            self.gen_finalizer(cx, env)?;
            cx.items().load(exc)?;
            let end_seg = pop_gap(cx, env)
                .ok_or_else(|| Error::internal("catch-all finalizer left no gap to close its range"))?;
            self.register_catch(cx, body.span, start_seg, end_seg, catch_all_pc, 0)?;
            cx.code.emitop0(ATHROW)?;
            cx.code.mark_dead();

            let subroutine_calls = cx.scopes.get_mut(env).cont.take();
            if subroutine_calls.is_some() {
                cx.code.resolve(subroutine_calls)?;
                cx.code.stat_begin(finalizer_line);
                cx.code.mark_stat_begin();
                let ret = cx.make_temp(&Type::object());
                let Item::Local { reg, .. } = ret else {
                    return Err(Error::internal("return address temporary is not a local"));
                };
                cx.items().store(&ret)?;
                self.gen_finalizer_last(cx, env)?;
                cx.code.emitop1w(RET, reg)?;
                cx.code.mark_dead();
            }
        }

        cx.code.resolve(exit_chain)?;
        cx.code.end_scopes(limit)
    }

    /// A handler for `catcher` covering `[start_pc, end_pc)` minus the
    /// finalizer copies listed in `gaps`.
    fn gen_catch<'t>(
        &mut self,
        cx: &mut MethodContext<'t>,
        catcher: &'t Catch,
        env: ScopeId,
        start_pc: u32,
        end_pc: u32,
        gaps: &[u32],
    ) -> Result<()> {
        if start_pc == end_pc {
            return Ok(());
        }
        let catch_type = self.make_ref(cx, catcher.span, &catcher.param.ty);
        let mut start = start_pc;
        let mut gaps = gaps.iter();
        while let Some(&gap_start) = gaps.next() {
            let handler = cx.code.cur_cp()?;
            self.register_catch(cx, catcher.span, start, gap_start, handler, catch_type)?;
            start = *gaps.next().ok_or(Error::OddGapList)?;
        }
        if start < end_pc {
            let handler = cx.code.cur_cp()?;
            self.register_catch(cx, catcher.span, start, end_pc, handler, catch_type)?;
        }
        cx.code.stat_begin(catcher.span.first_line());
        cx.code.mark_stat_begin();
        let limit = cx.code.next_reg();
        let reg = cx.new_local(&catcher.param);
        cx.items().store(&Item::Local { tc: OBJECT, reg })?;
        if let Some(first) = catcher.body.block_stats().first() {
            cx.code.stat_begin(first.span.first_line());
        }
        self.gen_stat_crt(cx, &catcher.body, env, CRT_BLOCK)?;
        cx.code.end_scopes(limit)?;
        cx.code.stat_begin(catcher.body.span.last_line());
        Ok(())
    }

    /// `break` (or `continue` when `is_continue`) to the statement `target`.
    fn gen_jump(
        &mut self,
        cx: &mut MethodContext<'_>,
        target: NodeId,
        env: ScopeId,
        is_continue: bool,
        line: usize,
    ) -> Result<()> {
        let depth = cx.code.state.stack_size();
        if depth != 0 {
            return Err(Error::StackDepth { depth, line });
        }
        let pending = cx.code.pending_stat();
        let target_env = cx.scopes.find_target(env, target)?;
        self.unwind(cx, target_env, env)?;
        cx.code.set_pending_stat(pending);
        let jump = cx.code.branch(GOTO)?;
        let scope = cx.scopes.get_mut(target_env);
        if is_continue {
            scope.add_cont(jump)?;
        } else {
            scope.add_exit(jump)?;
        }
        self.end_finalizer_gaps(cx, env, target_env)
    }

    fn gen_return<'t>(&mut self, cx: &mut MethodContext<'t>, expr: Option<&'t Expr>, env: ScopeId) -> Result<()> {
        let limit = cx.code.next_reg();
        let method_env = cx.scopes.method();
        match expr {
            Some(expr) => {
                let method = cx.method;
                let pt = &method.ty.ret;
                let value = self.gen_expr(cx, expr, pt)?;
                let mut result = cx.items().load(value)?;
                if cx.scopes.has_finally(env) {
                    result = cx.make_temp(pt);
                    cx.items().store(&result)?;
                }
                self.unwind(cx, method_env, env)?;
                cx.items().load(result)?;
                cx.code.emitop0(IRETURN + typecodes::truncate(typecodes::of(pt)))?;
            }
            None => {
                let pending = cx.code.pending_stat();
                self.unwind(cx, method_env, env)?;
                cx.code.set_pending_stat(pending);
                cx.code.mark_stat_begin();
                cx.code.emitop0(RETURN)?;
            }
        }
        self.end_finalizer_gaps(cx, env, method_env)?;
        cx.code.end_scopes(limit)
    }
}

fn pop_gap(cx: &mut MethodContext<'_>, env: ScopeId) -> Option<u32> {
    cx.scopes.get_mut(env).gaps.as_mut().and_then(VecDeque::pop_front)
}
