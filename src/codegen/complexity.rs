//! Code-size estimate for finalizer bodies.
//!
//! The weights approximate how many instructions each construct expands
//! to. The walk stops descending once the running total passes the limit,
//! since the caller only asks whether the limit is exceeded.

use crate::ast::{Expr, ExprKind, Stmt, StmtKind, Symbol};

pub const LOOP: u32 = 1;
pub const SWITCH: u32 = 5;
pub const CASE: u32 = 1;
pub const SYNCHRONIZED: u32 = 6;
pub const TRY_WITH_FINALIZER: u32 = 6;
pub const CATCH: u32 = 2;
pub const CONDITIONAL: u32 = 2;
pub const JUMP: u32 = 1;
pub const ASSERT: u32 = 5;
pub const CALL: u32 = 2;
pub const NEW_ARRAY: u32 = 5;
pub const ASSIGN: u32 = 1;
pub const ASSIGN_OP: u32 = 2;
pub const OPERATOR: u32 = 1;
pub const TYPE_TEST: u32 = 1;
pub const INDEX: u32 = 1;
pub const SELECT: u32 = 1;
pub const VARIABLE: u32 = 1;
pub const FIELD_EXTRA: u32 = 1;
pub const LITERAL: u32 = 1;

/// Estimates the code size of `tree`, stopping early once it exceeds `limit`.
pub fn estimate(tree: &Stmt, limit: i32) -> u32 {
    let mut scanner = ComplexityScanner { complexity: 0, limit: limit as i64 };
    scanner.visit_stmt(tree);
    scanner.complexity
}

struct ComplexityScanner {
    complexity: u32,
    limit: i64,
}

impl ComplexityScanner {
    fn exhausted(&self) -> bool {
        self.complexity as i64 > self.limit
    }

    fn scan_stmt(&mut self, stmt: &Stmt) {
        if !self.exhausted() {
            self.visit_stmt(stmt);
        }
    }

    fn scan_stmts(&mut self, stmts: &[Stmt]) {
        for s in stmts {
            self.scan_stmt(s);
        }
    }

    fn scan_expr(&mut self, expr: &Expr) {
        if !self.exhausted() {
            self.visit_expr(expr);
        }
    }

    fn scan_exprs(&mut self, exprs: &[Expr]) {
        for e in exprs {
            self.scan_expr(e);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Block { stats } => self.scan_stmts(stats),
            StmtKind::VarDef { init, .. } => {
                if let Some(init) = init {
                    self.scan_expr(init);
                }
            }
            StmtKind::Skip => {}
            StmtKind::DoLoop { body, cond } => {
                self.scan_stmt(body);
                self.scan_expr(cond);
                self.complexity += LOOP;
            }
            StmtKind::WhileLoop { cond, body } => {
                self.scan_expr(cond);
                self.scan_stmt(body);
                self.complexity += LOOP;
            }
            StmtKind::ForLoop { init, cond, step, body } => {
                self.scan_stmts(init);
                if let Some(cond) = cond {
                    self.scan_expr(cond);
                }
                self.scan_stmts(step);
                self.scan_stmt(body);
                self.complexity += LOOP;
            }
            StmtKind::ForeachLoop { expr, body, .. } => {
                self.scan_expr(expr);
                self.scan_stmt(body);
            }
            StmtKind::Labelled { body, .. } => self.scan_stmt(body),
            StmtKind::Switch { selector, cases } => {
                self.scan_expr(selector);
                for case in cases {
                    if self.exhausted() {
                        continue;
                    }
                    if let Some(label) = &case.label {
                        self.scan_expr(label);
                    }
                    self.scan_stmts(&case.stats);
                    self.complexity += CASE;
                }
                self.complexity += SWITCH;
            }
            StmtKind::Synchronized { lock, body } => {
                self.scan_expr(lock);
                self.scan_stmt(body);
                self.complexity += SYNCHRONIZED;
            }
            StmtKind::Try { body, catchers, finalizer } => {
                self.scan_stmt(body);
                for catcher in catchers {
                    if self.exhausted() {
                        continue;
                    }
                    self.scan_stmt(&catcher.body);
                    self.complexity += CATCH;
                }
                if let Some(finalizer) = finalizer {
                    self.scan_stmt(finalizer);
                    self.complexity += TRY_WITH_FINALIZER;
                }
            }
            StmtKind::If { cond, then_part, else_part } => {
                self.scan_expr(cond);
                self.scan_stmt(then_part);
                if let Some(else_part) = else_part {
                    self.scan_stmt(else_part);
                }
                self.complexity += CONDITIONAL;
            }
            StmtKind::Exec(expr) => self.scan_expr(expr),
            StmtKind::Break { .. } | StmtKind::Continue { .. } => self.complexity += JUMP,
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    self.scan_expr(expr);
                }
                self.complexity += JUMP;
            }
            StmtKind::Throw(expr) => {
                self.scan_expr(expr);
                self.complexity += JUMP;
            }
            StmtKind::Assert { cond, detail } => {
                self.scan_expr(cond);
                if let Some(detail) = detail {
                    self.scan_expr(detail);
                }
                self.complexity += ASSERT;
            }
            StmtKind::ClassDef(_) => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal => self.complexity += LITERAL,
            ExprKind::Ident(sym) => match sym {
                Symbol::Local(_) => self.complexity += VARIABLE,
                Symbol::Field(field) => {
                    self.complexity += VARIABLE;
                    if expr.const_value.is_none() && field.const_value.is_none() {
                        self.complexity += FIELD_EXTRA;
                    }
                }
                _ => {}
            },
            // `this` and `super` are fields of the enclosing instance
            ExprKind::SelfRef { ctor: None, .. } => self.complexity += VARIABLE + FIELD_EXTRA,
            ExprKind::SelfRef { .. } => {}
            ExprKind::Select { target, sym } => {
                self.scan_expr(target);
                if matches!(sym, Symbol::Field(_) | Symbol::ArrayLength) {
                    self.complexity += SELECT;
                }
            }
            ExprKind::ClassLiteral(_) => self.complexity += SELECT,
            ExprKind::Apply { callee, args } => {
                self.scan_expr(callee);
                self.scan_exprs(args);
                self.complexity += CALL;
            }
            ExprKind::NewClass { args, .. } => {
                self.scan_exprs(args);
                self.complexity += CALL;
            }
            ExprKind::NewArray { dims, elems } => {
                self.scan_exprs(dims);
                if let Some(elems) = elems {
                    self.scan_exprs(elems);
                }
                self.complexity += NEW_ARRAY;
            }
            ExprKind::Parens(inner) => self.scan_expr(inner),
            ExprKind::Assign { lhs, rhs } => {
                self.scan_expr(lhs);
                self.scan_expr(rhs);
                self.complexity += ASSIGN;
            }
            ExprKind::AssignOp { lhs, rhs, .. } => {
                self.scan_expr(lhs);
                self.scan_expr(rhs);
                self.complexity += ASSIGN_OP;
            }
            ExprKind::Unary { arg, .. } => {
                self.complexity += OPERATOR;
                if expr.const_value.is_none() {
                    self.scan_expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.complexity += OPERATOR;
                if expr.const_value.is_none() {
                    self.scan_expr(lhs);
                    self.scan_expr(rhs);
                }
            }
            ExprKind::TypeCast { expr: inner, .. } => self.scan_expr(inner),
            ExprKind::TypeTest { expr: inner, .. } => {
                self.scan_expr(inner);
                self.complexity += TYPE_TEST;
            }
            ExprKind::Indexed { array, index } => {
                self.scan_expr(array);
                self.scan_expr(index);
                self.complexity += INDEX;
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                self.scan_expr(cond);
                self.scan_expr(then_expr);
                self.scan_expr(else_expr);
                self.complexity += CONDITIONAL;
            }
            ExprKind::Let { stats, expr: value } => {
                self.scan_stmts(stats);
                self.scan_expr(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ConstValue, TreeMaker, Type};

    #[test]
    fn empty_block_costs_nothing() {
        let mut m = TreeMaker::new();
        let block = m.block(vec![]);
        assert_eq!(estimate(&block, 50), 0);
    }

    #[test]
    fn assignment_of_local() {
        let mut m = TreeMaker::new();
        let x = m.local("x", Type::Int);
        let stmt = m.exec(m.assign(m.ident(&x), m.int(1)));
        // assign 1 + ident 1 + literal 1
        assert_eq!(estimate(&stmt, 50), 3);
    }

    #[test]
    fn constant_operators_skip_operands() {
        let mut m = TreeMaker::new();
        let x = m.local("x", Type::Int);
        let mut folded = m.binary(BinaryOp::Plus, m.int(1), m.int(2));
        folded.const_value = Some(ConstValue::Int(3));
        let stmt = m.exec(m.assign(m.ident(&x), folded));
        assert_eq!(estimate(&stmt, 50), 3);
    }

    #[test]
    fn non_constant_field_costs_extra() {
        let mut m = TreeMaker::new();
        let f = m.field_sym("p/C", "f", Type::Int, crate::ast::flags::STATIC);
        let x = m.local("x", Type::Int);
        let stmt = m.exec(m.assign(m.ident(&x), m.field(&f)));
        assert_eq!(estimate(&stmt, 50), 4);
    }

    #[test]
    fn scan_stops_past_the_limit() {
        let mut m = TreeMaker::new();
        let x = m.local("x", Type::Int);
        let stats: Vec<Stmt> = (0..100).map(|i| m.exec(m.assign(m.ident(&x), m.int(i)))).collect();
        let block = m.block(stats);
        let bounded = estimate(&block, 10);
        assert!(bounded > 10);
        assert!(bounded <= 13);
        assert_eq!(estimate(&block, 1000), 300);
    }

    #[test]
    fn nested_classes_are_not_scanned() {
        let mut m = TreeMaker::new();
        let class = m.class("p/Local", vec![]);
        let stmt = crate::ast::Stmt {
            id: m.reserve(),
            span: Default::default(),
            kind: StmtKind::ClassDef(Box::new(class)),
        };
        assert_eq!(estimate(&stmt, 50), 0);
    }
}
