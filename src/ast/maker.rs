//! Builder for attributed trees.
//!
//! `TreeMaker` hands out node and variable ids and fills in the erased
//! types that attribution would otherwise compute, so trees can be built
//! by hand for synthesized code and for tests.

use super::*;

#[derive(Debug, Clone)]
pub struct TreeMaker {
    next_node: u32,
    next_var: u32,
    line: usize,
}

impl Default for TreeMaker {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeMaker {
    pub fn new() -> Self {
        Self { next_node: 0, next_var: 0, line: 1 }
    }

    /// Sets the source line given to subsequently built nodes.
    pub fn at(&mut self, line: usize) -> &mut Self {
        self.line = line;
        self
    }

    fn span(&self) -> Span {
        Span::line(self.line)
    }

    /// Reserves a statement id, for loops and switches whose bodies jump to them.
    pub fn reserve(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn stmt(&mut self, kind: StmtKind) -> Stmt {
        let id = self.reserve();
        Stmt { id, span: self.span(), kind }
    }

    fn stmt_with_id(&self, id: NodeId, kind: StmtKind) -> Stmt {
        Stmt { id, span: self.span(), kind }
    }

    fn expr(&self, ty: Type, kind: ExprKind) -> Expr {
        Expr { span: self.span(), ty, const_value: None, kind }
    }

    // ----- symbols -----

    pub fn local(&mut self, name: &str, ty: Type) -> LocalVar {
        let id = VarId(self.next_var);
        self.next_var += 1;
        LocalVar { id, name: name.to_string(), ty, const_value: None }
    }

    pub fn field_sym(&self, owner: &str, name: &str, ty: Type, flags: u32) -> FieldSymbol {
        FieldSymbol {
            owner: owner.to_string(),
            name: name.to_string(),
            ty,
            flags,
            const_value: None,
        }
    }

    pub fn method_sym(&self, owner: &str, name: &str, params: Vec<Type>, ret: Type, flags: u32) -> MethodSymbol {
        MethodSymbol {
            owner: owner.to_string(),
            name: name.to_string(),
            ty: MethodType::new(params, ret),
            flags,
            owner_is_interface: false,
        }
    }

    // ----- literals -----

    pub fn constant(&self, ty: Type, value: ConstValue) -> Expr {
        let mut e = self.expr(ty, ExprKind::Literal);
        e.const_value = Some(value);
        e
    }

    pub fn int(&self, v: i32) -> Expr {
        self.constant(Type::Int, ConstValue::Int(v))
    }

    pub fn long(&self, v: i64) -> Expr {
        self.constant(Type::Long, ConstValue::Long(v))
    }

    pub fn float(&self, v: f32) -> Expr {
        self.constant(Type::Float, ConstValue::Float(v))
    }

    pub fn double(&self, v: f64) -> Expr {
        self.constant(Type::Double, ConstValue::Double(v))
    }

    pub fn boolean(&self, v: bool) -> Expr {
        self.constant(Type::Boolean, ConstValue::Int(v as i32))
    }

    pub fn string(&self, v: &str) -> Expr {
        self.constant(Type::string(), ConstValue::String(v.to_string()))
    }

    pub fn null(&self) -> Expr {
        self.expr(Type::Null, ExprKind::Literal)
    }

    // ----- names -----

    pub fn ident(&self, var: &LocalVar) -> Expr {
        let mut e = self.expr(var.ty.clone(), ExprKind::Ident(Symbol::Local(var.id)));
        e.const_value = var.const_value.clone();
        e
    }

    /// Unqualified reference to a field of the current class.
    pub fn field(&self, sym: &FieldSymbol) -> Expr {
        let mut e = self.expr(sym.ty.clone(), ExprKind::Ident(Symbol::Field(sym.clone())));
        e.const_value = sym.const_value.clone();
        e
    }

    pub fn select(&self, target: Expr, sym: &FieldSymbol) -> Expr {
        let mut e = self.expr(
            sym.ty.clone(),
            ExprKind::Select { target: Box::new(target), sym: Symbol::Field(sym.clone()) },
        );
        e.const_value = sym.const_value.clone();
        e
    }

    /// A type name used as a qualifier.
    pub fn type_name(&self, ty: Type) -> Expr {
        self.expr(ty.clone(), ExprKind::Ident(Symbol::Type(ty)))
    }

    pub fn this(&self, class: &str) -> Expr {
        self.expr(Type::class(class), ExprKind::SelfRef { is_super: false, ctor: None })
    }

    pub fn array_length(&self, array: Expr) -> Expr {
        self.expr(Type::Int, ExprKind::Select { target: Box::new(array), sym: Symbol::ArrayLength })
    }

    pub fn class_literal(&self, ty: Type) -> Expr {
        self.expr(Type::class("java/lang/Class"), ExprKind::ClassLiteral(ty))
    }

    // ----- calls and allocation -----

    /// Unqualified call: static, or an instance method of `this`.
    pub fn call(&self, method: &MethodSymbol, args: Vec<Expr>) -> Expr {
        let callee = self.expr(Type::Void, ExprKind::Ident(Symbol::Method(method.clone())));
        self.expr(method.ty.ret.clone(), ExprKind::Apply { callee: Box::new(callee), args })
    }

    pub fn call_on(&self, target: Expr, method: &MethodSymbol, args: Vec<Expr>) -> Expr {
        let callee = self.expr(
            Type::Void,
            ExprKind::Select { target: Box::new(target), sym: Symbol::Method(method.clone()) },
        );
        self.expr(method.ty.ret.clone(), ExprKind::Apply { callee: Box::new(callee), args })
    }

    /// `super(args)` or `this(args)` at the head of a constructor.
    pub fn ctor_call(&self, is_super: bool, ctor: &MethodSymbol, args: Vec<Expr>) -> Expr {
        let callee = self.expr(
            Type::Void,
            ExprKind::SelfRef { is_super, ctor: Some(ctor.clone()) },
        );
        self.expr(Type::Void, ExprKind::Apply { callee: Box::new(callee), args })
    }

    pub fn new_class(&self, ctor: &MethodSymbol, args: Vec<Expr>) -> Expr {
        self.expr(Type::class(&ctor.owner), ExprKind::NewClass { ctor: ctor.clone(), args })
    }

    /// `new elem[d0][d1]...`; the result has one array level per dimension
    /// expression plus `extra_dims` unsized levels.
    pub fn new_array(&self, elem: Type, dims: Vec<Expr>, extra_dims: usize) -> Expr {
        let mut ty = elem;
        for _ in 0..dims.len() + extra_dims {
            ty = Type::array_of(ty);
        }
        self.expr(ty, ExprKind::NewArray { dims, elems: None })
    }

    /// `new elem[] { ... }`
    pub fn array_init(&self, elem: Type, elems: Vec<Expr>) -> Expr {
        self.expr(Type::array_of(elem), ExprKind::NewArray { dims: Vec::new(), elems: Some(elems) })
    }

    // ----- operators -----

    pub fn parens(&self, e: Expr) -> Expr {
        let mut p = self.expr(e.ty.clone(), ExprKind::Parens(Box::new(e.clone())));
        p.const_value = e.const_value;
        p
    }

    pub fn assign(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.expr(lhs.ty.clone(), ExprKind::Assign { lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    pub fn assign_op(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        let operand = if op == BinaryOp::Plus && lhs.ty.is_string() {
            Type::string()
        } else if op.is_shift() {
            unary_promote(&lhs.ty)
        } else {
            binary_promote(&lhs.ty, &rhs.ty)
        };
        self.expr(
            lhs.ty.clone(),
            ExprKind::AssignOp { op, operand, lhs: Box::new(lhs), rhs: Box::new(rhs) },
        )
    }

    pub fn unary(&self, op: UnaryOp, arg: Expr) -> Expr {
        let (operand, ty) = match op {
            UnaryOp::Not => (Type::Boolean, Type::Boolean),
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                (arg.ty.clone(), arg.ty.clone())
            }
            UnaryOp::NullCheck => (arg.ty.clone(), arg.ty.clone()),
            UnaryOp::Pos | UnaryOp::Neg | UnaryOp::Compl => {
                let t = unary_promote(&arg.ty);
                (t.clone(), t)
            }
        };
        self.expr(ty, ExprKind::Unary { op, operand, arg: Box::new(arg) })
    }

    pub fn binary(&self, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        let (operand, ty) = binary_types(op, &lhs.ty, &rhs.ty);
        self.expr(ty, ExprKind::Binary { op, operand, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    pub fn cast(&self, target: Type, e: Expr) -> Expr {
        self.expr(target.clone(), ExprKind::TypeCast { target, expr: Box::new(e) })
    }

    pub fn instance_of(&self, e: Expr, target: Type) -> Expr {
        self.expr(Type::Boolean, ExprKind::TypeTest { expr: Box::new(e), target })
    }

    pub fn index(&self, array: Expr, index: Expr) -> Expr {
        let ty = array.ty.element_type().cloned().unwrap_or_else(Type::object);
        self.expr(ty, ExprKind::Indexed { array: Box::new(array), index: Box::new(index) })
    }

    pub fn conditional(&self, cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
        let ty = if then_expr.ty == Type::Null { else_expr.ty.clone() } else { then_expr.ty.clone() };
        self.expr(
            ty,
            ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
        )
    }

    pub fn let_expr(&self, stats: Vec<Stmt>, e: Expr) -> Expr {
        self.expr(e.ty.clone(), ExprKind::Let { stats, expr: Box::new(e) })
    }

    // ----- statements -----

    pub fn block(&mut self, stats: Vec<Stmt>) -> Stmt {
        self.stmt(StmtKind::Block { stats })
    }

    pub fn var_def(&mut self, var: &LocalVar, init: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::VarDef { var: var.clone(), init })
    }

    pub fn skip(&mut self) -> Stmt {
        self.stmt(StmtKind::Skip)
    }

    pub fn exec(&mut self, e: Expr) -> Stmt {
        self.stmt(StmtKind::Exec(e))
    }

    pub fn if_stmt(&mut self, cond: Expr, then_part: Stmt, else_part: Option<Stmt>) -> Stmt {
        self.stmt(StmtKind::If {
            cond,
            then_part: Box::new(then_part),
            else_part: else_part.map(Box::new),
        })
    }

    pub fn while_loop(&self, id: NodeId, cond: Expr, body: Stmt) -> Stmt {
        self.stmt_with_id(id, StmtKind::WhileLoop { cond, body: Box::new(body) })
    }

    pub fn do_loop(&self, id: NodeId, body: Stmt, cond: Expr) -> Stmt {
        self.stmt_with_id(id, StmtKind::DoLoop { body: Box::new(body), cond })
    }

    pub fn for_loop(
        &self,
        id: NodeId,
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Stmt>,
        body: Stmt,
    ) -> Stmt {
        self.stmt_with_id(id, StmtKind::ForLoop { init, cond, step, body: Box::new(body) })
    }

    pub fn labelled(&self, id: NodeId, label: &str, body: Stmt) -> Stmt {
        self.stmt_with_id(id, StmtKind::Labelled { label: label.to_string(), body: Box::new(body) })
    }

    pub fn switch(&self, id: NodeId, selector: Expr, cases: Vec<Case>) -> Stmt {
        self.stmt_with_id(id, StmtKind::Switch { selector, cases })
    }

    pub fn case(&self, label: Option<i32>, stats: Vec<Stmt>) -> Case {
        Case { span: self.span(), label: label.map(|v| self.int(v)), stats }
    }

    pub fn synchronized(&mut self, lock: Expr, body: Stmt) -> Stmt {
        self.stmt(StmtKind::Synchronized { lock, body: Box::new(body) })
    }

    pub fn try_stmt(&mut self, body: Stmt, catchers: Vec<Catch>, finalizer: Option<Stmt>) -> Stmt {
        self.stmt(StmtKind::Try {
            body: Box::new(body),
            catchers,
            finalizer: finalizer.map(Box::new),
        })
    }

    pub fn catch(&self, param: &LocalVar, body: Stmt) -> Catch {
        Catch { span: self.span(), param: param.clone(), body: Box::new(body) }
    }

    pub fn break_stmt(&mut self, target: NodeId) -> Stmt {
        self.stmt(StmtKind::Break { target })
    }

    pub fn continue_stmt(&mut self, target: NodeId) -> Stmt {
        self.stmt(StmtKind::Continue { target })
    }

    pub fn return_stmt(&mut self, e: Option<Expr>) -> Stmt {
        self.stmt(StmtKind::Return(e))
    }

    pub fn throw_stmt(&mut self, e: Expr) -> Stmt {
        self.stmt(StmtKind::Throw(e))
    }

    pub fn assert_stmt(&mut self, cond: Expr) -> Stmt {
        self.stmt(StmtKind::Assert { cond, detail: None })
    }

    // ----- declarations -----

    pub fn method(
        &self,
        name: &str,
        flags: u32,
        params: Vec<LocalVar>,
        ret: Type,
        body: Option<Stmt>,
    ) -> MethodDecl {
        let ty = MethodType::new(params.iter().map(|p| p.ty.clone()).collect(), ret);
        MethodDecl { span: self.span(), name: name.to_string(), flags, ty, params, body }
    }

    pub fn class(&self, name: &str, members: Vec<ClassMember>) -> ClassDecl {
        ClassDecl {
            span: self.span(),
            name: name.to_string(),
            super_name: OBJECT_CLASS.to_string(),
            flags: flags::PUBLIC,
            members,
        }
    }
}

/// Unary numeric promotion.
pub fn unary_promote(t: &Type) -> Type {
    match t {
        Type::Byte | Type::Short | Type::Char | Type::Int => Type::Int,
        other => other.clone(),
    }
}

/// Binary numeric promotion.
pub fn binary_promote(a: &Type, b: &Type) -> Type {
    if *a == Type::Double || *b == Type::Double {
        Type::Double
    } else if *a == Type::Float || *b == Type::Float {
        Type::Float
    } else if *a == Type::Long || *b == Type::Long {
        Type::Long
    } else {
        Type::Int
    }
}

/// Operand and result types of a binary operator applied to `a` and `b`.
fn binary_types(op: BinaryOp, a: &Type, b: &Type) -> (Type, Type) {
    match op {
        BinaryOp::And | BinaryOp::Or => (Type::Boolean, Type::Boolean),
        BinaryOp::Eq | BinaryOp::Ne => {
            if a.is_reference() || b.is_reference() {
                (Type::object(), Type::Boolean)
            } else if *a == Type::Boolean {
                (Type::Boolean, Type::Boolean)
            } else {
                (binary_promote(a, b), Type::Boolean)
            }
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            (binary_promote(a, b), Type::Boolean)
        }
        BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor if *a == Type::Boolean => {
            (Type::Boolean, Type::Boolean)
        }
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr => {
            let t = unary_promote(a);
            (t.clone(), t)
        }
        BinaryOp::Plus if a.is_string() || b.is_string() => (Type::string(), Type::string()),
        _ => {
            let t = binary_promote(a, b);
            (t.clone(), t)
        }
    }
}
