use super::{ConstValue, FieldSymbol, LocalVar, MethodSymbol, MethodType, NodeId, Span, Symbol, Type};
use super::flags;

/// An attributed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    /// Erased type of the expression.
    pub ty: Type,
    /// Folded value when the expression is a compile-time constant.
    pub const_value: Option<ConstValue>,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal. Its value is in `const_value`; the `null` literal has type `Null`.
    Literal,
    Ident(Symbol),
    /// `this` or `super`; with `ctor` set this is the callee of a `this(...)`/`super(...)` call.
    SelfRef { is_super: bool, ctor: Option<MethodSymbol> },
    Select { target: Box<Expr>, sym: Symbol },
    /// `T.class`
    ClassLiteral(Type),
    Apply { callee: Box<Expr>, args: Vec<Expr> },
    NewClass { ctor: MethodSymbol, args: Vec<Expr> },
    /// Array creation; the array type is the expression type.
    NewArray { dims: Vec<Expr>, elems: Option<Vec<Expr>> },
    Parens(Box<Expr>),
    Assign { lhs: Box<Expr>, rhs: Box<Expr> },
    /// Compound assignment; `operand` is the type the operation is carried out in.
    AssignOp { op: BinaryOp, operand: Type, lhs: Box<Expr>, rhs: Box<Expr> },
    /// `operand` is the type the operand is converted to before the operation.
    Unary { op: UnaryOp, operand: Type, arg: Box<Expr> },
    /// `operand` is the type both sides are converted to (left side only for shifts).
    Binary { op: BinaryOp, operand: Type, lhs: Box<Expr>, rhs: Box<Expr> },
    TypeCast { target: Type, expr: Box<Expr> },
    TypeTest { expr: Box<Expr>, target: Type },
    Indexed { array: Box<Expr>, index: Box<Expr> },
    Conditional { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    /// Statements evaluated for effect, then a value.
    Let { stats: Vec<Stmt>, expr: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Pos,
    Neg,
    Compl,
    Not,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    NullCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Shl,
    Shr,
    Ushr,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::Ushr)
    }
}

impl Expr {
    pub fn is_constant(&self) -> bool {
        self.const_value.is_some()
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal) && self.ty == Type::Null
    }

    /// Strips any number of enclosing parentheses.
    pub fn skip_parens(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::Parens(inner) = &e.kind {
            e = inner;
        }
        e
    }

    /// The symbol an identifier or selection refers to.
    pub fn symbol(&self) -> Option<&Symbol> {
        match &self.kind {
            ExprKind::Ident(sym) | ExprKind::Select { sym, .. } => Some(sym),
            _ => None,
        }
    }
}

/// An attributed statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Block { stats: Vec<Stmt> },
    VarDef { var: LocalVar, init: Option<Expr> },
    Skip,
    DoLoop { body: Box<Stmt>, cond: Expr },
    WhileLoop { cond: Expr, body: Box<Stmt> },
    ForLoop { init: Vec<Stmt>, cond: Option<Expr>, step: Vec<Stmt>, body: Box<Stmt> },
    /// Enhanced `for`; must be desugared before code generation.
    ForeachLoop { var: LocalVar, expr: Expr, body: Box<Stmt> },
    Labelled { label: String, body: Box<Stmt> },
    Switch { selector: Expr, cases: Vec<Case> },
    Synchronized { lock: Expr, body: Box<Stmt> },
    Try { body: Box<Stmt>, catchers: Vec<Catch>, finalizer: Option<Box<Stmt>> },
    If { cond: Expr, then_part: Box<Stmt>, else_part: Option<Box<Stmt>> },
    Exec(Expr),
    Break { target: NodeId },
    Continue { target: NodeId },
    Return(Option<Expr>),
    Throw(Expr),
    /// `assert`; must be desugared before code generation.
    Assert { cond: Expr, detail: Option<Expr> },
    /// Local class declaration; must be lifted out before code generation.
    ClassDef(Box<ClassDecl>),
}

impl Stmt {
    pub fn is_block(&self) -> bool {
        matches!(self.kind, StmtKind::Block { .. })
    }

    /// Statements of a block, or the statement itself.
    pub fn block_stats(&self) -> &[Stmt] {
        match &self.kind {
            StmtKind::Block { stats } => stats,
            _ => std::slice::from_ref(self),
        }
    }
}

/// One `case` (or `default` when `label` is `None`) of a switch.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    pub span: Span,
    pub label: Option<Expr>,
    pub stats: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Catch {
    pub span: Span,
    pub param: LocalVar,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub span: Span,
    pub name: String,
    pub flags: u32,
    pub ty: MethodType,
    pub params: Vec<LocalVar>,
    pub body: Option<Stmt>,
}

impl MethodDecl {
    pub fn is_static(&self) -> bool {
        self.flags & flags::STATIC != 0
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// A constructor whose first statement calls `super(...)` rather than `this(...)`.
    pub fn is_initial_constructor(&self) -> bool {
        if !self.is_constructor() {
            return false;
        }
        let Some(body) = &self.body else { return false };
        body.block_stats()
            .iter()
            .find_map(constructor_call)
            .map_or(false, |is_super| is_super)
    }

    /// Whether this is a synthetic accessor for a qualified `super` member
    /// (named `access$N` with an odd `N`).
    pub fn is_access_super(&self) -> bool {
        self.flags & flags::SYNTHETIC != 0
            && self.name.starts_with("access$")
            && self
                .name
                .bytes()
                .last()
                .map_or(false, |b| b.is_ascii_digit() && (b - b'0') & 1 == 1)
    }
}

/// `Some(is_super)` when the statement is a `this(...)`/`super(...)` call.
fn constructor_call(stmt: &Stmt) -> Option<bool> {
    let StmtKind::Exec(expr) = &stmt.kind else { return None };
    let ExprKind::Apply { callee, .. } = &expr.kind else { return None };
    match &callee.kind {
        ExprKind::SelfRef { is_super, ctor: Some(_) } => Some(*is_super),
        _ => None,
    }
}

/// An assignment `this.f = ...` to a synthetic field, as emitted for outer-instance captures.
pub fn is_synthetic_init(stmt: &Stmt) -> bool {
    let StmtKind::Exec(expr) = &stmt.kind else { return false };
    let ExprKind::Assign { lhs, .. } = &expr.kind else { return false };
    let ExprKind::Select { target, sym: Symbol::Field(field) } = &lhs.kind else { return false };
    field.flags & flags::SYNTHETIC != 0
        && matches!(target.kind, ExprKind::SelfRef { is_super: false, ctor: None })
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub span: Span,
    pub sym: FieldSymbol,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Method(MethodDecl),
    Field(FieldDecl),
    /// Instance or static initializer block.
    Initializer { span: Span, is_static: bool, body: Stmt },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub span: Span,
    /// Internal name, e.g. `pkg/Outer$Inner`.
    pub name: String,
    pub super_name: String,
    pub flags: u32,
    pub members: Vec<ClassMember>,
}

impl ClassDecl {
    pub fn is_interface(&self) -> bool {
        self.flags & flags::INTERFACE != 0
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Method(md) => Some(md),
            _ => None,
        })
    }
}
