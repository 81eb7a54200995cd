//! Abstract Syntax Tree (AST) for the kernel dialect.
//!
//! Statements and expressions are closed sum types. Child nodes are owned
//! (`Box`/`Vec`), while variable references are identity handles
//! ([`VarRef`]) into the program's [`VarTable`].

use crate::frontend::semantic::{VarId, VarTable};
use crate::utils::intern::Symbol;
use crate::utils::location::Span;
use serde::Serialize;
use std::fmt;

/// A parsed translation unit.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    /// Functions in source order
    pub functions: Vec<Function>,
    /// Every variable declared anywhere in the program
    pub vars: VarTable,
    /// Source span
    pub span: Span,
}

impl Program {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            vars: VarTable::new(),
            span: Span::dummy(),
        }
    }

    /// Functions carrying the `@kernel` attribute.
    pub fn kernels(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().filter(|f| f.is_kernel())
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

/// A function definition.
#[derive(Debug, Clone, Serialize)]
pub struct Function {
    pub name: Symbol,
    pub return_type: Type,
    pub params: Vec<VarRef>,
    pub body: Block,
    pub attributes: Vec<Attribute>,
    pub span: Span,
}

impl Function {
    pub fn is_kernel(&self) -> bool {
        self.attributes.iter().any(Attribute::is_kernel)
    }
}

/// A built-in type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Bool,
    Void,
    Pointer(Box<Type>),
}

impl Type {
    /// Types a device-loop iterator may be declared with.
    ///
    /// `long` is deliberately absent: iterators must fit the backend's native
    /// index width.
    pub fn is_iterator_type(&self) -> bool {
        matches!(self, Type::Char | Type::Short | Type::Int)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Char => write!(f, "char"),
            Type::Short => write!(f, "short"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Bool => write!(f, "bool"),
            Type::Void => write!(f, "void"),
            Type::Pointer(inner) => write!(f, "{} *", inner),
        }
    }
}

/// An attribute such as `@kernel`, `@outer` or `@inner(1)`.
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    pub name: Symbol,
    pub args: Vec<Expr>,
    pub span: Span,
}

impl Attribute {
    pub fn is_kernel(&self) -> bool {
        self.name == *crate::utils::intern::attrs::KERNEL
    }
}

/// A brace-delimited list of statements.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A statement.
#[derive(Debug, Clone, Serialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
    pub attributes: Vec<Attribute>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span, attributes: Vec::new() }
    }

    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn as_for(&self) -> Option<&ForStmt> {
        match &self.kind {
            StmtKind::For(for_stmt) => Some(for_stmt),
            _ => None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self.kind, StmtKind::Declaration(_))
    }

    /// Direct child statements, in source order. Header statements of a `for`
    /// loop come before its body.
    pub fn children(&self) -> Vec<&Stmt> {
        match &self.kind {
            StmtKind::For(f) => vec![&*f.init, &*f.check, &*f.update, &*f.body],
            StmtKind::Block(block) => block.statements.iter().collect(),
            StmtKind::If { then_branch, else_branch, .. } => {
                let mut children = vec![&**then_branch];
                if let Some(else_branch) = else_branch {
                    children.push(&**else_branch);
                }
                children
            }
            StmtKind::While { body, .. } => vec![&**body],
            StmtKind::Declaration(_) | StmtKind::Expression(_) | StmtKind::Return(_) | StmtKind::Empty => {
                Vec::new()
            }
        }
    }
}

/// The kind of a statement.
#[derive(Debug, Clone, Serialize)]
pub enum StmtKind {
    /// `int i = 0, j;`
    Declaration(Vec<VarDecl>),
    /// `expr;`
    Expression(Expr),
    /// `for (init; check; update) body`
    For(ForStmt),
    /// `{ ... }`
    Block(Block),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    /// `;` or an omitted `for` header clause
    Empty,
}

/// The four owned parts of a `for` statement.
#[derive(Debug, Clone, Serialize)]
pub struct ForStmt {
    pub init: Box<Stmt>,
    pub check: Box<Stmt>,
    pub update: Box<Stmt>,
    pub body: Box<Stmt>,
}

/// One declarator in a declaration statement.
#[derive(Debug, Clone, Serialize)]
pub struct VarDecl {
    pub var: VarRef,
    pub value: Option<Expr>,
    pub span: Span,
}

/// A non-owning reference to a declared variable.
///
/// Equality is identity: two references are equal iff they name the same
/// declaration, whatever their spelling.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VarRef {
    pub id: VarId,
    pub name: Symbol,
}

impl VarRef {
    pub fn new(id: VarId, name: Symbol) -> Self {
        Self { id, name }
    }
}

impl PartialEq for VarRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VarRef {}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn int_lit(value: i64, span: Span) -> Self {
        Self::new(ExprKind::Primitive(Primitive::Int(value)), span)
    }

    pub fn var(var: VarRef, span: Span) -> Self {
        Self::new(ExprKind::Variable(var), span)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr, span: Span) -> Self {
        Self::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, span)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// A new owned node that evaluates `self` as a unit when embedded in a
    /// larger tree. Already-parenthesized nodes are copied, not re-wrapped.
    pub fn wrap_in_parentheses(&self) -> Expr {
        match self.kind {
            ExprKind::Parentheses(_) => self.clone(),
            _ => Expr::new(ExprKind::Parentheses(Box::new(self.clone())), self.span),
        }
    }

    /// Copy of `self` with every parentheses node removed.
    pub fn without_parentheses(&self) -> Expr {
        let kind = match &self.kind {
            ExprKind::Parentheses(inner) => return inner.without_parentheses(),
            ExprKind::Variable(_) | ExprKind::Primitive(_) => self.kind.clone(),
            ExprKind::LeftUnary { op, value } => ExprKind::LeftUnary {
                op: *op,
                value: Box::new(value.without_parentheses()),
            },
            ExprKind::RightUnary { op, value } => ExprKind::RightUnary {
                op: *op,
                value: Box::new(value.without_parentheses()),
            },
            ExprKind::Binary { op, left, right } => ExprKind::Binary {
                op: *op,
                left: Box::new(left.without_parentheses()),
                right: Box::new(right.without_parentheses()),
            },
            ExprKind::Subscript { array, index } => ExprKind::Subscript {
                array: Box::new(array.without_parentheses()),
                index: Box::new(index.without_parentheses()),
            },
            ExprKind::Call { function, args } => ExprKind::Call {
                function: *function,
                args: args.iter().map(Expr::without_parentheses).collect(),
            },
        };
        Expr::new(kind, self.span)
    }

    /// Structural equality, ignoring spans.
    pub fn same_shape(&self, other: &Expr) -> bool {
        match (&self.kind, &other.kind) {
            (ExprKind::Variable(a), ExprKind::Variable(b)) => a == b,
            (ExprKind::Primitive(a), ExprKind::Primitive(b)) => a == b,
            (ExprKind::Parentheses(a), ExprKind::Parentheses(b)) => a.same_shape(b),
            (ExprKind::LeftUnary { op: o1, value: v1 }, ExprKind::LeftUnary { op: o2, value: v2 })
            | (ExprKind::RightUnary { op: o1, value: v1 }, ExprKind::RightUnary { op: o2, value: v2 }) => {
                o1 == o2 && v1.same_shape(v2)
            }
            (
                ExprKind::Binary { op: o1, left: l1, right: r1 },
                ExprKind::Binary { op: o2, left: l2, right: r2 },
            ) => o1 == o2 && l1.same_shape(l2) && r1.same_shape(r2),
            (
                ExprKind::Subscript { array: a1, index: i1 },
                ExprKind::Subscript { array: a2, index: i2 },
            ) => a1.same_shape(a2) && i1.same_shape(i2),
            (ExprKind::Call { function: f1, args: a1 }, ExprKind::Call { function: f2, args: a2 }) => {
                f1 == f2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(a, b)| a.same_shape(b))
            }
            _ => false,
        }
    }

    pub fn as_variable(&self) -> Option<&VarRef> {
        match &self.kind {
            ExprKind::Variable(var) => Some(var),
            _ => None,
        }
    }

    /// The leftmost leaf of this expression, used to point diagnostics at the
    /// start of an operator expression.
    pub fn start_node(&self) -> &Expr {
        match &self.kind {
            ExprKind::RightUnary { value, .. } => value.start_node(),
            ExprKind::Binary { left, .. } => left.start_node(),
            ExprKind::Subscript { array, .. } => array.start_node(),
            // A prefix operator already starts at its own token.
            _ => self,
        }
    }
}

/// The kind of an expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    /// Reference to a declared variable
    Variable(VarRef),
    /// Literal value
    Primitive(Primitive),
    /// Prefix operator: `++i`, `-x`
    LeftUnary { op: UnaryOp, value: Box<Expr> },
    /// Postfix operator: `i++`
    RightUnary { op: UnaryOp, value: Box<Expr> },
    /// Binary operator, including (compound) assignment
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    /// `( expr )`
    Parentheses(Box<Expr>),
    /// `a[i]`
    Subscript { array: Box<Expr>, index: Box<Expr> },
    /// `f(a, b)`
    Call { function: Symbol, args: Vec<Expr> },
}

/// A literal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Primitive {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::Int(v) => write!(f, "{}", v),
            Primitive::Float(v) => write!(f, "{:?}", v),
            Primitive::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Unary operators. Prefix vs postfix placement is carried by the node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UnaryOp {
    Increment,
    Decrement,
    Negate,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Increment => write!(f, "++"),
            UnaryOp::Decrement => write!(f, "--"),
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,

    // Logical
    And,
    Or,

    // Assignment
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl BinaryOp {
    /// C precedence (higher binds tighter).
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Assign | BinaryOp::AddAssign | BinaryOp::SubAssign
            | BinaryOp::MulAssign | BinaryOp::DivAssign => 1,
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Eq | BinaryOp::Ne => 4,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 5,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
        }
    }

    pub fn is_assignment(&self) -> bool {
        matches!(
            self,
            BinaryOp::Assign | BinaryOp::AddAssign | BinaryOp::SubAssign
                | BinaryOp::MulAssign | BinaryOp::DivAssign
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Assign => "=",
            BinaryOp::AddAssign => "+=",
            BinaryOp::SubAssign => "-=",
            BinaryOp::MulAssign => "*=",
            BinaryOp::DivAssign => "/=",
        };
        f.write_str(s)
    }
}

/// Read-only traversal over statements and expressions.
pub trait AstVisitor {
    fn visit_function(&mut self, func: &Function) {
        self.visit_block(&func.body);
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

/// Visit the children of `stmt`.
pub fn walk_stmt<V: AstVisitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Declaration(decls) => {
            for decl in decls {
                if let Some(value) = &decl.value {
                    visitor.visit_expr(value);
                }
            }
        }
        StmtKind::Expression(expr) => visitor.visit_expr(expr),
        StmtKind::For(f) => {
            visitor.visit_stmt(&f.init);
            visitor.visit_stmt(&f.check);
            visitor.visit_stmt(&f.update);
            visitor.visit_stmt(&f.body);
        }
        StmtKind::Block(block) => visitor.visit_block(block),
        StmtKind::If { condition, then_branch, else_branch } => {
            visitor.visit_expr(condition);
            visitor.visit_stmt(then_branch);
            if let Some(else_branch) = else_branch {
                visitor.visit_stmt(else_branch);
            }
        }
        StmtKind::While { condition, body } => {
            visitor.visit_expr(condition);
            visitor.visit_stmt(body);
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        StmtKind::Empty => {}
    }
}

/// Visit the children of `expr`.
pub fn walk_expr<V: AstVisitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::LeftUnary { value, .. } | ExprKind::RightUnary { value, .. } => {
            visitor.visit_expr(value);
        }
        ExprKind::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        ExprKind::Parentheses(inner) => visitor.visit_expr(inner),
        ExprKind::Subscript { array, index } => {
            visitor.visit_expr(array);
            visitor.visit_expr(index);
        }
        ExprKind::Call { args, .. } => {
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        ExprKind::Variable(_) | ExprKind::Primitive(_) => {}
    }
}
