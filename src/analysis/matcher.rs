//! Iterator usage matching.
//!
//! Answers "is this node an operation on the loop iterator, and on which
//! side?" by variable identity. Two variables that share a name in
//! different scopes never match.

use crate::frontend::ast::{Expr, ExprKind, walk_expr, AstVisitor};
use crate::frontend::semantic::VarId;

/// Where the iterator sits in a binary expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IteratorSide<'a> {
    /// Iterator on the left; carries the right-hand operand.
    Left(&'a Expr),
    /// Iterator on the right; carries the left-hand operand.
    Right(&'a Expr),
    Neither,
}

impl<'a> IteratorSide<'a> {
    /// `-1` for left, `+1` for right, `0` when neither.
    pub fn order(&self) -> i8 {
        match self {
            IteratorSide::Left(_) => -1,
            IteratorSide::Right(_) => 1,
            IteratorSide::Neither => 0,
        }
    }

    /// The operand opposite the iterator.
    pub fn other(&self) -> Option<&'a Expr> {
        match *self {
            IteratorSide::Left(other) | IteratorSide::Right(other) => Some(other),
            IteratorSide::Neither => None,
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, IteratorSide::Neither)
    }
}

/// Matches expressions against one iterator variable.
#[derive(Debug, Clone, Copy)]
pub struct IteratorMatcher {
    iterator: VarId,
}

impl IteratorMatcher {
    pub fn new(iterator: VarId) -> Self {
        Self { iterator }
    }

    pub fn iterator(&self) -> VarId {
        self.iterator
    }

    /// True iff `expr` is a bare reference to the iterator.
    pub fn is_iterator(&self, expr: &Expr) -> bool {
        matches!(expr.as_variable(), Some(var) if var.id == self.iterator)
    }

    /// True iff `expr` is a prefix or postfix operator applied directly to
    /// the iterator.
    pub fn matches_unary(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::LeftUnary { value, .. } | ExprKind::RightUnary { value, .. } => self.is_iterator(value),
            _ => false,
        }
    }

    /// Locate the iterator among the operands of a binary node.
    ///
    /// When both operands are the iterator, the left side wins.
    pub fn matches_binary<'a>(&self, expr: &'a Expr) -> IteratorSide<'a> {
        match &expr.kind {
            ExprKind::Binary { left, right, .. } => {
                if self.is_iterator(left) {
                    IteratorSide::Left(right)
                } else if self.is_iterator(right) {
                    IteratorSide::Right(left)
                } else {
                    IteratorSide::Neither
                }
            }
            _ => IteratorSide::Neither,
        }
    }

    /// True iff the iterator occurs anywhere inside `expr`.
    pub fn uses_iterator(&self, expr: &Expr) -> bool {
        let mut finder = UseFinder { iterator: self.iterator, found: false };
        finder.visit_expr(expr);
        finder.found
    }
}

struct UseFinder {
    iterator: VarId,
    found: bool,
}

impl AstVisitor for UseFinder {
    fn visit_expr(&mut self, expr: &Expr) {
        if self.found {
            return;
        }
        match &expr.kind {
            ExprKind::Variable(var) if var.id == self.iterator => self.found = true,
            _ => walk_expr(self, expr),
        }
    }
}
