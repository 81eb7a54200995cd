//! Loop shape validation.
//!
//! A device loop must have exactly this header shape:
//!
//! ```text
//! for (T it = init; it OP bound; STEP)    T    in char, short, int
//!                                         OP   in <, <=, >=, >  (iterator on either side)
//!                                         STEP in ++it, it++, --it, it--, it += s, it -= s
//! ```
//!
//! [`LoopValidator::validate`] checks `init`, `check` and `update` in that
//! order, stops at the first violation and returns a [`LoopDescriptor`]
//! holding every fact extracted up to that point.

use crate::analysis::matcher::{IteratorMatcher, IteratorSide};
use crate::frontend::ast::{BinaryOp, Expr, ExprKind, ForStmt, StmtKind, UnaryOp, VarRef};
use crate::frontend::semantic::VarTable;
use crate::utils::diagnostics::{Diagnostic, DiagnosticSink};
use crate::utils::errors::{LoopError, LoopErrorKind};
use crate::utils::location::Span;
use crate::CheckConfig;
use log::{debug, trace};
use serde::Serialize;
use std::fmt;

/// How the iterator is stepped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UpdateOp {
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
    AddAssign,
    SubAssign,
}

impl UpdateOp {
    pub fn direction(&self) -> Direction {
        match self {
            UpdateOp::PreIncrement | UpdateOp::PostIncrement | UpdateOp::AddAssign => Direction::Ascending,
            UpdateOp::PreDecrement | UpdateOp::PostDecrement | UpdateOp::SubAssign => Direction::Descending,
        }
    }
}

impl fmt::Display for UpdateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UpdateOp::PreIncrement => "++it",
            UpdateOp::PreDecrement => "--it",
            UpdateOp::PostIncrement => "it++",
            UpdateOp::PostDecrement => "it--",
            UpdateOp::AddAssign => "+=",
            UpdateOp::SubAssign => "-=",
        };
        f.write_str(s)
    }
}

/// Stepping direction of the iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Ascending,
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => write!(f, "ascending"),
            Direction::Descending => write!(f, "descending"),
        }
    }
}

/// Canonical facts about one `for` statement.
///
/// Expression fields borrow from the validated statement. When
/// [`is_valid`](Self::is_valid) is true, the iterator, both check fields,
/// the update operator and the direction are all present.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopDescriptor<'a> {
    iterator: Option<VarRef>,
    iterator_span: Span,
    init_value: Option<&'a Expr>,
    check_operator: Option<BinaryOp>,
    check_is_inclusive: bool,
    check_value: Option<&'a Expr>,
    check_value_on_right: bool,
    update_operator: Option<UpdateOp>,
    update_value: Option<&'a Expr>,
    direction: Option<Direction>,
    valid: bool,
    failure: Option<LoopError>,
}

impl<'a> LoopDescriptor<'a> {
    fn empty() -> Self {
        Self {
            iterator: None,
            iterator_span: Span::dummy(),
            init_value: None,
            check_operator: None,
            check_is_inclusive: false,
            check_value: None,
            check_value_on_right: false,
            update_operator: None,
            update_value: None,
            direction: None,
            valid: false,
            failure: None,
        }
    }

    pub fn iterator(&self) -> Option<VarRef> {
        self.iterator
    }

    /// Span of the iterator's declaration.
    pub fn iterator_span(&self) -> Span {
        self.iterator_span
    }

    pub fn init_value(&self) -> Option<&'a Expr> {
        self.init_value
    }

    pub fn check_operator(&self) -> Option<BinaryOp> {
        self.check_operator
    }

    /// True for `<=` and `>=`.
    pub fn check_is_inclusive(&self) -> bool {
        self.check_is_inclusive
    }

    /// The bound the iterator is compared against.
    pub fn check_value(&self) -> Option<&'a Expr> {
        self.check_value
    }

    /// True when the bound is the right operand (`i < N`), false for `N > i`.
    pub fn check_value_on_right(&self) -> bool {
        self.check_value_on_right
    }

    pub fn update_operator(&self) -> Option<UpdateOp> {
        self.update_operator
    }

    /// Step of a `+=`/`-=` update. `None` for unit steps.
    pub fn update_value(&self) -> Option<&'a Expr> {
        self.update_value
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The first violation found, if any.
    pub fn failure(&self) -> Option<&LoopError> {
        self.failure.as_ref()
    }
}

/// Prefix `message` with `[label] ` unless the label is empty.
pub(crate) fn labeled(label: &str, message: &str) -> String {
    if label.is_empty() {
        message.to_string()
    } else {
        format!("[{}] {}", label, message)
    }
}

/// Validates `for` statements against the device loop shape.
pub struct LoopValidator<'v> {
    vars: &'v VarTable,
    sink: &'v mut dyn DiagnosticSink,
    config: &'v CheckConfig,
}

impl<'v> LoopValidator<'v> {
    pub fn new(vars: &'v VarTable, sink: &'v mut dyn DiagnosticSink, config: &'v CheckConfig) -> Self {
        Self { vars, sink, config }
    }

    /// Validate one loop. The statement is only read.
    pub fn validate<'a>(&mut self, for_stmt: &'a ForStmt, source_label: &str) -> LoopDescriptor<'a> {
        let mut desc = LoopDescriptor::empty();

        let result = self
            .check_init(for_stmt, &mut desc, source_label)
            .and_then(|_| self.check_check(for_stmt, &mut desc, source_label))
            .and_then(|_| self.check_update(for_stmt, &mut desc, source_label));

        match result {
            Ok(()) => {
                desc.valid = true;
                debug!(
                    "Valid loop over {}: {} bound, {} step",
                    desc.iterator.map(|v| v.name.as_string()).unwrap_or_default(),
                    if desc.check_is_inclusive { "inclusive" } else { "exclusive" },
                    desc.direction.map(|d| d.to_string()).unwrap_or_default(),
                );
            }
            Err(err) => {
                debug!("Rejected loop: {}", err);
                if self.config.print_errors {
                    self.sink.report(Diagnostic::error(err.span, err.message.clone()));
                }
                desc.failure = Some(err);
            }
        }

        desc
    }

    /// Shape check only.
    pub fn is_valid(&mut self, for_stmt: &ForStmt, source_label: &str) -> bool {
        self.validate(for_stmt, source_label).is_valid()
    }

    fn check_init<'a>(
        &self,
        for_stmt: &'a ForStmt,
        desc: &mut LoopDescriptor<'a>,
        label: &str,
    ) -> Result<(), LoopError> {
        trace!("Checking loop init");
        let decls = match &for_stmt.init.kind {
            StmtKind::Declaration(decls) if !decls.is_empty() => decls,
            _ => {
                return Err(LoopError::new(
                    LoopErrorKind::ExpectedDeclaration,
                    labeled(label, "Expected a declaration statement"),
                    for_stmt.init.span,
                ));
            }
        };

        if let Some(second) = decls.get(1) {
            return Err(LoopError::new(
                LoopErrorKind::MultipleIterators,
                labeled(label, "Can only have 1 iterator variable"),
                second.span,
            ));
        }

        let decl = &decls[0];
        let is_iterator_type = self.vars.ty(decl.var.id).map(|ty| ty.is_iterator_type()).unwrap_or(false);
        if !is_iterator_type {
            return Err(LoopError::new(
                LoopErrorKind::InvalidIteratorType,
                labeled(label, "Iterator variable needs to be of type [char, short, int]"),
                decl.span,
            ));
        }

        desc.iterator = Some(decl.var);
        desc.iterator_span = decl.span;
        desc.init_value = decl.value.as_ref();
        Ok(())
    }

    fn check_check<'a>(
        &self,
        for_stmt: &'a ForStmt,
        desc: &mut LoopDescriptor<'a>,
        label: &str,
    ) -> Result<(), LoopError> {
        trace!("Checking loop condition");
        let iterator = match desc.iterator {
            Some(iterator) => iterator,
            None => unreachable!("init check records the iterator"),
        };
        let bound_message = || labeled(label, &format!("Expected comparing [{}] with some bound", iterator.name));
        let operator_message = || {
            labeled(
                label,
                &format!("Expected to compare [{}] with one of these operators [<, <=, >=, >]", iterator.name),
            )
        };

        let expr = match &for_stmt.check.kind {
            StmtKind::Expression(expr) => expr,
            _ => {
                return Err(LoopError::new(
                    LoopErrorKind::ExpectedCheckExpression,
                    bound_message(),
                    for_stmt.check.span,
                ));
            }
        };

        let op = match &expr.kind {
            ExprKind::Binary { op, .. } => *op,
            _ => {
                return Err(LoopError::new(LoopErrorKind::ExpectedComparison, operator_message(), expr.span));
            }
        };
        if !matches!(op, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Gt) {
            return Err(LoopError::new(LoopErrorKind::InvalidCheckOperator, operator_message(), expr.span));
        }
        desc.check_operator = Some(op);
        desc.check_is_inclusive = matches!(op, BinaryOp::Le | BinaryOp::Ge);

        let side = IteratorMatcher::new(iterator.id).matches_binary(expr);
        match side {
            IteratorSide::Left(bound) | IteratorSide::Right(bound) => {
                desc.check_value = Some(bound);
                desc.check_value_on_right = side.order() < 0;
                Ok(())
            }
            IteratorSide::Neither => {
                Err(LoopError::new(LoopErrorKind::CheckMissingIterator, bound_message(), expr.span))
            }
        }
    }

    fn check_update<'a>(
        &self,
        for_stmt: &'a ForStmt,
        desc: &mut LoopDescriptor<'a>,
        label: &str,
    ) -> Result<(), LoopError> {
        trace!("Checking loop update");
        let iterator = match desc.iterator {
            Some(iterator) => iterator,
            None => unreachable!("init check records the iterator"),
        };
        let operator_message = || {
            labeled(
                label,
                &format!("Expected update [{}] with one of these operators [++, --, +=, -=]", iterator.name),
            )
        };

        let expr = match &for_stmt.update.kind {
            StmtKind::Expression(expr) => expr,
            _ => {
                return Err(LoopError::new(
                    LoopErrorKind::ExpectedUpdateExpression,
                    labeled(label, &format!("Expected to update [{}]", iterator.name)),
                    for_stmt.update.span,
                ));
            }
        };

        let matcher = IteratorMatcher::new(iterator.id);
        let (update_op, step, uses_iterator) = match &expr.kind {
            ExprKind::LeftUnary { op, .. } => {
                let update_op = match op {
                    UnaryOp::Increment => Some(UpdateOp::PreIncrement),
                    UnaryOp::Decrement => Some(UpdateOp::PreDecrement),
                    _ => None,
                };
                (update_op, None, matcher.matches_unary(expr))
            }
            ExprKind::RightUnary { op, .. } => {
                let update_op = match op {
                    UnaryOp::Increment => Some(UpdateOp::PostIncrement),
                    UnaryOp::Decrement => Some(UpdateOp::PostDecrement),
                    _ => None,
                };
                (update_op, None, matcher.matches_unary(expr))
            }
            ExprKind::Binary { op, .. } => {
                let update_op = match op {
                    BinaryOp::AddAssign => Some(UpdateOp::AddAssign),
                    BinaryOp::SubAssign => Some(UpdateOp::SubAssign),
                    _ => None,
                };
                let side = matcher.matches_binary(expr);
                (update_op, side.other(), side.is_match())
            }
            _ => {
                return Err(LoopError::new(
                    LoopErrorKind::InvalidUpdateOperator,
                    operator_message(),
                    for_stmt.update.span,
                ));
            }
        };

        let update_op = match update_op {
            Some(update_op) => update_op,
            None => {
                return Err(LoopError::new(LoopErrorKind::InvalidUpdateOperator, operator_message(), expr.span));
            }
        };
        if !uses_iterator {
            return Err(LoopError::new(
                LoopErrorKind::UpdateMissingIterator,
                operator_message(),
                expr.start_node().span,
            ));
        }

        desc.update_operator = Some(update_op);
        desc.update_value = step;
        desc.direction = Some(update_op.direction());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Program, Stmt};
    use crate::frontend::parse;
    use crate::utils::diagnostics::{DiagnosticBag, NullSink};
    use crate::utils::errors::LoopErrorCategory;

    fn program(header_and_body: &str) -> Program {
        let source = format!("void f(int N, int M, float *a) {{ {} }}", header_and_body);
        parse(&source).unwrap()
    }

    fn first_loop(program: &Program) -> &ForStmt {
        program.functions[0]
            .body
            .statements
            .iter()
            .find_map(Stmt::as_for)
            .unwrap()
    }

    fn validate<'a>(program: &'a Program, bag: &mut DiagnosticBag) -> LoopDescriptor<'a> {
        let config = CheckConfig::default();
        let mut validator = LoopValidator::new(&program.vars, bag, &config);
        validator.validate(first_loop(program), "")
    }

    fn failure_kind(header: &str) -> LoopErrorKind {
        let program = program(header);
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);
        assert!(!desc.is_valid());
        desc.failure().unwrap().kind
    }

    #[test]
    fn test_canonical_loop() {
        let program = program("for (int i = 0; i < N; ++i) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);

        assert!(desc.is_valid());
        assert!(bag.is_empty());
        assert_eq!(desc.iterator().unwrap().name.as_string(), "i");
        assert_eq!(desc.init_value().unwrap().to_string(), "0");
        assert_eq!(desc.check_operator(), Some(BinaryOp::Lt));
        assert!(!desc.check_is_inclusive());
        assert_eq!(desc.check_value().unwrap().to_string(), "N");
        assert!(desc.check_value_on_right());
        assert_eq!(desc.update_operator(), Some(UpdateOp::PreIncrement));
        assert_eq!(desc.update_value(), None);
        assert_eq!(desc.direction(), Some(Direction::Ascending));
        assert!(desc.failure().is_none());
    }

    #[test]
    fn test_descending_inclusive_with_step() {
        let program = program("for (short k = N; k >= 1; k -= 2) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);

        assert!(desc.is_valid());
        assert!(desc.check_is_inclusive());
        assert_eq!(desc.update_operator(), Some(UpdateOp::SubAssign));
        assert_eq!(desc.update_value().unwrap().to_string(), "2");
        assert_eq!(desc.direction(), Some(Direction::Descending));
    }

    #[test]
    fn test_iterator_on_right_of_comparison() {
        let program = program("for (char c = 0; M > c; c++) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);

        assert!(desc.is_valid());
        assert!(!desc.check_value_on_right());
        assert_eq!(desc.check_value().unwrap().to_string(), "M");
        assert_eq!(desc.update_operator(), Some(UpdateOp::PostIncrement));
    }

    #[test]
    fn test_missing_initializer_is_still_valid() {
        let program = program("for (int i; i < N; i++) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);
        assert!(desc.is_valid());
        assert!(desc.init_value().is_none());
    }

    #[test]
    fn test_init_must_be_declaration() {
        assert_eq!(failure_kind("int i; for (i = 0; i < N; ++i) {}"), LoopErrorKind::ExpectedDeclaration);
        assert_eq!(failure_kind("for (; ; ) {}"), LoopErrorKind::ExpectedDeclaration);
    }

    #[test]
    fn test_two_iterators_rejected_at_second_declaration() {
        let program = program("for (int i = 0, j = 0; i < N; ++i) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);

        let failure = desc.failure().unwrap();
        assert_eq!(failure.kind, LoopErrorKind::MultipleIterators);
        assert_eq!(failure.message, "Can only have 1 iterator variable");
        let decls = match &first_loop(&program).init.kind {
            StmtKind::Declaration(decls) => decls,
            _ => unreachable!(),
        };
        assert_eq!(failure.span, decls[1].span);
        assert_eq!(bag.error_count(), 1);
    }

    #[test]
    fn test_iterator_types() {
        assert_eq!(failure_kind("for (long i = 0; i < N; ++i) {}"), LoopErrorKind::InvalidIteratorType);
        assert_eq!(failure_kind("for (float x = 0; x < N; ++x) {}"), LoopErrorKind::InvalidIteratorType);
        assert_eq!(failure_kind("for (int *p = a; p < a; ++p) {}"), LoopErrorKind::InvalidIteratorType);
        assert_eq!(LoopErrorKind::InvalidIteratorType.category(), LoopErrorCategory::Type);
    }

    #[test]
    fn test_not_equal_check_rejected() {
        let program = program("for (int i = 0; i != N; ++i) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);

        let failure = desc.failure().unwrap();
        assert_eq!(failure.kind, LoopErrorKind::InvalidCheckOperator);
        assert_eq!(failure.category(), LoopErrorCategory::Operator);
        // The operator is recorded only once accepted.
        assert_eq!(desc.check_operator(), None);
        assert!(desc.iterator().is_some());
    }

    #[test]
    fn test_check_shapes() {
        assert_eq!(failure_kind("for (int i = 0; ; ++i) {}"), LoopErrorKind::ExpectedCheckExpression);
        assert_eq!(failure_kind("for (int i = 0; N; ++i) {}"), LoopErrorKind::ExpectedComparison);
        assert_eq!(failure_kind("for (int i = 0; M < N; ++i) {}"), LoopErrorKind::CheckMissingIterator);
        assert_eq!(failure_kind("for (int i = 0; (i) < N; ++i) {}"), LoopErrorKind::CheckMissingIterator);
    }

    #[test]
    fn test_update_of_other_variable_rejected_at_operand() {
        let program = program("int j = 0; for (int i = 0; i < N; j++) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);

        let failure = desc.failure().unwrap();
        assert_eq!(failure.kind, LoopErrorKind::UpdateMissingIterator);
        let update = match &first_loop(&program).update.kind {
            StmtKind::Expression(expr) => expr,
            _ => unreachable!(),
        };
        // Points at `j`, not at the whole `j++`.
        assert_eq!(failure.span, update.start_node().span);
        assert_ne!(failure.span, update.span);
    }

    #[test]
    fn test_prefix_update_of_other_variable_rejected_at_operator() {
        let program = program("int j = 0; for (int i = 0; i < N; ++j) {}");
        let mut bag = DiagnosticBag::new();
        let desc = validate(&program, &mut bag);

        let failure = desc.failure().unwrap();
        assert_eq!(failure.kind, LoopErrorKind::UpdateMissingIterator);
        let update = match &first_loop(&program).update.kind {
            StmtKind::Expression(expr) => expr,
            _ => unreachable!(),
        };
        assert_eq!(failure.span, update.span);
    }

    #[test]
    fn test_update_shapes() {
        assert_eq!(failure_kind("for (int i = 0; i < N; ) {}"), LoopErrorKind::ExpectedUpdateExpression);
        assert_eq!(failure_kind("for (int i = 0; i < N; i = i + 1) {}"), LoopErrorKind::InvalidUpdateOperator);
        assert_eq!(failure_kind("for (int i = 0; i < N; i *= 2) {}"), LoopErrorKind::InvalidUpdateOperator);
        assert_eq!(failure_kind("for (int i = 0; i < N; -i) {}"), LoopErrorKind::InvalidUpdateOperator);
        assert_eq!(failure_kind("for (int i = 0; i < N; M += 1) {}"), LoopErrorKind::UpdateMissingIterator);
        assert_eq!(failure_kind("for (int i = 0; i < N; a[i]) {}"), LoopErrorKind::InvalidUpdateOperator);
    }

    #[test]
    fn test_label_prefix() {
        let program = program("for (int i = 0; i != N; ++i) {}");
        let config = CheckConfig::default();
        let mut bag = DiagnosticBag::new();
        let mut validator = LoopValidator::new(&program.vars, &mut bag, &config);
        let desc = validator.validate(first_loop(&program), "addVectors");

        let expected = "[addVectors] Expected to compare [i] with one of these operators [<, <=, >=, >]";
        assert_eq!(desc.failure().unwrap().message, expected);
        assert_eq!(bag.diagnostics()[0].message, expected);
    }

    #[test]
    fn test_diagnostics_do_not_change_result() {
        let program = program("for (int i = 0; i != N; ++i) {}");
        let quiet = CheckConfig::default().with_print_errors(false);
        let loud = CheckConfig::default();

        let mut bag = DiagnosticBag::new();
        let silent = LoopValidator::new(&program.vars, &mut bag, &quiet).validate(first_loop(&program), "");
        assert!(bag.is_empty());

        let mut sink = NullSink;
        let reported = LoopValidator::new(&program.vars, &mut sink, &loud).validate(first_loop(&program), "");
        assert_eq!(silent, reported);
    }

    #[test]
    fn test_validate_twice_is_stable() {
        let program = program("for (int i = 0; i <= N; i += 4) { a[i] = 0; }");
        let before = format!("{:?}", first_loop(&program));
        let config = CheckConfig::default();
        let mut sink = NullSink;
        let mut validator = LoopValidator::new(&program.vars, &mut sink, &config);

        let first = validator.validate(first_loop(&program), "");
        let second = validator.validate(first_loop(&program), "");
        assert_eq!(first, second);
        assert!(validator.is_valid(first_loop(&program), ""));
        assert_eq!(before, format!("{:?}", first_loop(&program)));
    }
}
