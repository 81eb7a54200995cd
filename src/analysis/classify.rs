//! Kernel loop classification.
//!
//! Walks every `@kernel` function, checks how `@outer`/`@inner` loops are
//! nested, validates each attributed loop's shape and collects the
//! descriptors of the well-formed ones in source order.

use crate::analysis::loop_shape::{labeled, Direction, LoopDescriptor, LoopValidator, UpdateOp};
use crate::frontend::ast::*;
use crate::frontend::semantic::VarTable;
use crate::utils::diagnostics::{Diagnostic, DiagnosticSink};
use crate::utils::errors::{LoopError, LoopErrorKind};
use crate::utils::intern::{attrs, Symbol};
use crate::utils::location::Span;
use crate::{CheckConfig, CheckMode};
use log::{debug, trace};
use serde::Serialize;
use std::fmt;

/// The parallel level a loop is mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoopAttribute {
    Outer,
    Inner,
}

impl LoopAttribute {
    pub fn from_symbol(name: Symbol) -> Option<Self> {
        if name == *attrs::OUTER {
            Some(LoopAttribute::Outer)
        } else if name == *attrs::INNER {
            Some(LoopAttribute::Inner)
        } else {
            None
        }
    }
}

impl fmt::Display for LoopAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopAttribute::Outer => write!(f, "@outer"),
            LoopAttribute::Inner => write!(f, "@inner"),
        }
    }
}

/// A well-formed attributed loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLoop<'a> {
    pub kernel: Symbol,
    pub attribute: LoopAttribute,
    /// Explicit dimension, as in `@outer(1)`
    pub dim: Option<i64>,
    /// Number of enclosing attributed loops
    pub depth: usize,
    pub span: Span,
    pub descriptor: LoopDescriptor<'a>,
}

impl<'a> ClassifiedLoop<'a> {
    /// Owned, printable facts about this loop.
    pub fn summary(&self, flat_index: &Expr) -> LoopSummary {
        let desc = &self.descriptor;
        LoopSummary {
            kernel: self.kernel.as_string(),
            attribute: self.attribute,
            dim: self.dim,
            depth: self.depth,
            line: self.span.start_line,
            iterator: desc.iterator().map(|v| v.name.as_string()).unwrap_or_default(),
            init: desc.init_value().map(|e| e.to_string()).unwrap_or_default(),
            bound: desc.check_value().map(|e| e.to_string()).unwrap_or_default(),
            inclusive: desc.check_is_inclusive(),
            update: desc.update_operator(),
            step: desc.update_value().map(|e| e.to_string()),
            direction: desc.direction(),
            trip_count: desc.trip_count().to_string(),
            value_at_flat_index: desc.value_at_flat_index(flat_index).to_string(),
        }
    }
}

/// Serializable summary of a [`ClassifiedLoop`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoopSummary {
    pub kernel: String,
    pub attribute: LoopAttribute,
    pub dim: Option<i64>,
    pub depth: usize,
    pub line: usize,
    pub iterator: String,
    pub init: String,
    pub bound: String,
    pub inclusive: bool,
    pub update: Option<UpdateOp>,
    pub step: Option<String>,
    pub direction: Option<Direction>,
    pub trip_count: String,
    pub value_at_flat_index: String,
}

/// Outcome of checking one or more kernels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification<'a> {
    pub ok: bool,
    pub loops: Vec<ClassifiedLoop<'a>>,
    pub errors: Vec<LoopError>,
}

impl<'a> Classification<'a> {
    fn merge(&mut self, other: Classification<'a>) {
        self.loops.extend(other.loops);
        self.errors.extend(other.errors);
        self.ok = self.errors.is_empty();
    }

    pub fn loops_in<'k>(&'k self, kernel: &'k str) -> impl Iterator<Item = &'k ClassifiedLoop<'a>> + 'k {
        self.loops.iter().filter(move |l| l.kernel.as_string() == kernel)
    }
}

/// The loop attribute carried by `stmt`, if any.
pub fn loop_attribute(stmt: &Stmt) -> Option<(LoopAttribute, &Attribute)> {
    stmt.attributes
        .iter()
        .find_map(|attr| LoopAttribute::from_symbol(attr.name).map(|kind| (kind, attr)))
}

/// True for a `for` statement carrying `@outer` or `@inner`.
pub fn is_attributed_loop(stmt: &Stmt) -> bool {
    stmt.as_for().is_some() && loop_attribute(stmt).is_some()
}

/// All statements in `stmt` (inclusive) matching `pred`, in pre-order.
pub fn find_statements<'a>(stmt: &'a Stmt, pred: &dyn Fn(&Stmt) -> bool) -> Vec<&'a Stmt> {
    let mut found = Vec::new();
    collect_statements(stmt, pred, &mut found);
    found
}

/// [`find_statements`] over every statement of a block.
pub fn find_statements_in_block<'a>(block: &'a Block, pred: &dyn Fn(&Stmt) -> bool) -> Vec<&'a Stmt> {
    let mut found = Vec::new();
    for stmt in &block.statements {
        collect_statements(stmt, pred, &mut found);
    }
    found
}

fn collect_statements<'a>(stmt: &'a Stmt, pred: &dyn Fn(&Stmt) -> bool, found: &mut Vec<&'a Stmt>) {
    if pred(stmt) {
        found.push(stmt);
    }
    for child in stmt.children() {
        collect_statements(child, pred, found);
    }
}

/// A declaration inside `body` that reuses the iterator's name.
///
/// The iterator's own declaration is never reported.
pub fn find_shadowing_declaration<'a>(body: &'a Stmt, iterator: &VarRef) -> Option<&'a VarDecl> {
    find_statements(body, &|s: &Stmt| s.is_declaration())
        .into_iter()
        .filter_map(|s| match &s.kind {
            StmtKind::Declaration(decls) => Some(decls),
            _ => None,
        })
        .flatten()
        .find(|decl| decl.var.name == iterator.name && decl.var != *iterator)
}

/// Statements directly inside `stmt`, looking through plain blocks.
fn direct_statements(stmt: &Stmt) -> Vec<&Stmt> {
    match &stmt.kind {
        StmtKind::Block(block) if stmt.attributes.is_empty() => {
            block.statements.iter().flat_map(direct_statements).collect()
        }
        _ => vec![stmt],
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Nesting {
    in_outer: bool,
    in_inner: bool,
    depth: usize,
}

/// Checks kernels for well-formed `@outer`/`@inner` loop nests.
pub struct LoopClassifier<'v> {
    vars: &'v VarTable,
    sink: &'v mut dyn DiagnosticSink,
    config: &'v CheckConfig,
}

impl<'v> LoopClassifier<'v> {
    pub fn new(vars: &'v VarTable, sink: &'v mut dyn DiagnosticSink, config: &'v CheckConfig) -> Self {
        Self { vars, sink, config }
    }

    /// Check every `@kernel` function of `program`.
    pub fn check_program<'a>(&mut self, program: &'a Program) -> Classification<'a> {
        let mut result = Classification { ok: true, ..Default::default() };
        for kernel in program.kernels() {
            result.merge(self.check_kernel(kernel));
            if !result.ok && self.config.mode == CheckMode::FailFast {
                break;
            }
        }
        debug!("Classified {} loops with {} errors", result.loops.len(), result.errors.len());
        result
    }

    /// Check one kernel.
    pub fn check_kernel<'a>(&mut self, func: &'a Function) -> Classification<'a> {
        debug!("Checking kernel {}", func.name);
        let mut pass = KernelPass {
            kernel: func.name,
            errors: Vec::new(),
            loops: Vec::new(),
        };

        self.check_attribute_placement(func, &mut pass);

        if !self.stopped(&pass) {
            let has_outer = !find_statements_in_block(&func.body, &|s: &Stmt| {
                is_attributed_loop(s) && matches!(loop_attribute(s), Some((LoopAttribute::Outer, _)))
            })
            .is_empty();
            if !has_outer {
                self.reject(
                    &mut pass,
                    LoopErrorKind::MissingOuterLoop,
                    format!("Kernel [{}] requires at least one @outer loop", func.name),
                    func.span,
                );
            }
        }

        for stmt in &func.body.statements {
            if self.stopped(&pass) {
                break;
            }
            self.visit(stmt, Nesting::default(), &mut pass);
        }

        Classification { ok: pass.errors.is_empty(), loops: pass.loops, errors: pass.errors }
    }

    fn check_attribute_placement(&mut self, func: &Function, pass: &mut KernelPass<'_>) {
        let misplaced = find_statements_in_block(&func.body, &|s: &Stmt| s.as_for().is_none() && loop_attribute(s).is_some());
        for stmt in misplaced {
            if self.stopped(pass) {
                return;
            }
            if let Some((attribute, attr)) = loop_attribute(stmt) {
                self.reject(
                    pass,
                    LoopErrorKind::AttributeOnNonLoop,
                    format!("{} can only be applied to for-loops", attribute),
                    attr.span,
                );
            }
        }
    }

    fn visit<'a>(&mut self, stmt: &'a Stmt, nesting: Nesting, pass: &mut KernelPass<'a>) {
        if self.stopped(pass) {
            return;
        }
        match (stmt.as_for(), loop_attribute(stmt)) {
            (Some(for_stmt), Some((attribute, attr))) => {
                self.visit_attributed_loop(stmt, for_stmt, attribute, attr, nesting, pass);
            }
            _ => {
                for child in stmt.children() {
                    self.visit(child, nesting, pass);
                }
            }
        }
    }

    fn visit_attributed_loop<'a>(
        &mut self,
        stmt: &'a Stmt,
        for_stmt: &'a ForStmt,
        attribute: LoopAttribute,
        attr: &Attribute,
        nesting: Nesting,
        pass: &mut KernelPass<'a>,
    ) {
        trace!("Visiting {} loop at {}", attribute, stmt.span);
        let errors_before = pass.errors.len();

        match attribute {
            LoopAttribute::Outer if nesting.in_inner => self.reject(
                pass,
                LoopErrorKind::OuterInsideInner,
                "@outer loops cannot be nested inside @inner loops".to_string(),
                attr.span,
            ),
            LoopAttribute::Inner if !nesting.in_outer => self.reject(
                pass,
                LoopErrorKind::InnerOutsideOuter,
                "@inner loops must be nested inside an @outer loop".to_string(),
                attr.span,
            ),
            LoopAttribute::Outer if !nesting.in_outer => {
                let has_inner = !find_statements(&for_stmt.body, &|s: &Stmt| {
                    is_attributed_loop(s) && matches!(loop_attribute(s), Some((LoopAttribute::Inner, _)))
                })
                .is_empty();
                if !has_inner {
                    self.reject(
                        pass,
                        LoopErrorKind::MissingInnerLoop,
                        "@outer loop nest requires at least one @inner loop".to_string(),
                        attr.span,
                    );
                }
            }
            _ => {}
        }
        if self.stopped(pass) {
            return;
        }

        let descriptor = {
            let label = self.config.source_label.as_str();
            let mut validator = LoopValidator::new(self.vars, &mut *self.sink, self.config);
            validator.validate(for_stmt, label)
        };
        match (descriptor.failure(), descriptor.iterator()) {
            (Some(failure), _) => pass.errors.push(failure.clone()),
            (None, Some(iterator)) => {
                if descriptor.init_value().is_none() {
                    self.reject(
                        pass,
                        LoopErrorKind::MissingInitializer,
                        format!("Iterator [{}] needs an initial value", iterator.name),
                        descriptor.iterator_span(),
                    );
                }
                if !self.stopped(pass) {
                    if let Some(decl) = find_shadowing_declaration(&for_stmt.body, &iterator) {
                        let note = format!("[{}] is declared at {}", iterator.name, descriptor.iterator_span().start());
                        self.reject_with_note(
                            pass,
                            LoopErrorKind::ShadowedIterator,
                            format!("Iterator [{}] cannot be redeclared inside its loop", iterator.name),
                            decl.span,
                            Some(note),
                        );
                    }
                }
            }
            (None, None) => {}
        }
        if self.stopped(pass) {
            return;
        }

        self.check_between_loops(for_stmt, attribute, pass);
        if self.stopped(pass) {
            return;
        }

        if pass.errors.len() == errors_before {
            let dim = attr.args.first().and_then(|arg| match arg.kind {
                ExprKind::Primitive(Primitive::Int(value)) => Some(value),
                _ => None,
            });
            pass.loops.push(ClassifiedLoop {
                kernel: pass.kernel,
                attribute,
                dim,
                depth: nesting.depth,
                span: stmt.span,
                descriptor,
            });
        }

        let inner = Nesting {
            in_outer: nesting.in_outer || attribute == LoopAttribute::Outer,
            in_inner: nesting.in_inner || attribute == LoopAttribute::Inner,
            depth: nesting.depth + 1,
        };
        self.visit(&for_stmt.body, inner, pass);
    }

    /// Between a loop and a directly nested loop of the same attribute,
    /// only declarations and attributed loops may appear.
    fn check_between_loops(&mut self, for_stmt: &ForStmt, attribute: LoopAttribute, pass: &mut KernelPass<'_>) {
        let direct = direct_statements(&for_stmt.body);
        let same_nested = direct
            .iter()
            .any(|s| is_attributed_loop(s) && matches!(loop_attribute(s), Some((a, _)) if a == attribute));
        if !same_nested {
            return;
        }

        for stmt in direct {
            if self.stopped(pass) {
                return;
            }
            if stmt.is_declaration() || is_attributed_loop(stmt) || matches!(stmt.kind, StmtKind::Empty) {
                continue;
            }
            self.reject(
                pass,
                LoopErrorKind::InvalidStatementBetweenLoops,
                format!("Only declarations and loops may appear between nested {} loops", attribute),
                stmt.span,
            );
        }
    }

    fn reject(&mut self, pass: &mut KernelPass<'_>, kind: LoopErrorKind, message: String, span: Span) {
        self.reject_with_note(pass, kind, message, span, None);
    }

    fn reject_with_note(
        &mut self,
        pass: &mut KernelPass<'_>,
        kind: LoopErrorKind,
        message: String,
        span: Span,
        note: Option<String>,
    ) {
        let error = LoopError::new(kind, labeled(&self.config.source_label, &message), span);
        debug!("Kernel {}: {}", pass.kernel, error);
        if self.config.print_errors {
            let mut diagnostic = Diagnostic::error(span, error.message.clone());
            if let Some(note) = note {
                diagnostic = diagnostic.with_note(note);
            }
            self.sink.report(diagnostic);
        }
        pass.errors.push(error);
    }

    fn stopped(&self, pass: &KernelPass<'_>) -> bool {
        self.config.mode == CheckMode::FailFast && !pass.errors.is_empty()
    }
}

struct KernelPass<'a> {
    kernel: Symbol,
    errors: Vec<LoopError>,
    loops: Vec<ClassifiedLoop<'a>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::matcher::IteratorMatcher;
    use crate::frontend::parse;
    use crate::utils::diagnostics::DiagnosticBag;
    use crate::utils::errors::LoopErrorCategory;

    const ADD_VECTORS: &str = r#"
        @kernel void addVectors(int N, float *a, float *b, float *ab) {
            for (int i = 0; i < N; i += 16; @outer) {
                for (int j = i; j < i + 16; ++j; @inner) {
                    if (j < N) {
                        ab[j] = a[j] + b[j];
                    }
                }
            }
        }
    "#;

    fn classify(source: &str, config: &CheckConfig) -> (Vec<LoopErrorKind>, usize, DiagnosticBag) {
        let program = parse(source).unwrap();
        let mut bag = DiagnosticBag::new();
        let result = LoopClassifier::new(&program.vars, &mut bag, config).check_program(&program);
        assert_eq!(result.ok, result.errors.is_empty());
        let kinds = result.errors.iter().map(|e| e.kind).collect();
        (kinds, result.loops.len(), bag)
    }

    fn kernel(body: &str) -> String {
        format!("@kernel void k(int N, int M, float *a) {{ {} }}", body)
    }

    fn first_error(body: &str) -> LoopErrorKind {
        let (kinds, _, _) = classify(&kernel(body), &CheckConfig::default());
        assert_eq!(kinds.len(), 1, "expected one error, got {:?}", kinds);
        kinds[0]
    }

    #[test]
    fn test_well_formed_kernel() {
        let program = parse(ADD_VECTORS).unwrap();
        let config = CheckConfig::default();
        let mut bag = DiagnosticBag::new();
        let result = LoopClassifier::new(&program.vars, &mut bag, &config).check_program(&program);

        assert!(result.ok);
        assert!(bag.is_empty());
        assert_eq!(result.loops.len(), 2);

        let outer = &result.loops[0];
        assert_eq!(outer.attribute, LoopAttribute::Outer);
        assert_eq!(outer.depth, 0);
        assert_eq!(outer.kernel.as_string(), "addVectors");
        assert_eq!(outer.descriptor.update_value().unwrap().to_string(), "16");

        let inner = &result.loops[1];
        assert_eq!(inner.attribute, LoopAttribute::Inner);
        assert_eq!(inner.depth, 1);
        assert_eq!(inner.descriptor.check_value().unwrap().to_string(), "i + 16");
        assert_eq!(result.loops_in("addVectors").count(), 2);
    }

    #[test]
    fn test_attribute_dimensions() {
        let source = kernel(
            "@outer(1) for (int y = 0; y < M; ++y) { @outer(0) for (int x = 0; x < N; ++x) { \
             for (int t = 0; t < 16; ++t; @inner) {} } }",
        );
        let program = parse(&source).unwrap();
        let config = CheckConfig::default();
        let mut bag = DiagnosticBag::new();
        let result = LoopClassifier::new(&program.vars, &mut bag, &config).check_program(&program);

        assert!(result.ok, "{:?}", result.errors);
        let dims: Vec<_> = result.loops.iter().map(|l| l.dim).collect();
        assert_eq!(dims, vec![Some(1), Some(0), None]);
    }

    #[test]
    fn test_non_kernel_functions_are_ignored() {
        let (kinds, loops, _) = classify("void helper() { for (int i = 0; i != 3; ++i) {} }", &CheckConfig::default());
        assert!(kinds.is_empty());
        assert_eq!(loops, 0);
    }

    #[test]
    fn test_missing_outer_loop() {
        assert_eq!(first_error("for (int i = 0; i < N; ++i) {}"), LoopErrorKind::MissingOuterLoop);
    }

    #[test]
    fn test_missing_inner_loop() {
        assert_eq!(first_error("for (int i = 0; i < N; ++i; @outer) {}"), LoopErrorKind::MissingInnerLoop);
    }

    #[test]
    fn test_inner_outside_outer() {
        let body = "for (int i = 0; i < N; ++i; @outer) { for (int j = 0; j < N; ++j; @inner) {} } \
                    for (int k = 0; k < N; ++k; @inner) {}";
        assert_eq!(first_error(body), LoopErrorKind::InnerOutsideOuter);
    }

    #[test]
    fn test_outer_inside_inner() {
        let body = "for (int i = 0; i < N; ++i; @outer) { for (int j = 0; j < N; ++j; @inner) { \
                    for (int k = 0; k < N; ++k; @outer) {} } }";
        assert_eq!(first_error(body), LoopErrorKind::OuterInsideInner);
    }

    #[test]
    fn test_attribute_on_non_loop() {
        let body = "@outer int x = 0; for (int i = 0; i < N; ++i; @outer) { for (int j = 0; j < N; ++j; @inner) {} }";
        assert_eq!(first_error(body), LoopErrorKind::AttributeOnNonLoop);
    }

    #[test]
    fn test_shared_declarations_are_allowed() {
        let body = "for (int i = 0; i < N; ++i; @outer) { @shared float s[16]; \
                    for (int j = 0; j < 16; ++j; @inner) { s[j] = a[i]; } }";
        let (kinds, loops, _) = classify(&kernel(body), &CheckConfig::default());
        assert!(kinds.is_empty(), "{:?}", kinds);
        assert_eq!(loops, 2);
    }

    #[test]
    fn test_statement_between_same_attribute_loops() {
        let body = "for (int i = 0; i < N; ++i; @outer) { int offset = i * 16; a[i] = 0; \
                    for (int j = 0; j < N; ++j; @outer) { for (int k = 0; k < 16; ++k; @inner) {} } }";
        assert_eq!(first_error(body), LoopErrorKind::InvalidStatementBetweenLoops);
    }

    #[test]
    fn test_statements_allowed_around_different_attribute() {
        let body = "for (int i = 0; i < N; ++i; @outer) { int offset = i * 16; a[i] = 0; \
                    for (int j = 0; j < 16; ++j; @inner) { a[offset + j] = 1; } }";
        let (kinds, _, _) = classify(&kernel(body), &CheckConfig::default());
        assert!(kinds.is_empty(), "{:?}", kinds);
    }

    #[test]
    fn test_malformed_loop_is_reported_and_omitted() {
        let body = "for (int i = 0; i != N; ++i; @outer) { for (int j = 0; j < N; ++j; @inner) {} }";
        let source = kernel(body);
        let program = parse(&source).unwrap();
        let config = CheckConfig::default().with_mode(CheckMode::Batch);
        let mut bag = DiagnosticBag::new();
        let result = LoopClassifier::new(&program.vars, &mut bag, &config).check_program(&program);

        assert!(!result.ok);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].category(), LoopErrorCategory::Operator);
        // Only the inner loop survives.
        assert_eq!(result.loops.len(), 1);
        assert_eq!(result.loops[0].attribute, LoopAttribute::Inner);
        assert_eq!(bag.error_count(), 1);
    }

    #[test]
    fn test_missing_initializer() {
        let body = "for (int i; i < N; ++i; @outer) { for (int j = 0; j < N; ++j; @inner) {} }";
        assert_eq!(first_error(body), LoopErrorKind::MissingInitializer);
    }

    #[test]
    fn test_shadowed_iterator() {
        let body = "for (int i = 0; i < N; ++i; @outer) { for (int j = 0; j < N; ++j; @inner) { int i = j; } }";
        assert_eq!(first_error(body), LoopErrorKind::ShadowedIterator);

        let nested = "for (int i = 0; i < N; ++i; @outer) { for (int i = 0; i < N; ++i; @inner) {} }";
        assert_eq!(first_error(nested), LoopErrorKind::ShadowedIterator);
    }

    #[test]
    fn test_shadowed_iterator_notes_original_declaration() {
        let source = "@kernel void k(int N) {\n  for (int i = 0; i < N; ++i; @outer) {\n    for (int j = 0; j < N; ++j; @inner) { int i = j; }\n  }\n}";
        let (kinds, _, bag) = classify(source, &CheckConfig::default());
        assert_eq!(kinds, vec![LoopErrorKind::ShadowedIterator]);

        let diagnostic = &bag.diagnostics()[0];
        assert_eq!(diagnostic.span.start_line, 3);
        assert_eq!(diagnostic.notes, vec!["[i] is declared at 2:12".to_string()]);
    }

    #[test]
    fn test_fail_fast_vs_batch() {
        let body = "for (int i = 0; i != N; ++i; @outer) { for (long j = 0; j < N; ++j; @inner) {} } \
                    for (int k = 0; k < N; k *= 2; @outer) { for (int l = 0; l < N; ++l; @inner) {} }";
        let source = kernel(body);

        let (fail_fast, _, bag) = classify(&source, &CheckConfig::default());
        assert_eq!(fail_fast, vec![LoopErrorKind::InvalidCheckOperator]);
        assert_eq!(bag.error_count(), 1);

        let (batch, loops, bag) = classify(&source, &CheckConfig::default().with_mode(CheckMode::Batch));
        assert_eq!(
            batch,
            vec![
                LoopErrorKind::InvalidCheckOperator,
                LoopErrorKind::InvalidIteratorType,
                LoopErrorKind::InvalidUpdateOperator,
            ]
        );
        assert_eq!(loops, 1);
        assert_eq!(bag.error_count(), 3);
    }

    #[test]
    fn test_batch_across_kernels() {
        let source = format!(
            "{}\n{}",
            "@kernel void a(int N) { for (int i = 0; i < N; ++i) {} }",
            "@kernel void b(int N) { for (int i = 0; i < N; ++i; @inner) {} }",
        );
        let (fail_fast, _, _) = classify(&source, &CheckConfig::default());
        assert_eq!(fail_fast, vec![LoopErrorKind::MissingOuterLoop]);

        let (batch, _, _) = classify(&source, &CheckConfig::default().with_mode(CheckMode::Batch));
        assert_eq!(
            batch,
            vec![
                LoopErrorKind::MissingOuterLoop,
                LoopErrorKind::MissingOuterLoop,
                LoopErrorKind::InnerOutsideOuter,
            ]
        );
    }

    #[test]
    fn test_silent_classification() {
        let config = CheckConfig::default().with_print_errors(false).with_mode(CheckMode::Batch);
        let (kinds, _, bag) = classify(&kernel("for (int i = 0; i < N; ++i) {}"), &config);
        assert_eq!(kinds, vec![LoopErrorKind::MissingOuterLoop]);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_label_prefix_on_driver_errors() {
        let config = CheckConfig::default().with_source_label("okl");
        let program = parse(&kernel("")).unwrap();
        let mut bag = DiagnosticBag::new();
        let result = LoopClassifier::new(&program.vars, &mut bag, &config).check_program(&program);
        assert_eq!(result.errors[0].message, "[okl] Kernel [k] requires at least one @outer loop");
    }

    #[test]
    fn test_find_statements_and_shadowing() {
        let program = parse(&kernel(
            "for (int i = 0; i < N; ++i; @outer) { int x = 0; { int i = 1; } for (int j = 0; j < N; ++j; @inner) {} }",
        ))
        .unwrap();
        let outer = &program.functions[0].body.statements[0];
        assert!(is_attributed_loop(outer));

        let loops = find_statements(outer, &|s: &Stmt| s.as_for().is_some());
        assert_eq!(loops.len(), 2);

        let for_stmt = outer.as_for().unwrap();
        let iterator = match &for_stmt.init.kind {
            StmtKind::Declaration(decls) => decls[0].var,
            _ => unreachable!(),
        };
        let shadow = find_shadowing_declaration(&for_stmt.body, &iterator).unwrap();
        assert_eq!(shadow.var.name, iterator.name);
        assert_ne!(shadow.var, iterator);
        assert!(IteratorMatcher::new(iterator.id).is_iterator(&Expr::var(iterator, Span::dummy())));

        // A loop's own header declaration is not a shadow.
        let inner = loops[1];
        let inner_iterator = match &inner.as_for().unwrap().init.kind {
            StmtKind::Declaration(decls) => decls[0].var,
            _ => unreachable!(),
        };
        assert!(find_shadowing_declaration(inner, &inner_iterator).is_none());
    }
}
