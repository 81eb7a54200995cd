//! Integration tests for the loop checking pipeline.

use devloop::prelude::*;
use devloop::{check_program, check_source, parse};
use devloop::utils::location::{SourceMap, Span};
use devloop::utils::pretty::SourcePrinter;

const ADD_VECTORS: &str = r#"
@kernel void addVectors(const_entries, float *a, float *b, float *ab) {}
"#;

const TILED: &str = r#"
@kernel void addVectors(int entries, float *a, float *b, float *ab) {
    for (int group = 0; group < entries; group += 16; @outer) {
        for (int id = group; id < group + 16; ++id; @inner) {
            if (id < entries) {
                ab[id] = a[id] + b[id];
            }
        }
    }
}
"#;

const REDUCTION: &str = r#"
@kernel void reduce(int N, float *vec, float *blockSum) {
    for (int b = 0; b < N / 256; ++b; @outer(0)) {
        @shared float s_vec[256];

        for (int t = 0; t < 256; ++t; @inner(0)) {
            s_vec[t] = vec[b * 256 + t];
        }

        for (int alive = 128; alive >= 1; alive -= 1; @inner(0)) {
            s_vec[alive] = s_vec[alive] + s_vec[alive + 1];
        }
    }
}
"#;

#[test]
fn test_parse_rejects_untyped_parameter() {
    assert!(parse(ADD_VECTORS).is_err());
}

#[test]
fn test_tiled_kernel_pipeline() {
    let report = check_source(TILED, &CheckConfig::default()).expect("Failed to check");

    assert!(report.ok);
    assert_eq!(report.loops.len(), 2);

    let outer = &report.loops[0];
    assert_eq!(outer.kernel, "addVectors");
    assert_eq!(outer.attribute, LoopAttribute::Outer);
    assert_eq!(outer.iterator, "group");
    assert_eq!(outer.step.as_deref(), Some("16"));
    assert_eq!(outer.trip_count, "((entries) - (0)) - (16)");
    assert_eq!(outer.value_at_flat_index, "(0) + ((16) * (flat_idx))");

    let inner = &report.loops[1];
    assert_eq!(inner.attribute, LoopAttribute::Inner);
    assert_eq!(inner.depth, 1);
    assert_eq!(inner.init, "group");
    assert_eq!(inner.bound, "group + 16");
    assert_eq!(inner.trip_count, "(group + 16) - (group)");
    assert_eq!(inner.value_at_flat_index, "(group) + (flat_idx)");
}

#[test]
fn test_multiple_inner_loops_with_shared_memory() {
    let report = check_source(REDUCTION, &CheckConfig::default()).expect("Failed to check");

    assert!(report.ok, "{:?}", report.errors);
    let attrs: Vec<_> = report.loops.iter().map(|l| (l.attribute, l.dim)).collect();
    assert_eq!(
        attrs,
        vec![
            (LoopAttribute::Outer, Some(0)),
            (LoopAttribute::Inner, Some(0)),
            (LoopAttribute::Inner, Some(0)),
        ]
    );

    let countdown = &report.loops[2];
    assert_eq!(countdown.direction, Some(Direction::Descending));
    assert!(countdown.inclusive);
    assert_eq!(countdown.trip_count, "(((128) - (1)) - (1)) + (1)");
    assert_eq!(countdown.value_at_flat_index, "(128) - ((1) * (flat_idx))");
}

#[test]
fn test_descriptors_borrow_the_ast() {
    let program = parse(TILED).unwrap();
    let config = CheckConfig::default();
    let mut bag = DiagnosticBag::new();
    let classification = LoopClassifier::new(&program.vars, &mut bag, &config).check_program(&program);

    let outer_stmt = program.functions[0].body.statements[0].as_for().unwrap();
    let outer = &classification.loops[0].descriptor;
    let step = outer.update_value().unwrap();
    match &outer_stmt.update.kind {
        StmtKind::Expression(Expr { kind: ExprKind::Binary { right, .. }, .. }) => {
            assert!(std::ptr::eq(step, &**right));
        }
        other => panic!("unexpected update {:?}", other),
    }

    let flat = Expr::int_lit(0, Span::dummy());
    assert_eq!(outer.value_at_flat_index(&flat).to_string(), "(0) + ((16) * (0))");
}

#[test]
fn test_batch_reports_every_malformed_loop() {
    let source = r#"
        @kernel void broken(int N, float *a) {
            for (int i = 0, j = 0; i < N; ++i; @outer) {
                for (float x = 0; x < N; ++x; @inner) {}
            }
            for (int k = 0; k != N; ++k; @outer) {
                for (int l = 0; l < N; l++; @inner) {
                    a[l] = 0;
                }
            }
            for (int m = 0; m < N; ++m; @outer) {
                int q = 0;
                for (int n = 0; n < N; q++; @inner) {}
            }
        }
    "#;

    let fail_fast = check_source(source, &CheckConfig::default()).unwrap();
    assert_eq!(fail_fast.errors.len(), 1);
    assert_eq!(fail_fast.errors[0].kind, LoopErrorKind::MultipleIterators);

    let batch = check_source(source, &CheckConfig::default().with_mode(CheckMode::Batch)).unwrap();
    let kinds: Vec<_> = batch.errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LoopErrorKind::MultipleIterators,
            LoopErrorKind::InvalidIteratorType,
            LoopErrorKind::InvalidCheckOperator,
            LoopErrorKind::UpdateMissingIterator,
        ]
    );
    assert_eq!(batch.diagnostics.len(), 4);
    // `l` and `m` survive.
    let iterators: Vec<_> = batch.loops.iter().map(|l| l.iterator.as_str()).collect();
    assert_eq!(iterators, vec!["l", "m"]);
}

#[test]
fn test_rendered_diagnostic_points_at_second_declaration() {
    let source = "@kernel void k(int N) {\n  for (int i = 0, j = 0; i < N; ++i; @outer) {\n    for (int t = 0; t < 4; ++t; @inner) {}\n  }\n}\n";
    let report = check_source(source, &CheckConfig::default().with_source_label("okl")).unwrap();

    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.message, "[okl] Can only have 1 iterator variable");
    let rendered = diagnostic.render(&SourceMap::new(source));
    assert!(rendered.starts_with("error: [okl] Can only have 1 iterator variable\n  --> 2:19"));
    assert!(rendered.contains("2 |   for (int i = 0, j = 0; i < N; ++i; @outer) {"));
}

#[test]
fn test_silent_mode_reports_nothing() {
    let source = "@kernel void k(int N) { for (int i = 0; i < N; i *= 2; @outer) { for (int j = 0; j < 4; ++j; @inner) {} } }";
    let report = check_source(source, &CheckConfig::default().with_print_errors(false)).unwrap();
    assert!(!report.ok);
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.errors[0].kind, LoopErrorKind::InvalidUpdateOperator);
}

#[test]
fn test_json_report() {
    let report = check_source(TILED, &CheckConfig::default().with_flat_index_name("tid")).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["ok"], true);
    assert_eq!(json["loops"][0]["attribute"], "Outer");
    assert_eq!(json["loops"][1]["value_at_flat_index"], "(group) + (tid)");
    assert_eq!(json["loops"][0]["update"], "AddAssign");
    assert!(json["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_printed_source_checks_the_same() {
    let mut program = parse(REDUCTION).unwrap();
    let printed = SourcePrinter::new(&program.vars).print_program(&program);
    let reprinted_report = check_source(&printed, &CheckConfig::default()).unwrap();
    let report = check_program(&mut program, &CheckConfig::default());

    let trips = |r: &devloop::CheckReport| r.loops.iter().map(|l| l.trip_count.clone()).collect::<Vec<_>>();
    assert_eq!(trips(&report), trips(&reprinted_report));
}

#[test]
fn test_long_iterator_rejected() {
    let source = "@kernel void k(long N) { for (long i = 0; i < N; ++i; @outer) { for (int j = 0; j < 4; ++j; @inner) {} } }";
    let report = check_source(source, &CheckConfig::default()).unwrap();
    assert_eq!(report.errors[0].kind, LoopErrorKind::InvalidIteratorType);
    assert_eq!(report.errors[0].category(), LoopErrorCategory::Type);
}
