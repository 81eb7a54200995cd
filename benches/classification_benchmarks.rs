//! Benchmarks for parsing and loop classification.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use devloop::analysis::LoopClassifier;
use devloop::utils::diagnostics::NullSink;
use devloop::CheckConfig;

const KERNELS: &str = r#"
@kernel void addVectors(int entries, float *a, float *b, float *ab) {
    for (int group = 0; group < entries; group += 16; @outer) {
        for (int id = group; id < group + 16; ++id; @inner) {
            if (id < entries) {
                ab[id] = a[id] + b[id];
            }
        }
    }
}

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

/// Benchmark parsing speed.
fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_kernels", |b| {
        b.iter(|| {
            let lexer = devloop::frontend::Lexer::new(black_box(KERNELS));
            let parser = devloop::frontend::Parser::new(lexer).unwrap();
            parser.parse_program().unwrap()
        })
    });
}

/// Benchmark classification of an already parsed program.
fn bench_classification(c: &mut Criterion) {
    let program = devloop::parse(KERNELS).unwrap();
    let config = CheckConfig::default();

    c.bench_function("classify_kernels", |b| {
        b.iter(|| {
            let mut sink = NullSink;
            let result = LoopClassifier::new(&program.vars, &mut sink, &config).check_program(black_box(&program));
            result.loops.len()
        })
    });
}

/// Benchmark synthesis for every accepted loop.
fn bench_synthesis(c: &mut Criterion) {
    c.bench_function("check_source", |b| {
        b.iter(|| devloop::check_source(black_box(KERNELS), &CheckConfig::default()).unwrap())
    });
}

criterion_group!(benches, bench_parsing, bench_classification, bench_synthesis);
criterion_main!(benches);
