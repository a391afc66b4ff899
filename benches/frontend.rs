mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tinyscript::{lexer, parser};

fn bench_frontend(c: &mut Criterion) {
    for (name, path) in common::WORKLOADS {
        let source = common::load_source(path);

        c.bench_function(&format!("frontend_tokenize_{name}"), |b| {
            b.iter(|| {
                let tokens = lexer::tokenize(black_box(&source));
                black_box(tokens);
            })
        });

        c.bench_function(&format!("frontend_parse_{name}"), |b| {
            b.iter(|| {
                let tokens = lexer::tokenize(&source);
                let program = parser::parse_tokens(black_box(tokens)).expect("parse");
                black_box(program);
            })
        });
    }
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
