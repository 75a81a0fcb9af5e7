use std::{env, path::PathBuf};

use criterion::{criterion_group, criterion_main, Criterion};
use gramfit::{
    first_follow::{FirstSets, FollowSets},
    grammar::Grammar,
    ll1, slr, syntax,
};

criterion_main!(benches);
criterion_group!(benches, bench_expressions, bench_small);

fn bench_expressions(c: &mut Criterion) {
    bench_analysis(c, "expr_ll1");
    bench_analysis(c, "expr_slr");
}

fn bench_small(c: &mut Criterion) {
    bench_analysis(c, "list");
    bench_analysis(c, "factoring");
    bench_analysis(c, "pointers");
}

fn bench_analysis(c: &mut Criterion, grammar_name: &str) {
    let project_root = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .expect("missing environment variable: `CARGO_MANIFEST_DIR'");
    let grammar: Grammar = syntax::load_file(
        project_root.join(format!("tests/{}.grammar", grammar_name)),
        None,
    )
    .unwrap();

    let mut group = c.benchmark_group(grammar_name);
    group.bench_function("FirstFollow", |b| {
        b.iter(|| {
            let first = FirstSets::compute(&grammar);
            FollowSets::compute(&grammar, &first, grammar.start_symbol)
        });
    });

    let first = FirstSets::compute(&grammar);
    let follow = FollowSets::compute(&grammar, &first, grammar.start_symbol);
    group.bench_function("LL1", |b| {
        b.iter(|| {
            ll1::classify(&grammar, &first, &follow);
            ll1::build_table(&grammar, &first, &follow)
        });
    });
    group.bench_function("SLR1", |b| {
        b.iter(|| {
            let mut automaton = slr::build_automaton(&grammar);
            automaton.detect_conflicts_and_fill_reduce_actions(&grammar, &follow)
        });
    });
    group.finish();
}
