//! Routing benchmarks.
//!
//! Run with: `cargo bench -p switchyard-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::Method;
use switchyard_router::{Pattern, Trie};

fn add(trie: &mut Trie<String>, pattern: &str, value: String) {
    let pattern = Pattern::parse(pattern).expect("valid pattern");
    trie.insert(Method::GET, &pattern, value)
        .expect("no conflict");
}

fn build_trie(num_routes: usize) -> Trie<String> {
    let mut trie = Trie::new();

    for i in 0..num_routes / 4 {
        add(&mut trie, &format!("/api/v1/resource{i}"), format!("getResource{i}"));
    }

    for i in 0..num_routes / 4 {
        add(&mut trie, &format!("/api/v1/resource{i}/:id"), format!("getResourceById{i}"));
    }

    for i in 0..num_routes / 4 {
        add(
            &mut trie,
            &format!("/api/v1/org/:orgId/resource{i}/:id(\\d+)"),
            format!("getOrgResource{i}"),
        );
    }

    for i in 0..num_routes / 4 {
        add(&mut trie, &format!("/static/bundle{i}/*path"), format!("asset{i}"));
    }

    trie
}

fn bench_static_match(c: &mut Criterion) {
    let trie = build_trie(100);

    c.bench_function("static_match", |b| {
        b.iter(|| black_box(trie.find(&Method::GET, "/api/v1/resource20")));
    });
}

fn bench_param_match(c: &mut Criterion) {
    let trie = build_trie(100);

    c.bench_function("param_match", |b| {
        b.iter(|| black_box(trie.find(&Method::GET, "/api/v1/resource20/12345")));
    });
}

fn bench_constrained_match(c: &mut Criterion) {
    let trie = build_trie(100);

    c.bench_function("constrained_match", |b| {
        b.iter(|| black_box(trie.find(&Method::GET, "/api/v1/org/acme-corp/resource10/12345")));
    });
}

fn bench_wildcard_match(c: &mut Criterion) {
    let trie = build_trie(100);

    c.bench_function("wildcard_match", |b| {
        b.iter(|| black_box(trie.find(&Method::GET, "/static/bundle3/js/app/main.js")));
    });
}

fn bench_miss(c: &mut Criterion) {
    let trie = build_trie(100);

    c.bench_function("miss", |b| {
        b.iter(|| black_box(trie.find(&Method::GET, "/api/v1/nonexistent/path")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");

    for num_routes in [12, 48, 100, 500, 1000] {
        let trie = build_trie(num_routes);

        group.bench_with_input(
            BenchmarkId::new("static_match", num_routes),
            &num_routes,
            |b, &n| {
                let path = format!("/api/v1/resource{}", n / 8);
                b.iter(|| black_box(trie.find(&Method::GET, &path)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("param_match", num_routes),
            &num_routes,
            |b, &n| {
                let path = format!("/api/v1/resource{}/12345", n / 8);
                b.iter(|| black_box(trie.find(&Method::GET, &path)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_static_match,
    bench_param_match,
    bench_constrained_match,
    bench_wildcard_match,
    bench_miss,
    bench_scaling
);
criterion_main!(benches);
