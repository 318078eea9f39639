//! Performance benchmarks for snapshot reads, projections and loading.
//!
//! Measures dotted lookups at several depths, cached deferred reads, the
//! `only` / `except` projections, and a full provider load through `MockEnv`.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use configtree::env::MockEnv;
use configtree::prelude::*;
use std::hint::black_box;

/// A tree with `width` sections, each nested `depth` levels deep.
fn nested_tree(width: usize, depth: usize) -> Table {
    let mut root = Table::new();
    for i in 0..width {
        let mut leaf = Value::from(format!("value-{i}"));
        for level in (0..depth).rev() {
            let mut t = Table::new();
            t.insert(format!("level{level}"), leaf);
            leaf = Value::Table(t);
        }
        root.insert(format!("section{i}"), leaf);
    }
    root
}

fn deep_path(section: usize, depth: usize) -> String {
    let mut path = format!("section{section}");
    for level in 0..depth {
        path.push_str(&format!(".level{level}"));
    }
    path
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    for depth in [1usize, 4, 8] {
        let config = Config::new(nested_tree(64, depth));
        let path = deep_path(32, depth);
        group.bench_with_input(BenchmarkId::new("dotted", depth), &path, |b, path| {
            b.iter(|| black_box(config.get_string(black_box(path.as_str()), "")))
        });
    }

    let config = Config::new(table! { "port" => "8080", "ratio" => "0.5", "on" => "yes" });
    group.bench_function("typed_coercion", |b| {
        b.iter(|| {
            black_box(config.get_int("port", 0));
            black_box(config.get_float("ratio", 0.0));
            black_box(config.get_bool("on", false));
        })
    });
    group.finish();
}

fn bench_deferred(c: &mut Criterion) {
    let config = Config::new(table! {
        "host" => "localhost",
        "url" => Value::deferred(|snapshot| Value::from(format!("http://{}", snapshot.get_string("host", "")))),
    });

    let mut group = c.benchmark_group("deferred");
    group.bench_function("cached", |b| b.iter(|| black_box(config.get("url"))));
    group.bench_function("uncached", |b| {
        b.iter(|| {
            black_box(config.get_with(
                "url",
                Value::Null,
                ResolveFlags::INVOKE_ALL | ResolveFlags::NO_CACHE,
            ))
        })
    });
    group.finish();
}

fn bench_projection(c: &mut Criterion) {
    let config = Config::new(nested_tree(128, 4));
    let paths: Vec<String> = (0..16).map(|i| deep_path(i * 8, 3)).collect();

    let mut group = c.benchmark_group("projection");
    group.bench_function("only", |b| {
        b.iter(|| black_box(config.only(paths.iter())))
    });
    group.bench_function("except", |b| {
        b.iter(|| black_box(config.except(paths.iter())))
    });
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let env = MockEnv::new()
        .with_file(
            "config/base.json",
            r#"{"db": {"host": "localhost", "port": 5432}, "dependencies": {"mailer": {"class": "Smtp"}}}"#,
        )
        .with_file(
            "config/local.json",
            r#"{"db": {"port": 6543}, "dependencies": {"cache": {"class": "Redis"}}}"#,
        )
        .with_file(".env", "DB_PASSWORD=secret\n");

    c.bench_function("load_files_and_env", |b| {
        b.iter(|| {
            let config = Config::builder()
                .environment_loader(DotEnv::new(".env"))
                .provider(Files::dir("config"))
                .build_with_env(&env)
                .unwrap();
            black_box(config)
        })
    });
}

criterion_group!(benches, bench_lookup, bench_deferred, bench_projection, bench_load);
criterion_main!(benches);
