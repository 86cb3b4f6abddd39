//! Benchmarks for Canon ingestion and verification.
//!
//! These benchmarks measure:
//! - Extraction alone (parse, walk, finalize), with no store access
//! - Full ingestion into an on-disk store, first and repeated versions
//! - Rebuild verification of the latest version

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]
#![allow(clippy::format_push_string)]

use std::hint::black_box;
use std::path::Path;

use canon::extract::{self, ExtractOptions};
use canon::{Canon, CanonConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Generate a Python module with classes, methods, imports and module state.
fn generate_python_module(num_classes: usize, methods_per_class: usize) -> String {
    let mut code = String::from("import os\nfrom collections import defaultdict\n\nREGISTRY = {}\n\n");

    for c in 0..num_classes {
        code.push_str(&format!("\nclass Service{c}(object):\n    \"\"\"Service {c}.\"\"\"\n\n"));
        for m in 0..methods_per_class {
            code.push_str(&format!(
                "    def handle_{m}(self, request, retries=3):\n\
                 \x20       key = os.path.join(request.path, \"{m}\")\n\
                 \x20       self.cache[key] = defaultdict(list)\n\
                 \x20       return self.dispatch(key, retries)\n\n"
            ));
        }
    }

    code.push_str("\ndef register(name, factory):\n    global REGISTRY\n    REGISTRY[name] = factory()\n");
    code
}

fn open_store() -> (tempfile::TempDir, Canon) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let config = CanonConfig::for_workspace(dir.path());
    let canon = Canon::open(config).expect("failed to open store");
    (dir, canon)
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    for classes in [1, 10, 50] {
        let source = generate_python_module(classes, 8);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(classes), &source, |b, source| {
            b.iter(|| {
                extract::extract(
                    Path::new("bench.py"),
                    black_box(source),
                    &ExtractOptions::default(),
                )
                .expect("extract failed")
            });
        });
    }
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let source = generate_python_module(10, 8);
    let edited = source.replace("retries=3", "retries=5");

    c.bench_function("ingest/alternating_versions", |b| {
        let (_dir, canon) = open_store();
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let text = if flip { &source } else { &edited };
            canon
                .ingest_source(Path::new("bench.py"), black_box(text))
                .expect("ingest failed")
        });
    });
}

fn bench_verify(c: &mut Criterion) {
    let (_dir, canon) = open_store();
    canon
        .ingest_source(Path::new("bench.py"), &generate_python_module(10, 8))
        .expect("ingest failed");

    c.bench_function("verify/latest", |b| {
        b.iter(|| canon.verify(Path::new("bench.py")).expect("verify failed"));
    });
}

criterion_group!(benches, bench_extract, bench_ingest, bench_verify);
criterion_main!(benches);
