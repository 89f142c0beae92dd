use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use incrfmt_core::cache::{now_secs, CacheStore, StalenessEvaluator};
use incrfmt_core::descriptor::SourceDescriptor;
use incrfmt_core::discovery::{DenyList, Discoverer};
use incrfmt_test_helpers::fixtures::ProjectFixture;

fn project(size: usize) -> (ProjectFixture, Vec<SourceDescriptor>) {
    let fixture = ProjectFixture::new();
    let style = fixture.write(".clang-format", "BasedOnStyle: LLVM\n");
    let descriptors = (0..size)
        .map(|i| {
            let path = fixture.write(&format!("src/dir{}/file{}.cc", i % 16, i), "int x;\n");
            SourceDescriptor::new(path, style.clone()).with_dependency(style.clone())
        })
        .collect();
    (fixture, descriptors)
}

fn bench_select_stale(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_stale");

    for size in [100, 1000, 5000].iter() {
        let (fixture, descriptors) = project(*size);
        let evaluator = StalenessEvaluator::with_global_newest(None);

        let warm = CacheStore::empty(fixture.path(".cache/format.json"));
        let now = now_secs();
        for descriptor in &descriptors {
            warm.record(descriptor.path(), now);
        }
        let cold = CacheStore::empty(fixture.path(".cache/format.json"));

        group.bench_with_input(BenchmarkId::new("fresh", size), &descriptors, |b, d| {
            b.iter(|| evaluator.select_stale(black_box(d), &warm).unwrap().len())
        });
        group.bench_with_input(BenchmarkId::new("uncached", size), &descriptors, |b, d| {
            b.iter(|| evaluator.select_stale(black_box(d), &cold).unwrap().len())
        });
    }

    group.finish();
}

fn bench_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("discovery");

    for size in [100, 1000].iter() {
        let (fixture, _) = project(*size);
        let deny = DenyList::new(&["dir3/.*"], &["src/dir7/**"]).unwrap();
        let discoverer = Discoverer::new(
            fixture.root().to_path_buf(),
            &["src".to_string()],
            &["cc".to_string()],
            deny,
        );

        group.bench_with_input(BenchmarkId::from_parameter(size), &discoverer, |b, d| {
            b.iter(|| d.iter().filter_map(Result::ok).count())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_select_stale, bench_discovery);
criterion_main!(benches);
