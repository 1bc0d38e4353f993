use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pkgenv_version::{Requirement, Version, VersionRange};

fn bench_version_parse(c: &mut Criterion) {
    c.bench_function("version_parse", |b| {
        b.iter(|| Version::parse(black_box("2021.3.14-beta2")))
    });
}

fn bench_range_parse(c: &mut Criterion) {
    c.bench_function("range_parse", |b| {
        b.iter(|| VersionRange::parse(black_box(">=1.2,<2|3.1+<4|!=5")))
    });
}

fn bench_range_intersect(c: &mut Criterion) {
    let a = VersionRange::parse("1+<3|4..6|8+").unwrap();
    let b = VersionRange::parse("2..5|7+<9").unwrap();
    c.bench_function("range_intersect", |bench| {
        bench.iter(|| black_box(&a).intersect(black_box(&b)))
    });
}

fn bench_requirement_parse(c: &mut Criterion) {
    c.bench_function("requirement_parse", |b| {
        b.iter(|| Requirement::parse(black_box("!python>=3.7,<3.12")))
    });
}

criterion_group!(
    benches,
    bench_version_parse,
    bench_range_parse,
    bench_range_intersect,
    bench_requirement_parse
);
criterion_main!(benches);
