use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reelgate::streaming::ByteRange;

fn bench_range_parsing(c: &mut Criterion) {
    c.bench_function("parse_bounded_range", |b| {
        b.iter(|| ByteRange::parse(black_box("bytes=1048576-2097151"), black_box(4_000_000_000)))
    });

    c.bench_function("parse_open_range", |b| {
        b.iter(|| ByteRange::parse(black_box("bytes=1048576-"), black_box(4_000_000_000)))
    });

    c.bench_function("parse_invalid_range", |b| {
        b.iter(|| ByteRange::parse(black_box("bytes=abc-def"), black_box(1000)))
    });
}

criterion_group!(benches, bench_range_parsing);
criterion_main!(benches);
