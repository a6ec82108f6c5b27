use criterion::{black_box, criterion_group, criterion_main, Criterion};
use schema_union::{converter, Resolver, SchemaVersion, TaggedMessage, VersionRegistry};

fn v(n: u32) -> SchemaVersion {
    SchemaVersion::new(n).unwrap()
}

fn counter_resolver(versions: u32) -> Resolver<u64> {
    let mut registry = VersionRegistry::with_versions(versions);
    for k in 1..versions {
        registry
            .register_converter(v(k), v(k + 1), converter::pure(|n: u64| n.wrapping_add(1)))
            .unwrap();
    }
    Resolver::new(registry).unwrap()
}

fn bench_resolve_latest(c: &mut Criterion) {
    let resolver = counter_resolver(10);
    c.bench_function("resolve at latest (identity)", |b| {
        b.iter(|| black_box(resolver.resolve(TaggedMessage::new(v(10), black_box(7))).unwrap()))
    });
}

fn bench_resolve_chain(c: &mut Criterion) {
    let resolver = counter_resolver(10);
    c.bench_function("resolve v1 -> v10", |b| {
        b.iter(|| black_box(resolver.resolve(TaggedMessage::new(v(1), black_box(7))).unwrap()))
    });

    // Also benchmark a much longer history
    let long = counter_resolver(1000);
    c.bench_function("resolve v1 -> v1000", |b| {
        b.iter(|| black_box(long.resolve(TaggedMessage::new(v(1), black_box(7))).unwrap()))
    });
}

fn bench_compose(c: &mut Criterion) {
    let resolver = counter_resolver(100);
    let registry = resolver.registry();
    c.bench_function("compose v1 (memoized)", |b| {
        b.iter(|| black_box(registry.compose(black_box(v(1))).unwrap().len()))
    });
}

fn bench_bytes(c: &mut Criterion) {
    let mut registry = VersionRegistry::with_versions(4);
    for k in 1..4 {
        registry
            .register_converter(
                v(k),
                v(k + 1),
                converter::pure(|mut b: Vec<u8>| {
                    b.push(0);
                    b
                }),
            )
            .unwrap();
    }
    let resolver = Resolver::new(registry).unwrap();
    let stored = schema_union::Envelope::new(v(1), vec![1; 256]).to_bytes();

    c.bench_function("resolve_bytes v1 -> v4 (256B)", |b| {
        b.iter(|| black_box(resolver.resolve_bytes(black_box(&stored)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_resolve_latest,
    bench_resolve_chain,
    bench_compose,
    bench_bytes
);
criterion_main!(benches);
