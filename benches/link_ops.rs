//! Benchmarks for link construction, hashing and comparison.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::seq::SliceRandom;
use rand::SeedableRng;

use hyperatom::atom::link::compute_link_hash;
use hyperatom::atom::{Atom, Handle};
use hyperatom::types::builtin::{CONCEPT_NODE, LIST_LINK, SET_LINK};
use hyperatom::types::TypeRegistry;

fn children(types: &TypeRegistry, n: usize) -> Vec<Handle> {
    (0..n)
        .map(|i| Atom::node(types, CONCEPT_NODE, format!("node-{i}")).unwrap())
        .collect()
}

fn bench_canonicalize(c: &mut Criterion) {
    let types = TypeRegistry::new();
    let mut out = children(&types, 64);
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    out.shuffle(&mut rng);

    c.bench_function("set_link_64_construct", |bench| {
        bench.iter(|| black_box(Atom::link(&types, SET_LINK, out.clone()).unwrap()))
    });
}

fn bench_hash(c: &mut Criterion) {
    let types = TypeRegistry::new();
    let out = children(&types, 64);

    c.bench_function("link_hash_64", |bench| {
        bench.iter(|| black_box(compute_link_hash(LIST_LINK, &out)))
    });
}

fn bench_compare(c: &mut Criterion) {
    let types = TypeRegistry::new();
    let out = children(&types, 64);
    let mut rng = rand::rngs::StdRng::seed_from_u64(1);
    let mut shuffled = out.clone();
    shuffled.shuffle(&mut rng);
    let a = Atom::link(&types, SET_LINK, out).unwrap();
    let b = Atom::link(&types, SET_LINK, shuffled).unwrap();

    c.bench_function("set_link_64_equals", |bench| {
        bench.iter(|| black_box(a == b))
    });
    c.bench_function("set_link_64_less_than", |bench| {
        bench.iter(|| black_box(a.less_than(&b)))
    });
}

criterion_group!(benches, bench_canonicalize, bench_hash, bench_compare);
criterion_main!(benches);
