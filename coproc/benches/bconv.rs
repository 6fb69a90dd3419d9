use coproc::bconv::crt::BaseConversion;
use coproc::bconv::{bconv_systolic, BconvShape};
use coproc::modulus::prime::NttFriendlyPrimes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sampling::source::Source;
use std::hint::black_box;

fn systolic(c: &mut Criterion) {
    let mut b: criterion::BenchmarkGroup<'_, criterion::measurement::WallTime> =
        c.benchmark_group("bconv_systolic");

    for (size_q, size_p) in [(4usize, 8usize), (8, 16), (16, 30)] {
        let ring_dim: usize = 1 << 10;
        let shape: BconvShape = BconvShape::new(ring_dim, size_q, size_p).unwrap();
        let mut source: Source = Source::new([2u8; 32]);
        let mut x: Vec<u64> = vec![0u64; ring_dim * size_q];
        let mut w: Vec<u64> = vec![0u64; size_q * size_p];
        source.fill_below(1 << 61, &mut x);
        source.fill_below(1 << 61, &mut w);
        let moduli: Vec<u64> = (0..size_p as u64).map(|j| (1u64 << 61) - 2 * j - 1).collect();
        let mut out: Vec<u64> = vec![0u64; ring_dim * size_p];

        let id: BenchmarkId = BenchmarkId::new(
            "systolic",
            format!("n={}/q={}/p={}", ring_dim, size_q, size_p),
        );
        b.bench_with_input(id, &(), |b: &mut criterion::Bencher<'_>, _| {
            b.iter(|| bconv_systolic(shape, black_box(&x), &w, &moduli, &mut out).unwrap())
        });
    }
}

fn crt(c: &mut Criterion) {
    let ring_dim: usize = 1 << 10;
    let q_basis: Vec<u64> = NttFriendlyPrimes::new(50, 1 << 11)
        .unwrap()
        .next_alternating_primes(6)
        .unwrap();
    let p_basis: Vec<u64> = NttFriendlyPrimes::new(55, 1 << 11)
        .unwrap()
        .next_alternating_primes(7)
        .unwrap();
    let conversion: BaseConversion = BaseConversion::new(&q_basis, &p_basis).unwrap();
    let mut source: Source = Source::new([3u8; 32]);
    let x: Vec<u64> = (0..ring_dim)
        .flat_map(|_| q_basis.iter().map(|q| source.next_below(*q)).collect::<Vec<u64>>())
        .collect();
    let mut out: Vec<u64> = vec![0u64; ring_dim * p_basis.len()];

    c.bench_function("bconv_crt/n=1024/q=6/p=7", |b| {
        b.iter(|| conversion.convert(black_box(&x), &mut out).unwrap())
    });
}

criterion_group!(benches, systolic, crt);
criterion_main!(benches);
