use coproc::bconv::crt::BaseConversion;
use coproc::bconv::{bconv_systolic, BconvReport, BconvShape, MAX_SIZE_Q};
use coproc::modulus::prime::NttFriendlyPrimes;
use coproc::modulus::MODULUS_BOUND;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use sampling::source::Source;

#[test]
fn bconv_u64() {
    sub_test("test_reference_instance", test_reference_instance);
    sub_test("test_accumulator_bound", test_accumulator_bound);
    sub_test("test_crt_congruence", test_crt_congruence);
}

fn sub_test<F: FnOnce()>(name: &str, f: F) {
    println!("Running {}", name);
    f();
}

fn reference(shape: &BconvShape, x: &[u64], w: &[u64], moduli: &[u64]) -> Vec<u64> {
    let (ring_dim, size_q, size_p) = (shape.ring_dim(), shape.size_q(), shape.size_p());
    let mut out: Vec<u64> = vec![0u64; ring_dim * size_p];
    for r in 0..ring_dim {
        for c in 0..size_p {
            let acc: u128 = (0..size_q)
                .map(|k| x[r * size_q + k] as u128 * w[k * size_p + c] as u128)
                .sum();
            out[r * size_p + c] = (acc % moduli[c] as u128) as u64;
        }
    }
    out
}

fn test_reference_instance() {
    let shape: BconvShape = BconvShape::new(16, 4, 8).unwrap();
    let moduli: Vec<u64> = (0..8u64).map(|j| 100 + 2 * j + 1).collect();
    let w: Vec<u64> = (0..4u64)
        .flat_map(|i| (0..8u64).map(move |j| (i * 8 + j) % 50 + 1))
        .collect();
    let mut source: Source = Source::new([6u8; 32]);
    let mut x: Vec<u64> = vec![0u64; 16 * 4];
    source.fill_below(100, &mut x);

    let mut out: Vec<u64> = vec![0u64; 16 * 8];
    let report: BconvReport = bconv_systolic(shape, &x, &w, &moduli, &mut out).unwrap();
    assert_eq!(report.cycles, 8 + 4 + 16);

    let want: Vec<u64> = reference(&shape, &x, &w, &moduli);
    let mismatches: usize = out.iter().zip(want.iter()).filter(|(a, b)| a != b).count();
    assert_eq!(mismatches, 0);
}

fn test_accumulator_bound() {
    let shape: BconvShape = BconvShape::new(32, MAX_SIZE_Q, 3).unwrap();
    let mut source: Source = Source::new([7u8; 32]);
    let mut x: Vec<u64> = vec![0u64; 32 * MAX_SIZE_Q];
    let mut w: Vec<u64> = vec![0u64; MAX_SIZE_Q * 3];
    source.fill_below(MODULUS_BOUND, &mut x);
    w.fill(MODULUS_BOUND - 1);
    x[..MAX_SIZE_Q].fill(MODULUS_BOUND - 1);
    let moduli: [u64; 3] = [u64::MAX, 0x1fffffffffe00001, 3];

    let mut out: Vec<u64> = vec![0u64; 32 * 3];
    bconv_systolic(shape, &x, &w, &moduli, &mut out).unwrap();
    assert_eq!(out, reference(&shape, &x, &w, &moduli));
}

fn test_crt_congruence() {
    let ring_dim: usize = 32;
    let q_basis: Vec<u64> = NttFriendlyPrimes::new(40, 1 << 6)
        .unwrap()
        .next_alternating_primes(4)
        .unwrap();
    let p_basis: Vec<u64> = NttFriendlyPrimes::new(45, 1 << 6)
        .unwrap()
        .next_alternating_primes(3)
        .unwrap();
    let conversion: BaseConversion = BaseConversion::new(&q_basis, &p_basis).unwrap();
    let modulus: &BigUint = conversion.modulus();

    let mut source: Source = Source::new([8u8; 32]);
    let values: Vec<BigUint> = (0..ring_dim)
        .map(|r| match r {
            0 => BigUint::zero(),
            1 => modulus - BigUint::one(),
            _ => BigUint::from_slice(&[
                source.next_u64() as u32,
                source.next_u64() as u32,
                source.next_u64() as u32,
                source.next_u64() as u32,
                source.next_u64() as u32,
            ]) % modulus,
        })
        .collect();

    let residue = |x: &BigUint, m: u64| -> u64 { (x % m).iter_u64_digits().next().unwrap_or(0) };

    let x: Vec<u64> = values
        .iter()
        .flat_map(|v| q_basis.iter().map(move |q| residue(v, *q)))
        .collect();
    let mut out: Vec<u64> = vec![0u64; ring_dim * p_basis.len()];
    conversion.convert(&x, &mut out).unwrap();

    values.iter().zip(out.chunks_exact(p_basis.len())).for_each(|(v, y)| {
        let alpha: Option<u64> = (0..q_basis.len() as u64).find(|alpha| {
            let lifted: BigUint = v + modulus * *alpha;
            p_basis
                .iter()
                .zip(y)
                .all(|(p, yj)| residue(&lifted, *p) == *yj)
        });
        assert!(alpha.is_some(), "x={} y={:?}", v, y);
    });
}
