use coproc::bconv::{BconvReport, BconvShape};
use coproc::config::{ActiveLimbs, CoreConfig};
use coproc::coprocessor::{Coprocessor, Invocation};
use coproc::dma::Dma;
use coproc::error::CoprocError;
use coproc::limbset::LimbSet;
use coproc::opcode::Opcode;
use coproc::tile::TileBank;
use itertools::izip;
use sampling::source::Source;

#[test]
fn coprocessor_u64() {
    let config: CoreConfig = CoreConfig::new(8, 2).unwrap();
    let limbset: LimbSet = LimbSet::generate(&config, 61, 3).unwrap();

    sub_test("test_dma_round_trip", || test_dma_round_trip(&config));
    sub_test("test_elementwise_window", || {
        test_elementwise_window(&config, &limbset)
    });
    sub_test("test_execute_dispatch", || {
        test_execute_dispatch(&config, &limbset)
    });
    sub_test("test_rejected_invocations", || {
        test_rejected_invocations(&config, &limbset)
    });
}

fn sub_test<F: FnOnce()>(name: &str, f: F) {
    println!("Running {}", name);
    f();
}

fn test_dma_round_trip(config: &CoreConfig) {
    let dma: Dma = Dma::new(config);
    let mut source: Source = Source::new([9u8; 32]);
    let mut buf: Vec<u64> = vec![0u64; config.words(2)];
    buf.iter_mut().for_each(|x| *x = source.next_u64());
    let mut bank: TileBank = TileBank::new(config);
    dma.load(&buf, &mut bank, 2).unwrap();
    let mut back: Vec<u64> = vec![0u64; buf.len()];
    dma.store(&bank, &mut back, 2).unwrap();
    assert_eq!(back, buf);
}

fn test_elementwise_window(config: &CoreConfig, limbset: &LimbSet) {
    let mut coproc: Coprocessor = Coprocessor::new(config);
    coproc.init(limbset.clone()).unwrap();
    let n: usize = config.ring_dim();
    let moduli: Vec<u64> = limbset.moduli();
    let window: &[u64] = &moduli[1..3];
    let active: ActiveLimbs = ActiveLimbs::new(2, 1);
    let mut source: Source = Source::new([10u8; 32]);
    let a: Vec<u64> = source.residues(window, n);
    let b: Vec<u64> = source.residues(window, n);
    let mut out: Vec<u64> = vec![0u64; config.words(2)];

    type Reference = fn(u128, u128, u128) -> u128;
    let cases: [(Opcode, Reference); 3] = [
        (Opcode::Add, |x, y, q| (x + y) % q),
        (Opcode::Sub, |x, y, q| (x + q - y) % q),
        (Opcode::Mul, |x, y, q| (x * y) % q),
    ];
    for (opcode, f) in cases {
        let result = match opcode {
            Opcode::Add => coproc.add(&a, &b, &mut out, active),
            Opcode::Sub => coproc.sub(&a, &b, &mut out, active),
            _ => coproc.mul(&a, &b, &mut out, active),
        };
        result.unwrap();
        izip!(a.chunks_exact(n), b.chunks_exact(n), out.chunks_exact(n), window).for_each(
            |(a, b, c, q)| {
                izip!(a, b, c).for_each(|(x, y, z)| {
                    assert_eq!(*z as u128, f(*x as u128, *y as u128, *q as u128), "{:?}", opcode)
                })
            },
        );
    }
}

fn test_execute_dispatch(config: &CoreConfig, limbset: &LimbSet) {
    let mut coproc: Coprocessor = Coprocessor::new(config);
    assert_eq!(coproc.execute(Invocation::Init(limbset.clone())), Ok(None));
    let n: usize = config.ring_dim();
    let moduli: Vec<u64> = limbset.moduli();
    let active: ActiveLimbs = ActiveLimbs::prefix(2);
    let mut source: Source = Source::new([11u8; 32]);
    let a: Vec<u64> = source.residues(&moduli[..2], n);

    let mut data: Vec<u64> = a.clone();
    let invocation: Invocation = Invocation::Ntt {
        data: &mut data,
        active,
    };
    assert_eq!(invocation.opcode(), Opcode::Ntt);
    coproc.execute(invocation).unwrap();
    let mut doubled: Vec<u64> = vec![0u64; a.len()];
    coproc
        .execute(Invocation::Add {
            in1: &data,
            in2: &data,
            out: &mut doubled,
            active,
        })
        .unwrap();
    coproc
        .execute(Invocation::Intt {
            data: &mut doubled,
            active,
        })
        .unwrap();
    let mut zero: Vec<u64> = vec![1u64; a.len()];
    coproc
        .execute(Invocation::Sub {
            in1: &doubled,
            in2: &a,
            out: &mut zero,
            active,
        })
        .unwrap();
    assert_eq!(zero, a);

    let shape: BconvShape = BconvShape::new(4, 2, 2).unwrap();
    let mut out: Vec<u64> = vec![0u64; 8];
    let report: Option<BconvReport> = coproc
        .execute(Invocation::Bconv {
            shape,
            x: &[1, 2, 3, 4, 5, 6, 7, 8],
            w: &[1, 0, 0, 1],
            moduli: &[5, 7],
            out: &mut out,
        })
        .unwrap();
    assert_eq!(report, Some(BconvReport { cycles: 8 }));
    assert_eq!(out, vec![1, 2, 3, 4, 0, 6, 2, 1]);
}

fn test_rejected_invocations(config: &CoreConfig, limbset: &LimbSet) {
    let mut coproc: Coprocessor = Coprocessor::new(config);
    let n: usize = config.ring_dim();
    let mut data: Vec<u64> = vec![3u64; config.words(2)];

    assert_eq!(
        coproc.intt(&mut data, ActiveLimbs::prefix(1)),
        Err(CoprocError::NotInitialized)
    );
    coproc.init(limbset.clone()).unwrap();

    assert_eq!(
        coproc.ntt(&mut data, ActiveLimbs::prefix(3)),
        Err(CoprocError::TooManyLimbs { requested: 3, max: 2 })
    );
    assert_eq!(
        coproc.ntt(&mut data, ActiveLimbs::new(2, 2)),
        Err(CoprocError::ModIndexOutOfRange {
            offset: 2,
            end: 4,
            available: 3
        })
    );
    assert_eq!(
        coproc.ntt(&mut data[..n], ActiveLimbs::prefix(2)),
        Err(CoprocError::BufferTooShort {
            context: "dma load",
            expected: 2 * n,
            got: n
        })
    );
    let mut short: Vec<u64> = vec![9u64; n];
    assert_eq!(
        coproc.add(&data, &data, &mut short, ActiveLimbs::prefix(2)),
        Err(CoprocError::BufferTooShort {
            context: "dma store",
            expected: 2 * n,
            got: n
        })
    );
    assert!(short.iter().all(|x| *x == 9));
    assert!(data.iter().all(|x| *x == 3));
    assert_eq!(Opcode::try_from(9u8), Err(CoprocError::UnknownOpcode(9)));
}
