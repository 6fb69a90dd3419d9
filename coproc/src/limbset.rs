use crate::config::CoreConfig;
use crate::error::{CoprocError, Result};
use crate::modulus::limb::Limb;
use crate::modulus::prime::{primitive_2nth_root, NttFriendlyPrimes};
use crate::ntt::{Direction, TwiddleTable};
use tracing::debug;

/// The constant tables installed by INIT: moduli with their Barrett constants
/// and both twiddle tables, indexed by modulus index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LimbSet {
    config: CoreConfig,
    limbs: Vec<Limb>,
    forward: Vec<TwiddleTable>,
    inverse: Vec<TwiddleTable>,
}

impl LimbSet {
    /// Derives the twiddle tables of every limb from its smallest primitive
    /// `2·RING_DIM`-th root. Every modulus must be an NTT-friendly prime.
    pub fn new(config: &CoreConfig, limbs: Vec<Limb>) -> Result<Self> {
        if limbs.is_empty() {
            return Err(CoprocError::NoLimbs);
        }
        let (forward, inverse): (Vec<TwiddleTable>, Vec<TwiddleTable>) = limbs
            .iter()
            .map(|limb| {
                let psi: u64 = primitive_2nth_root(limb, config.ring_dim())?;
                TwiddleTable::pair(config, limb, psi)
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();
        Ok(Self {
            config: *config,
            limbs,
            forward,
            inverse,
        })
    }

    /// Host-supplied tables, one forward and one inverse table per limb.
    pub fn from_tables(
        config: &CoreConfig,
        limbs: Vec<Limb>,
        forward: Vec<TwiddleTable>,
        inverse: Vec<TwiddleTable>,
    ) -> Result<Self> {
        if limbs.is_empty() {
            return Err(CoprocError::NoLimbs);
        }
        for (tables, direction) in [
            (&forward, Direction::Forward),
            (&inverse, Direction::Inverse),
        ] {
            if tables.len() != limbs.len() {
                return Err(CoprocError::LengthMismatch {
                    context: "twiddle tables per limb",
                    expected: limbs.len(),
                    got: tables.len(),
                });
            }
            if tables.iter().any(|t| {
                t.direction() != direction
                    || t.as_slice().len() != config.bu_num() * config.ring_dim()
            }) {
                return Err(CoprocError::ConfigMismatch);
            }
        }
        Ok(Self {
            config: *config,
            limbs,
            forward,
            inverse,
        })
    }

    /// `count` distinct NTT-friendly primes around `2^bits`.
    pub fn generate(config: &CoreConfig, bits: u32, count: usize) -> Result<Self> {
        let mut primes: NttFriendlyPrimes =
            NttFriendlyPrimes::new(bits, config.cyclotomic_order() as u64)?;
        let limbs: Vec<Limb> = primes
            .next_alternating_primes(count)?
            .into_iter()
            .map(Limb::new)
            .collect::<Result<_>>()?;
        debug!(bits, count, ring_dim = config.ring_dim(), "generated limb set");
        Self::new(config, limbs)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.limbs.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.limbs.is_empty()
    }

    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    #[inline(always)]
    pub fn limb(&self, mod_index: usize) -> &Limb {
        &self.limbs[mod_index]
    }

    pub fn moduli(&self) -> Vec<u64> {
        self.limbs.iter().map(Limb::q).collect()
    }

    #[inline(always)]
    pub fn table(&self, mod_index: usize, direction: Direction) -> &TwiddleTable {
        match direction {
            Direction::Forward => &self.forward[mod_index],
            Direction::Inverse => &self.inverse[mod_index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_moduli_are_friendly() {
        let config: CoreConfig = CoreConfig::new(8, 4).unwrap();
        let limbset: LimbSet = LimbSet::generate(&config, 40, 3).unwrap();
        assert_eq!(limbset.len(), 3);
        limbset
            .moduli()
            .iter()
            .for_each(|q| assert_eq!(q % config.cyclotomic_order() as u64, 1));
    }

    #[test]
    fn composite_modulus_rejected() {
        let config: CoreConfig = CoreConfig::new(4, 1).unwrap();
        assert!(LimbSet::new(&config, vec![Limb::new(100).unwrap()]).is_err());
        assert_eq!(LimbSet::new(&config, vec![]), Err(CoprocError::NoLimbs));
    }

    #[test]
    fn host_tables_must_match_direction() {
        let config: CoreConfig = CoreConfig::new(4, 1).unwrap();
        let generated: LimbSet = LimbSet::generate(&config, 30, 1).unwrap();
        let forward: TwiddleTable = generated.table(0, Direction::Forward).clone();
        let inverse: TwiddleTable = generated.table(0, Direction::Inverse).clone();
        assert_eq!(
            LimbSet::from_tables(
                &config,
                generated.limbs().to_vec(),
                vec![forward.clone()],
                vec![inverse.clone()]
            ),
            Ok(generated.clone())
        );
        assert_eq!(
            LimbSet::from_tables(&config, generated.limbs().to_vec(), vec![inverse], vec![forward]),
            Err(CoprocError::ConfigMismatch)
        );
    }
}
