pub mod bconv;
pub mod config;
pub mod coprocessor;
pub mod dma;
pub mod elementwise;
pub mod error;
pub mod limbset;
pub mod modulus;
pub mod ntt;
pub mod opcode;
pub mod permutation;
pub mod tile;

pub use config::{ActiveLimbs, CoreConfig};
pub use coprocessor::{Coprocessor, Invocation};
pub use error::{CoprocError, Result};
pub use limbset::LimbSet;
pub use opcode::Opcode;
