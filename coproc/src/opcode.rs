use crate::error::CoprocError;

/// Kernel selector, with its wire value.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    Init = 0,
    Add = 1,
    Sub = 2,
    Mul = 3,
    Ntt = 4,
    Intt = 5,
    Bconv = 6,
}

impl Opcode {
    pub const ALL: [Opcode; 7] = [
        Opcode::Init,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Ntt,
        Opcode::Intt,
        Opcode::Bconv,
    ];
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = CoprocError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .get(value as usize)
            .copied()
            .ok_or(CoprocError::UnknownOpcode(value))
    }
}
