/// Capacity of every link between neighbouring processing elements.
pub const FIFO_DEPTH: usize = 2;

/// Bounded single-producer single-consumer queue kept as a shift register:
/// `slots[0]` is the head.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fifo<T> {
    slots: [T; FIFO_DEPTH],
    len: usize,
}

impl<T: Copy + Default> Default for Fifo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> Fifo<T> {
    pub fn new() -> Self {
        Self {
            slots: [T::default(); FIFO_DEPTH],
            len: 0,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.len == FIFO_DEPTH
    }

    /// Returns false and drops `value` when the queue is full.
    #[inline(always)]
    pub fn push(&mut self, value: T) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.len] = value;
        self.len += 1;
        true
    }

    #[inline(always)]
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let head: T = self.slots[0];
        self.slots.copy_within(1.., 0);
        self.len -= 1;
        Some(head)
    }
}

/// Weight-stationary multiply-accumulate cell. Its outputs are registered:
/// what it emits in cycle `t` is what it latched in cycle `t - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessingElement {
    weight: u64,
    modulus: u64,
    reg_x: u64,
    reg_sum: u128,
}

impl ProcessingElement {
    pub fn new(weight: u64, modulus: u64) -> Self {
        Self {
            weight,
            modulus,
            reg_x: 0,
            reg_sum: 0,
        }
    }

    #[inline(always)]
    pub fn weight(&self) -> u64 {
        self.weight
    }

    #[inline(always)]
    pub fn modulus(&self) -> u64 {
        self.modulus
    }

    /// Registered `(x_out, sum_out)`.
    #[inline(always)]
    pub fn emit(&self) -> (u64, u128) {
        (self.reg_x, self.reg_sum)
    }

    #[inline(always)]
    pub fn latch(&mut self, x_in: u64, sum_in: u128) {
        self.reg_sum = sum_in + x_in as u128 * self.weight as u128;
        self.reg_x = x_in;
    }

    /// One cycle: emits the previous registers, then latches the inputs.
    pub fn step(&mut self, x_in: u64, sum_in: u128) -> (u64, u128) {
        let out: (u64, u128) = self.emit();
        self.latch(x_in, sum_in);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_holds_two() {
        let mut fifo: Fifo<u64> = Fifo::new();
        assert!(fifo.push(1));
        assert!(fifo.push(2));
        assert!(!fifo.push(3));
        assert_eq!(fifo.pop(), Some(1));
        assert!(fifo.push(4));
        assert_eq!(fifo.pop(), Some(2));
        assert_eq!(fifo.pop(), Some(4));
        assert_eq!(fifo.pop(), None);
    }

    #[test]
    fn outputs_lag_one_cycle() {
        let mut pe: ProcessingElement = ProcessingElement::new(3, 101);
        assert_eq!(pe.step(5, 7), (0, 0));
        assert_eq!(pe.step(2, 1), (5, 22));
        assert_eq!(pe.step(0, 0), (2, 7));
        assert_eq!(pe.emit(), (0, 0));
    }

    #[test]
    fn wide_accumulator() {
        let mut pe: ProcessingElement = ProcessingElement::new((1 << 62) - 1, 3);
        let sum: u128 = 15 * ((1u128 << 62) - 1) * ((1u128 << 62) - 1);
        pe.latch((1 << 62) - 1, sum);
        assert_eq!(pe.emit().1, 16 * ((1u128 << 62) - 1) * ((1u128 << 62) - 1));
    }
}
