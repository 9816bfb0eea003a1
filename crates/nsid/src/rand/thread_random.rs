use crate::RandSource;
use rand::{Rng, rng};

/// Draws from the calling thread's `rand::rng()`.
///
/// Holds no state of its own, so a single value can be shared freely.
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadRandom;

impl RandSource<u32> for ThreadRandom {
    fn rand(&self) -> u32 {
        rng().random()
    }
}

impl RandSource<u64> for ThreadRandom {
    fn rand(&self) -> u64 {
        rng().random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_vary_between_calls() {
        let draws: std::collections::HashSet<u64> =
            (0..16).map(|_| RandSource::<u64>::rand(&ThreadRandom)).collect();
        assert!(draws.len() > 1);
    }
}
