use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Source of the uniform draw used to sample reports
pub trait RandomSource: Send + Sync {
    /// Returns a value in `[0, 1)`
    fn draw(&self) -> f64;
}

/// Process-wide generator shared by all requests.
///
/// The lock is held only for the duration of a single draw.
pub struct SharedRng {
    rng: Mutex<StdRng>,
}

impl SharedRng {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for SharedRng {
    fn draw(&self) -> f64 {
        // A panic while holding the lock cannot leave the generator in a bad state
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0.0..1.0)
    }
}
