use rand::{rngs::StdRng, Rng, SeedableRng};

/// Seeded source for single-draw display simulations. Scoring itself never
/// draws from it.
#[derive(Debug, Clone)]
pub struct RngState {
    rng: StdRng,
}

impl RngState {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn roll(&mut self, chance: f64) -> bool {
        if chance >= 1.0 {
            return true;
        }
        if chance <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() < chance
    }
}
