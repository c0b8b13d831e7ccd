//! Genome generation, crossover, and mutation.
//!
//! All stochastic operators run through one seedable [`GenomeRng`], so a
//! run with a fixed seed reproduces exactly.

use rand::prelude::*;

use crate::schema::{
    BODY_DIM_RANGE, FIELD_COUNT, Genome, LEG_SPAN_FACTOR, SPIN_IMPULSE_RANGE,
};

/// Multiplicative mutation factor bounds.
pub const MUTATION_FACTOR_RANGE: (f64, f64) = (0.9, 1.1);

/// Random number generator wrapper for genome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate a random genome within the schema ranges.
    ///
    /// Leg dimensions are drawn relative to the body height so fresh
    /// bodies start roughly proportioned: width and height span the body
    /// height up to [`LEG_SPAN_FACTOR`] times it, depth between half the
    /// body height and the body height.
    pub fn random_genome(&mut self) -> Genome {
        let body_width = self.uniform(BODY_DIM_RANGE);
        let body_height = self.uniform(BODY_DIM_RANGE);
        let body_depth = self.uniform(BODY_DIM_RANGE);
        Genome {
            body_width,
            body_height,
            body_depth,
            leg_width: self.uniform((body_height, body_height * LEG_SPAN_FACTOR)),
            leg_height: self.uniform((body_height, body_height * LEG_SPAN_FACTOR)),
            leg_depth: self.uniform((body_height / 2.0, body_height)),
            spin_impulse: self.uniform(SPIN_IMPULSE_RANGE),
        }
    }

    /// Discrete recombination: each field of the child is one parent's
    /// value or the other's, chosen independently per field. Never an
    /// arithmetic blend.
    pub fn crossover(&mut self, parent_a: &Genome, parent_b: &Genome) -> Genome {
        let a = parent_a.fields();
        let b = parent_b.fields();
        let mut child = [0.0; FIELD_COUNT];
        for i in 0..FIELD_COUNT {
            child[i] = if self.rng.gen_bool(0.5) { a[i] } else { b[i] };
        }
        Genome::from_fields(child)
    }

    /// Mutate each field independently: with probability `rate` the field
    /// is scaled by a factor drawn uniformly from
    /// [`MUTATION_FACTOR_RANGE`], otherwise it is left unchanged. Rates
    /// outside `[0, 1]` saturate.
    pub fn mutate(&mut self, genome: &Genome, rate: f64) -> Genome {
        let mut fields = genome.fields();
        for value in &mut fields {
            if self.rng.r#gen::<f64>() < rate {
                *value *= self.uniform(MUTATION_FACTOR_RANGE);
            }
        }
        Genome::from_fields(fields)
    }

    fn uniform(&mut self, bounds: (f64, f64)) -> f64 {
        self.rng.gen_range(bounds.0..=bounds.1)
    }
}
