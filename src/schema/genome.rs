//! Genome value type for quadruped morphologies.
//!
//! A genome is the seven-scalar parameter vector describing one creature:
//! torso dimensions, leg dimensions, and the initial spin impulse applied
//! to the torso at the start of a trial.

use serde::{Deserialize, Serialize};

/// Uniform range for the three torso dimensions of a fresh random genome.
pub const BODY_DIM_RANGE: (f64, f64) = (4.0, 8.0);

/// Uniform range for the spin impulse of a fresh random genome.
pub const SPIN_IMPULSE_RANGE: (f64, f64) = (-3.0, 3.0);

/// Leg width/height upper bound, as a multiple of body height.
pub const LEG_SPAN_FACTOR: f64 = 1.25;

/// Number of evolvable scalar fields.
pub const FIELD_COUNT: usize = 7;

/// One creature's morphological parameters.
///
/// All six dimensional fields must be strictly positive for the genome to
/// be realizable; `spin_impulse` may take either sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub body_width: f64,
    pub body_height: f64,
    pub body_depth: f64,
    pub leg_width: f64,
    pub leg_height: f64,
    pub leg_depth: f64,
    pub spin_impulse: f64,
}

impl Genome {
    /// Field values in declaration order.
    pub fn fields(&self) -> [f64; FIELD_COUNT] {
        [
            self.body_width,
            self.body_height,
            self.body_depth,
            self.leg_width,
            self.leg_height,
            self.leg_depth,
            self.spin_impulse,
        ]
    }

    /// Field names in declaration order.
    pub const fn field_names() -> [&'static str; FIELD_COUNT] {
        [
            "body_width",
            "body_height",
            "body_depth",
            "leg_width",
            "leg_height",
            "leg_depth",
            "spin_impulse",
        ]
    }

    /// Rebuild a genome from values in declaration order.
    pub fn from_fields(values: [f64; FIELD_COUNT]) -> Self {
        Self {
            body_width: values[0],
            body_height: values[1],
            body_depth: values[2],
            leg_width: values[3],
            leg_height: values[4],
            leg_depth: values[5],
            spin_impulse: values[6],
        }
    }

    /// Validate that the genome describes a realizable body.
    ///
    /// Every dimensional field must be strictly positive and finite.
    /// The spin impulse is unconstrained.
    pub fn validate(&self) -> Result<(), GenomeError> {
        let names = Self::field_names();
        for (name, value) in names.iter().zip(self.fields()) {
            if *name == "spin_impulse" {
                continue;
            }
            if !(value > 0.0 && value.is_finite()) {
                return Err(GenomeError::NonPositiveDimension { field: name, value });
            }
        }
        Ok(())
    }
}

/// Genome validation errors.
#[derive(Debug, thiserror::Error)]
pub enum GenomeError {
    #[error("dimension `{field}` must be strictly positive, got {value}")]
    NonPositiveDimension { field: &'static str, value: f64 },
}
