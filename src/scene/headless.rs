//! Headless stand-in scene for driving the engine without a physics rig.

use std::collections::HashMap;

use crate::schema::Genome;

use super::{PhenotypeHandle, RealizationError, SceneBuilder, SimulationError, Simulator};

/// Deterministic scene used by the CLI and tests.
///
/// Phenotype handles are issued sequentially and "displacement" is a
/// closed-form function of the genome and run length: the spin impulse
/// drives the body forward, damped by leg bulk relative to the torso.
/// This is a stand-in signal for exercising the engine, not a physics
/// model.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_handle: u64,
    bodies: HashMap<PhenotypeHandle, Genome>,
    last_run_seconds: Option<f64>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live phenotypes.
    pub fn live_count(&self) -> usize {
        self.bodies.len()
    }
}

impl SceneBuilder for HeadlessScene {
    fn realize(
        &mut self,
        genome: &Genome,
        model_name: &str,
    ) -> Result<PhenotypeHandle, RealizationError> {
        genome.validate().map_err(|e| RealizationError {
            model_name: model_name.to_string(),
            reason: e.to_string(),
        })?;
        let handle = PhenotypeHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(handle, genome.clone());
        Ok(handle)
    }
}

impl Simulator for HeadlessScene {
    fn run(&mut self, duration_seconds: f64) -> Result<(), SimulationError> {
        if !(duration_seconds > 0.0 && duration_seconds.is_finite()) {
            return Err(SimulationError::RunFailed(format!(
                "non-positive duration {duration_seconds}"
            )));
        }
        self.last_run_seconds = Some(duration_seconds);
        Ok(())
    }

    fn displacement(&self, handle: PhenotypeHandle) -> Result<f64, SimulationError> {
        let seconds = self.last_run_seconds.ok_or(SimulationError::NotRun)?;
        let genome = self
            .bodies
            .get(&handle)
            .ok_or(SimulationError::UnknownHandle(handle))?;
        let drag = genome.leg_width * genome.leg_height * genome.leg_depth;
        let torso = genome.body_width * genome.body_height * genome.body_depth;
        Ok(genome.spin_impulse * seconds * (torso / (torso + drag)))
    }

    fn remove(&mut self, handle: PhenotypeHandle) -> Result<(), SimulationError> {
        self.bodies
            .remove(&handle)
            .map(|_| ())
            .ok_or(SimulationError::UnknownHandle(handle))
    }
}
