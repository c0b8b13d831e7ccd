//! Interfaces to the external scene: body construction and physics.
//!
//! The engine never builds geometry or steps physics itself. It hands
//! genomes to a [`SceneBuilder`] and reads displacements back from a
//! [`Simulator`] after a blocking run. Both sides exchange opaque
//! [`PhenotypeHandle`]s issued by the builder.

mod headless;

pub use headless::HeadlessScene;

use crate::schema::Genome;

/// Opaque identifier for one realized phenotype.
///
/// Issued by a [`SceneBuilder`]; meaningful only to the scene that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhenotypeHandle(pub u64);

/// Failure to build the physical body for a genome.
#[derive(Debug, thiserror::Error)]
#[error("failed to realize `{model_name}`: {reason}")]
pub struct RealizationError {
    pub model_name: String,
    pub reason: String,
}

/// Failures reported by the simulation side of the scene.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("simulation run failed: {0}")]
    RunFailed(String),
    #[error("no completed simulation run to read positions from")]
    NotRun,
    #[error("unknown phenotype handle {0:?}")]
    UnknownHandle(PhenotypeHandle),
}

/// Builds a simulatable body for a genome.
pub trait SceneBuilder {
    /// Realize `genome` under the unique `model_name` and return a handle
    /// to the new phenotype.
    fn realize(
        &mut self,
        genome: &Genome,
        model_name: &str,
    ) -> Result<PhenotypeHandle, RealizationError>;
}

/// Runs physics over the realized phenotypes.
pub trait Simulator {
    /// Run the simulation for `duration_seconds`, blocking until it
    /// completes. Afterwards every live phenotype's final position is
    /// queryable through [`Simulator::displacement`].
    fn run(&mut self, duration_seconds: f64) -> Result<(), SimulationError>;

    /// Signed displacement of a phenotype along the locomotion axis,
    /// measured over the most recent completed run.
    fn displacement(&self, handle: PhenotypeHandle) -> Result<f64, SimulationError>;

    /// Remove a phenotype from the scene. The persisted creature record
    /// is unaffected.
    fn remove(&mut self, handle: PhenotypeHandle) -> Result<(), SimulationError>;
}
