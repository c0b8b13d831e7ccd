//! Evolutionary core: persistence, operators, and the generation engine.

mod breed;
mod engine;
pub mod fitness;
mod select;
mod store;

pub use breed::{GenomeRng, MUTATION_FACTOR_RANGE};
pub use engine::{EngineError, EvolutionEngine};
pub use select::{PARENTS_PER_GENERATION, SelectionError, select_parents};
pub use store::{Creature, Lineage, PopulationStore, StoreError};
