//! morphevo - Generational evolution of quadruped body morphologies.
//!
//! A genetic algorithm evolves the seven-scalar genome of simple
//! four-legged bodies toward better locomotion. Fitness comes from an
//! external physics scene: the engine persists every creature it breeds,
//! hands genomes to a [`scene::SceneBuilder`], runs a blocking
//! [`scene::Simulator`] pass, and records each phenotype's measured
//! displacement back into the population store.
//!
//! # Architecture
//!
//! - `schema`: genome value type, ranges/validation, engine configuration
//! - `evolve`: population store, fitness, selection, breeding, engine
//! - `scene`: collaborator traits plus a deterministic headless stand-in
//!
//! # Example
//!
//! ```rust,no_run
//! use morphevo::{
//!     evolve::{EvolutionEngine, PopulationStore},
//!     scene::HeadlessScene,
//!     schema::EngineConfig,
//! };
//!
//! let config = EngineConfig::default();
//! let store = PopulationStore::open_in_memory(config.population_size)?;
//! let mut engine = EvolutionEngine::new(store, HeadlessScene::new(), config)?;
//!
//! // Each call runs one full cycle: reset, seed or breed, evaluate.
//! let generation = engine.create_or_continue()?;
//! println!("evaluated generation {generation}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod evolve;
pub mod scene;
pub mod schema;

// Re-export commonly used types
pub use evolve::{EvolutionEngine, PopulationStore};
pub use scene::{SceneBuilder, Simulator};
pub use schema::{EngineConfig, Genome};
