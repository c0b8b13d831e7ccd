//! Generation lifecycle state machine.
//!
//! The engine is the only component with mutable process state: the
//! population store cursor, the live phenotype handles, and the RNG. It
//! drives one generation transition at a time: breed (or seed) a cohort,
//! persist it, realize it in the scene, run the blocking simulation, and
//! write measured displacements back to the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};

use crate::scene::{PhenotypeHandle, SceneBuilder, SimulationError, Simulator};
use crate::schema::{ConfigError, EngineConfig, Genome};

use super::breed::GenomeRng;
use super::select::{self, SelectionError};
use super::store::{Creature, PopulationStore, StoreError};

/// Engine failures surfaced to the caller.
///
/// Per-creature genome and realization failures are recovered locally
/// (skip and log) and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("generation {generation} has {live} live phenotypes, expected {expected}")]
    EvaluationIncomplete {
        generation: u32,
        live: usize,
        expected: usize,
    },
    #[error("a create-or-continue cycle is already in progress")]
    CycleInProgress,
}

/// Orchestrates the generation lifecycle over a store and a scene.
pub struct EvolutionEngine<S: SceneBuilder + Simulator> {
    store: PopulationStore,
    scene: S,
    config: EngineConfig,
    rng: GenomeRng,
    /// Live phenotype handles by creature id. Only the most recently
    /// realized generation has entries; `reset()` drains them.
    phenotypes: HashMap<i64, PhenotypeHandle>,
    busy: Arc<AtomicBool>,
}

/// Releases the re-entrancy guard when a cycle ends, normally or not.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: SceneBuilder + Simulator> EvolutionEngine<S> {
    /// Create an engine over an opened store and a scene.
    pub fn new(store: PopulationStore, scene: S, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };
        Ok(Self {
            store,
            scene,
            config,
            rng,
            phenotypes: HashMap::new(),
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Read-only store access for operator surfaces.
    pub fn store(&self) -> &PopulationStore {
        &self.store
    }

    /// Mutable store access. The store's own invariants hold regardless
    /// of the engine cursor.
    pub fn store_mut(&mut self) -> &mut PopulationStore {
        &mut self.store
    }

    /// Flag set while a create-or-continue cycle runs. An operator
    /// surface can watch it to disable its trigger.
    pub fn busy_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.busy)
    }

    /// Highest generation in the store, 0 when empty.
    pub fn current_generation(&self) -> Result<u32, EngineError> {
        Ok(self.store.highest_generation()?)
    }

    /// Seed the population: generate, persist, and realize
    /// `population_size` random genomes with no parents.
    ///
    /// Returns the persisted creature ids. Invalid genomes and failed
    /// realizations are skipped and logged.
    pub fn create_initial_generation(&mut self) -> Result<Vec<i64>, EngineError> {
        let mut created = Vec::with_capacity(self.config.population_size);
        for _ in 0..self.config.population_size {
            let genome = self.rng.random_genome();
            if let Err(e) = genome.validate() {
                warn!("skipping invalid random genome: {e}");
                continue;
            }
            let creature = self.store.insert(&genome, None)?;
            debug!(
                "persisted {} (generation {})",
                creature.model_name, creature.generation
            );
            self.realize_creature(&creature);
            created.push(creature.id);
        }
        info!("seeded generation 1 with {} creatures", created.len());
        Ok(created)
    }

    /// Evaluate the current generation: run the simulator, read each
    /// phenotype's displacement, and record it in the store.
    ///
    /// Requires a full complement of live phenotypes; otherwise fails
    /// with [`EngineError::EvaluationIncomplete`] before touching the
    /// simulator. A simulator failure leaves fitness unset; calling this
    /// again retries the whole evaluation.
    pub fn evaluate_generation(&mut self) -> Result<(), EngineError> {
        let generation = self.store.highest_generation()?;
        let members = self.store.get_by_generation(generation)?;
        let live: Vec<(i64, PhenotypeHandle)> = members
            .iter()
            .filter_map(|c| self.phenotypes.get(&c.id).map(|h| (c.id, *h)))
            .collect();
        if live.len() < self.config.population_size {
            return Err(EngineError::EvaluationIncomplete {
                generation,
                live: live.len(),
                expected: self.config.population_size,
            });
        }

        self.scene.run(self.config.simulation_seconds)?;

        for (id, handle) in live {
            let distance = self.scene.displacement(handle)?;
            self.store.record_distance(id, distance)?;
            debug!("creature {id} traveled {distance:.3}");
        }
        info!("evaluated generation {generation}");
        Ok(())
    }

    /// Breed the next generation from the current one's two best
    /// creatures and realize the children.
    ///
    /// A crash between inserts can leave the highest generation short of
    /// `population_size`; that generation is then completed in place
    /// instead (parents taken from the previous generation, or fresh
    /// random genomes for a partial first generation), so children never
    /// reference parents of their own generation.
    ///
    /// Selection failure aborts without advancing. Invalid children and
    /// failed realizations are skipped and logged. Returns the persisted
    /// ids.
    pub fn advance_generation(&mut self) -> Result<Vec<i64>, EngineError> {
        let generation = self.store.highest_generation()?;
        let members = self.store.get_by_generation(generation)?;
        if members.len() < self.config.population_size {
            return self.fill_open_generation(generation, &members);
        }

        let [first, second] = select::select_parents(&members)?;
        let (p1_id, p2_id) = (first.id, second.id);
        let (p1_genome, p2_genome) = (first.genome.clone(), second.genome.clone());
        info!(
            "breeding generation {} from creatures {p1_id} and {p2_id}",
            generation + 1
        );
        self.breed_children(self.config.population_size, p1_id, p2_id, &p1_genome, &p2_genome)
    }

    /// Complete a generation left short by an interrupted transition.
    ///
    /// Existing members are re-realized if their phenotypes are missing
    /// (a restart loses the handle map), then the gap is filled with
    /// children bred from the previous generation's selected pair, or
    /// with parentless random genomes when this is generation 1.
    fn fill_open_generation(
        &mut self,
        generation: u32,
        members: &[Creature],
    ) -> Result<Vec<i64>, EngineError> {
        info!(
            "completing open generation {generation}: {} of {} members present",
            members.len(),
            self.config.population_size
        );
        for creature in members {
            if !self.phenotypes.contains_key(&creature.id) {
                self.realize_creature(creature);
            }
        }

        let missing = self.config.population_size - members.len();
        if generation <= 1 {
            let mut created = Vec::with_capacity(missing);
            for _ in 0..missing {
                let genome = self.rng.random_genome();
                if let Err(e) = genome.validate() {
                    warn!("skipping invalid random genome: {e}");
                    continue;
                }
                let creature = self.store.insert(&genome, None)?;
                self.realize_creature(&creature);
                created.push(creature.id);
            }
            return Ok(created);
        }

        let previous = self.store.get_by_generation(generation - 1)?;
        let [first, second] = select::select_parents(&previous)?;
        let (p1_id, p2_id) = (first.id, second.id);
        let (p1_genome, p2_genome) = (first.genome.clone(), second.genome.clone());
        self.breed_children(missing, p1_id, p2_id, &p1_genome, &p2_genome)
    }

    fn breed_children(
        &mut self,
        count: usize,
        p1_id: i64,
        p2_id: i64,
        p1_genome: &Genome,
        p2_genome: &Genome,
    ) -> Result<Vec<i64>, EngineError> {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let bred = self.rng.crossover(p1_genome, p2_genome);
            let child = self.rng.mutate(&bred, self.config.mutation_rate);
            if let Err(e) = child.validate() {
                warn!("skipping invalid child genome: {e}");
                continue;
            }
            let creature = self.store.insert(&child, Some((p1_id, p2_id)))?;
            self.realize_creature(&creature);
            created.push(creature.id);
        }
        Ok(created)
    }

    /// Remove the current generation's phenotypes from the scene.
    ///
    /// Persisted records and the generation cursor are untouched; a
    /// removal failure is logged and the remaining phenotypes are still
    /// cleaned up.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        let generation = self.store.highest_generation()?;
        if generation == 0 {
            return Ok(());
        }
        for creature in self.store.get_by_generation(generation)? {
            if let Some(handle) = self.phenotypes.remove(&creature.id) {
                if let Err(e) = self.scene.remove(handle) {
                    warn!("failed to remove phenotype of {}: {e}", creature.model_name);
                }
            }
        }
        debug!("cleared phenotypes of generation {generation}");
        Ok(())
    }

    /// The single operator command: reset the scene, seed or advance the
    /// population, and evaluate it. Returns the evaluated generation.
    ///
    /// Re-entry while a cycle is mid-flight (the simulator call blocks)
    /// is rejected with [`EngineError::CycleInProgress`].
    pub fn create_or_continue(&mut self) -> Result<u32, EngineError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::CycleInProgress);
        }
        let _guard = BusyGuard(Arc::clone(&self.busy));

        self.reset()?;
        if self.store.highest_generation()? == 0 {
            self.create_initial_generation()?;
        } else {
            self.advance_generation()?;
        }
        self.evaluate_generation()?;
        Ok(self.store.highest_generation()?)
    }

    fn realize_creature(&mut self, creature: &Creature) {
        match self.scene.realize(&creature.genome, &creature.model_name) {
            Ok(handle) => {
                self.phenotypes.insert(creature.id, handle);
            }
            Err(e) => warn!("skipping realization of {}: {e}", creature.model_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::scene::{HeadlessScene, RealizationError};

    /// Scene double with displacements scripted per model name.
    #[derive(Default)]
    struct ScriptedScene {
        next_handle: u64,
        displacements: HashMap<String, f64>,
        fail_realize: HashSet<String>,
        realized: HashMap<PhenotypeHandle, String>,
        removed: Vec<String>,
        ran: bool,
    }

    impl ScriptedScene {
        fn with_displacements(pairs: &[(&str, f64)]) -> Self {
            Self {
                displacements: pairs
                    .iter()
                    .map(|(name, d)| (name.to_string(), *d))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl SceneBuilder for ScriptedScene {
        fn realize(
            &mut self,
            _genome: &Genome,
            model_name: &str,
        ) -> Result<PhenotypeHandle, RealizationError> {
            if self.fail_realize.contains(model_name) {
                return Err(RealizationError {
                    model_name: model_name.to_string(),
                    reason: "scripted failure".to_string(),
                });
            }
            let handle = PhenotypeHandle(self.next_handle);
            self.next_handle += 1;
            self.realized.insert(handle, model_name.to_string());
            Ok(handle)
        }
    }

    impl Simulator for ScriptedScene {
        fn run(&mut self, _duration_seconds: f64) -> Result<(), SimulationError> {
            self.ran = true;
            Ok(())
        }

        fn displacement(&self, handle: PhenotypeHandle) -> Result<f64, SimulationError> {
            if !self.ran {
                return Err(SimulationError::NotRun);
            }
            let name = self
                .realized
                .get(&handle)
                .ok_or(SimulationError::UnknownHandle(handle))?;
            Ok(self.displacements.get(name).copied().unwrap_or(0.0))
        }

        fn remove(&mut self, handle: PhenotypeHandle) -> Result<(), SimulationError> {
            let name = self
                .realized
                .remove(&handle)
                .ok_or(SimulationError::UnknownHandle(handle))?;
            self.removed.push(name);
            Ok(())
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn engine_with(scene: ScriptedScene, config: EngineConfig) -> EvolutionEngine<ScriptedScene> {
        let store = PopulationStore::open_in_memory(config.population_size).unwrap();
        EvolutionEngine::new(store, scene, config).unwrap()
    }

    #[test]
    fn initial_generation_persists_and_realizes() {
        let mut engine = engine_with(ScriptedScene::default(), test_config());
        let ids = engine.create_initial_generation().unwrap();
        assert_eq!(ids.len(), 3);

        let members = engine.store().get_by_generation(1).unwrap();
        assert_eq!(members.len(), 3);
        for creature in &members {
            assert_eq!(creature.generation, 1);
            assert!(creature.parent1_id.is_none());
            assert!(creature.parent2_id.is_none());
            assert_eq!(creature.distance_traveled, 0.0);
        }
        assert_eq!(engine.scene.realized.len(), 3);
        assert_eq!(engine.current_generation().unwrap(), 1);
    }

    #[test]
    fn worked_example_selection_and_breeding() {
        // Model names are id-derived, so the first cohort is
        // creature_1..creature_3.
        let scene = ScriptedScene::with_displacements(&[
            ("creature_1", 10.0),
            ("creature_2", -12.0),
            ("creature_3", 0.0),
        ]);
        let config = EngineConfig {
            mutation_rate: 0.0, // pre-mutation field equality below
            ..test_config()
        };
        let mut engine = engine_with(scene, config);

        engine.create_initial_generation().unwrap();
        engine.evaluate_generation().unwrap();

        let parents = engine.store().get_by_generation(1).unwrap();
        let distances: Vec<f64> = parents.iter().map(|c| c.distance_traveled).collect();
        assert_eq!(distances, vec![10.0, -12.0, 0.0]);

        let child_ids = engine.advance_generation().unwrap();
        assert_eq!(child_ids.len(), 3);

        // Fitness -100 beats -144 beats -inf: parents are the creatures
        // that traveled 10 and -12, in that order.
        let children = engine.store().get_by_generation(2).unwrap();
        let (p1, p2) = (&parents[0], &parents[1]);
        for child in &children {
            assert_eq!(child.generation, 2);
            assert_eq!(child.parent1_id, Some(p1.id));
            assert_eq!(child.parent2_id, Some(p2.id));
            for ((value, a), b) in child
                .genome
                .fields()
                .iter()
                .zip(p1.genome.fields())
                .zip(p2.genome.fields())
            {
                assert!(*value == a || *value == b);
            }
        }
    }

    #[test]
    fn lineage_links_resolve_to_previous_generation() {
        let mut engine = engine_with(ScriptedScene::default(), test_config());
        engine.create_or_continue().unwrap();
        engine.create_or_continue().unwrap();
        engine.create_or_continue().unwrap();
        assert_eq!(engine.current_generation().unwrap(), 3);

        for generation in 2..=3 {
            for child in engine.store().get_by_generation(generation).unwrap() {
                for parent_id in [child.parent1_id.unwrap(), child.parent2_id.unwrap()] {
                    let parent = engine.store().get(parent_id).unwrap();
                    assert_eq!(parent.generation, generation - 1);
                }
            }
        }
    }

    #[test]
    fn failed_realization_leaves_generation_unevaluable() {
        let mut scene = ScriptedScene::default();
        scene.fail_realize.insert("creature_2".to_string());
        let mut engine = engine_with(scene, test_config());

        // The record is still persisted; only the phenotype is missing.
        let ids = engine.create_initial_generation().unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(engine.scene.realized.len(), 2);

        match engine.evaluate_generation() {
            Err(EngineError::EvaluationIncomplete {
                generation,
                live,
                expected,
            }) => {
                assert_eq!(generation, 1);
                assert_eq!(live, 2);
                assert_eq!(expected, 3);
            }
            other => panic!("expected EvaluationIncomplete, got {other:?}"),
        }
        // Fitness stayed unset for the whole generation.
        for creature in engine.store().get_by_generation(1).unwrap() {
            assert_eq!(creature.distance_traveled, 0.0);
        }
    }

    #[test]
    fn evaluation_overwrites_on_retry() {
        let scene = ScriptedScene::with_displacements(&[("creature_1", 4.0)]);
        let mut engine = engine_with(scene, test_config());
        engine.create_initial_generation().unwrap();
        engine.evaluate_generation().unwrap();
        engine.evaluate_generation().unwrap();
        let first = &engine.store().get_by_generation(1).unwrap()[0];
        assert_eq!(first.distance_traveled, 4.0);
    }

    #[test]
    fn reset_removes_current_generation_phenotypes() {
        let mut engine = engine_with(ScriptedScene::default(), test_config());
        engine.create_initial_generation().unwrap();
        engine.reset().unwrap();

        assert_eq!(engine.scene.removed.len(), 3);
        assert!(engine.phenotypes.is_empty());
        // Records and cursor are untouched.
        assert_eq!(engine.store().get_by_generation(1).unwrap().len(), 3);
        assert_eq!(engine.current_generation().unwrap(), 1);
    }

    #[test]
    fn create_or_continue_rejects_re_entry() {
        let mut engine = engine_with(ScriptedScene::default(), test_config());
        let busy = engine.busy_handle();

        busy.store(true, Ordering::Release);
        assert!(matches!(
            engine.create_or_continue(),
            Err(EngineError::CycleInProgress)
        ));

        busy.store(false, Ordering::Release);
        assert_eq!(engine.create_or_continue().unwrap(), 1);
        // The guard was released at cycle end.
        assert_eq!(engine.create_or_continue().unwrap(), 2);
    }

    #[test]
    fn resumed_open_generation_breeds_from_previous_cohort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("population.db");

        {
            let store = PopulationStore::open(&path, 3).unwrap();
            let scene = ScriptedScene::with_displacements(&[
                ("creature_1", 10.0),
                ("creature_2", -12.0),
                ("creature_3", 0.0),
            ]);
            let mut engine = EvolutionEngine::new(store, scene, test_config()).unwrap();
            engine.create_initial_generation().unwrap();
            engine.evaluate_generation().unwrap();

            // Two children persisted before the process died
            // mid-transition, leaving generation 2 one creature short.
            let parents = engine.store().get_by_generation(1).unwrap();
            let pair = Some((parents[0].id, parents[1].id));
            for _ in 0..2 {
                let child = engine.rng.crossover(&parents[0].genome, &parents[1].genome);
                engine.store_mut().insert(&child, pair).unwrap();
            }
        }

        let store = PopulationStore::open(&path, 3).unwrap();
        let mut engine =
            EvolutionEngine::new(store, ScriptedScene::default(), test_config()).unwrap();
        let created = engine.advance_generation().unwrap();
        assert_eq!(created.len(), 1);

        // The open generation was completed in place, and every member
        // descends from generation 1, never from its own cohort.
        let members = engine.store().get_by_generation(2).unwrap();
        assert_eq!(members.len(), 3);
        for child in &members {
            for parent_id in [child.parent1_id.unwrap(), child.parent2_id.unwrap()] {
                assert_eq!(engine.store().get(parent_id).unwrap().generation, 1);
            }
        }
        // Survivors were re-realized alongside the fill child.
        engine.evaluate_generation().unwrap();
    }

    #[test]
    fn resumed_partial_first_generation_is_topped_up() {
        let mut store = PopulationStore::open_in_memory(3).unwrap();
        let mut seeder = GenomeRng::new(7);
        store.insert(&seeder.random_genome(), None).unwrap();
        store.insert(&seeder.random_genome(), None).unwrap();

        let mut engine =
            EvolutionEngine::new(store, ScriptedScene::default(), test_config()).unwrap();
        let created = engine.advance_generation().unwrap();
        assert_eq!(created.len(), 1);

        let members = engine.store().get_by_generation(1).unwrap();
        assert_eq!(members.len(), 3);
        for creature in &members {
            assert!(creature.parent1_id.is_none());
            assert!(creature.parent2_id.is_none());
        }
        engine.evaluate_generation().unwrap();
    }

    #[test]
    fn headless_scene_drives_full_cycles() {
        let store = PopulationStore::open_in_memory(3).unwrap();
        let mut engine =
            EvolutionEngine::new(store, HeadlessScene::new(), test_config()).unwrap();

        assert_eq!(engine.create_or_continue().unwrap(), 1);
        assert_eq!(engine.create_or_continue().unwrap(), 2);

        let children = engine.store().get_by_generation(2).unwrap();
        assert_eq!(children.len(), 3);
        for child in &children {
            assert!(child.parent1_id.is_some());
            assert!(child.parent2_id.is_some());
            assert!(child.genome.validate().is_ok());
        }
    }
}
