//! SQLite-backed population store.
//!
//! The store is the durable record of every creature ever created:
//! genome, generation, lineage, and the distance measured by the last
//! evaluation. Records are inserted under the open-generation rule (a
//! generation accepts inserts until it reaches the configured population
//! size, then the next insert starts a new one) and are never deleted.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

use crate::schema::Genome;

/// One persisted creature.
#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    /// Store-assigned primary key.
    pub id: i64,
    /// Unique handle correlating to a phenotype instance in the scene.
    pub model_name: String,
    /// Generation cohort, 1-based.
    pub generation: u32,
    pub genome: Genome,
    /// Signed displacement recorded by the last evaluation; 0 until then.
    pub distance_traveled: f64,
    pub parent1_id: Option<i64>,
    pub parent2_id: Option<i64>,
}

/// Parent and own model names for one creature.
#[derive(Debug, Clone, PartialEq)]
pub struct Lineage {
    pub parent1: Option<String>,
    pub parent2: Option<String>,
    pub own: String,
}

/// Store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Write(#[from] rusqlite::Error),
    #[error("no creature with id {0}")]
    NotFound(i64),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS creatures (
    id                INTEGER PRIMARY KEY,
    model_name        TEXT    NOT NULL UNIQUE,
    generation        INTEGER NOT NULL CHECK (generation >= 1),
    body_width        REAL    NOT NULL,
    body_height       REAL    NOT NULL,
    body_depth        REAL    NOT NULL,
    leg_width         REAL    NOT NULL,
    leg_height        REAL    NOT NULL,
    leg_depth         REAL    NOT NULL,
    spin_impulse      REAL    NOT NULL,
    distance_traveled REAL    NOT NULL DEFAULT 0,
    parent1_id        INTEGER REFERENCES creatures(id),
    parent2_id        INTEGER REFERENCES creatures(id)
);
CREATE INDEX IF NOT EXISTS idx_creatures_generation ON creatures(generation);
";

const CREATURE_COLUMNS: &str = "id, model_name, generation, \
     body_width, body_height, body_depth, \
     leg_width, leg_height, leg_depth, \
     spin_impulse, distance_traveled, parent1_id, parent2_id";

/// Durable record of the whole population across generations.
pub struct PopulationStore {
    conn: Connection,
    population_size: usize,
}

impl PopulationStore {
    /// Open (or create) a population database on disk.
    pub fn open<P: AsRef<Path>>(path: P, population_size: usize) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?, population_size)
    }

    /// Open a transient in-memory population database.
    pub fn open_in_memory(population_size: usize) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, population_size)
    }

    fn from_connection(conn: Connection, population_size: usize) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            population_size,
        })
    }

    /// Insert a creature, resolving its generation under the
    /// open-generation rule, and return the stored record.
    ///
    /// The id and model name are allocated by the store; the whole insert
    /// runs in one transaction, so no partial row is visible on failure.
    pub fn insert(
        &mut self,
        genome: &Genome,
        parents: Option<(i64, i64)>,
    ) -> Result<Creature, StoreError> {
        let tx = self.conn.transaction()?;

        let max_generation: u32 =
            tx.query_row("SELECT COALESCE(MAX(generation), 0) FROM creatures", [], |row| {
                row.get(0)
            })?;
        let generation = if max_generation == 0 {
            1
        } else {
            let filled: i64 = tx.query_row(
                "SELECT COUNT(*) FROM creatures WHERE generation = ?1",
                params![max_generation],
                |row| row.get(0),
            )?;
            if (filled as usize) < self.population_size {
                max_generation
            } else {
                max_generation + 1
            }
        };

        let id: i64 = tx.query_row("SELECT COALESCE(MAX(id), 0) + 1 FROM creatures", [], |row| {
            row.get(0)
        })?;
        let model_name = format!("creature_{id}");
        let (parent1_id, parent2_id) = match parents {
            Some((a, b)) => (Some(a), Some(b)),
            None => (None, None),
        };

        tx.execute(
            "INSERT INTO creatures (
                id, model_name, generation,
                body_width, body_height, body_depth,
                leg_width, leg_height, leg_depth,
                spin_impulse, distance_traveled, parent1_id, parent2_id
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,0,?11,?12)",
            params![
                id,
                model_name,
                generation,
                genome.body_width,
                genome.body_height,
                genome.body_depth,
                genome.leg_width,
                genome.leg_height,
                genome.leg_depth,
                genome.spin_impulse,
                parent1_id,
                parent2_id,
            ],
        )?;
        tx.commit()?;

        Ok(Creature {
            id,
            model_name,
            generation,
            genome: genome.clone(),
            distance_traveled: 0.0,
            parent1_id,
            parent2_id,
        })
    }

    /// Fetch one creature by id.
    pub fn get(&self, id: i64) -> Result<Creature, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT {CREATURE_COLUMNS} FROM creatures WHERE id = ?1"),
                params![id],
                row_to_creature,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
    }

    /// All creatures of one generation, in insertion order.
    pub fn get_by_generation(&self, generation: u32) -> Result<Vec<Creature>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CREATURE_COLUMNS} FROM creatures WHERE generation = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![generation], row_to_creature)?;
        let mut creatures = Vec::new();
        for row in rows {
            creatures.push(row?);
        }
        Ok(creatures)
    }

    /// Highest generation present, 0 when the store is empty.
    pub fn highest_generation(&self) -> Result<u32, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(generation), 0) FROM creatures",
            [],
            |row| row.get(0),
        )?)
    }

    /// Overwrite the measured displacement for one creature.
    pub fn record_distance(&mut self, id: i64, distance: f64) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE creatures SET distance_traveled = ?1 WHERE id = ?2",
            params![distance, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Parent and own model names for one creature.
    pub fn lineage(&self, id: i64) -> Result<Lineage, StoreError> {
        let creature = self.get(id)?;
        let name_of = |parent: Option<i64>| -> Result<Option<String>, StoreError> {
            match parent {
                Some(pid) => Ok(Some(self.get(pid)?.model_name)),
                None => Ok(None),
            }
        };
        Ok(Lineage {
            parent1: name_of(creature.parent1_id)?,
            parent2: name_of(creature.parent2_id)?,
            own: creature.model_name,
        })
    }
}

fn row_to_creature(row: &rusqlite::Row<'_>) -> rusqlite::Result<Creature> {
    Ok(Creature {
        id: row.get(0)?,
        model_name: row.get(1)?,
        generation: row.get(2)?,
        genome: Genome {
            body_width: row.get(3)?,
            body_height: row.get(4)?,
            body_depth: row.get(5)?,
            leg_width: row.get(6)?,
            leg_height: row.get(7)?,
            leg_depth: row.get(8)?,
            spin_impulse: row.get(9)?,
        },
        distance_traveled: row.get(10)?,
        parent1_id: row.get(11)?,
        parent2_id: row.get(12)?,
    })
}
