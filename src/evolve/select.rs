//! Parent selection over a completed generation.

use super::fitness;
use super::store::Creature;

/// Breeding pairs are always drawn from the top two of a generation.
pub const PARENTS_PER_GENERATION: usize = 2;

/// Selection failures.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("generation holds {available} evaluated creatures, need {needed}")]
    InsufficientPopulation { needed: usize, available: usize },
}

/// Pick the two best creatures of a completed generation, best first.
///
/// Ranking is by fitness of the recorded displacement, descending; the
/// sort is stable, so ties keep the records' insertion order.
pub fn select_parents(members: &[Creature]) -> Result<[&Creature; 2], SelectionError> {
    if members.len() < PARENTS_PER_GENERATION {
        return Err(SelectionError::InsufficientPopulation {
            needed: PARENTS_PER_GENERATION,
            available: members.len(),
        });
    }

    let mut ranked: Vec<&Creature> = members.iter().collect();
    ranked.sort_by(|a, b| {
        let fa = fitness::score(Some(a.distance_traveled));
        let fb = fitness::score(Some(b.distance_traveled));
        // score() never returns NaN, so a total order exists.
        fb.partial_cmp(&fa).expect("fitness scores are comparable")
    });

    Ok([ranked[0], ranked[1]])
}
