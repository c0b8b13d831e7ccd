//! Fitness scoring for measured displacements.
//!
//! One fixed convention is applied everywhere: a finite nonzero
//! displacement `d` scores `-d²`, and a creature that did not move (or
//! was never measured) scores negative infinity. "Better" always means
//! algebraically larger, so among creatures that moved at all, the one
//! closest to its starting point ranks first, and any mover outranks a
//! non-mover.

/// Score a measured displacement.
///
/// `None`, zero and non-finite measurements all map to the worst
/// possible fitness.
pub fn score(distance: Option<f64>) -> f64 {
    match distance {
        Some(d) if d != 0.0 && d.is_finite() => -(d * d),
        _ => f64::NEG_INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_displacement_scores_negative_square() {
        assert_eq!(score(Some(10.0)), -100.0);
        assert_eq!(score(Some(-12.0)), -144.0);
    }

    #[test]
    fn sign_does_not_matter() {
        assert_eq!(score(Some(7.5)), score(Some(-7.5)));
    }

    #[test]
    fn zero_and_absent_are_worst() {
        assert_eq!(score(Some(0.0)), f64::NEG_INFINITY);
        assert_eq!(score(None), f64::NEG_INFINITY);
        assert!(score(Some(0.0)) < score(Some(1e9)));
    }

    #[test]
    fn non_finite_measurements_are_worst() {
        assert_eq!(score(Some(f64::NAN)), f64::NEG_INFINITY);
        assert_eq!(score(Some(f64::INFINITY)), f64::NEG_INFINITY);
    }

    #[test]
    fn worked_example_ranking() {
        // Distances [10, -12, 0] score [-100, -144, -inf]: the creature
        // that moved 10 ranks first, then -12, then the non-mover.
        let scores = [score(Some(10.0)), score(Some(-12.0)), score(Some(0.0))];
        assert!(scores[0] > scores[1]);
        assert!(scores[1] > scores[2]);
    }
}
