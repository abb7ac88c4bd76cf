//! Incident selection.

use dispatch_shared::{DispatchError, DispatchResult, Incident};
use rand::seq::SliceRandom;
use rand::Rng;

/// Pick one candidate uniformly at random.
pub fn select_incident<R: Rng + ?Sized>(
    candidates: &[Incident],
    rng: &mut R,
) -> DispatchResult<Incident> {
    candidates
        .choose(rng)
        .cloned()
        .ok_or(DispatchError::EmptyCandidateSet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_shared::Coord;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn incidents(n: usize) -> Vec<Incident> {
        (0..n)
            .map(|i| Incident::new(Coord::new(27.0 + i as f64 * 0.01, 85.0)))
            .collect()
    }

    #[test]
    fn test_empty_set_fails() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            select_incident(&[], &mut rng).unwrap_err(),
            DispatchError::EmptyCandidateSet
        );
    }

    #[test]
    fn test_selection_is_a_member() {
        let set = incidents(25);
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen = select_incident(&set, &mut rng).unwrap();
            assert!(set.contains(&chosen));
        }
    }

    #[test]
    fn test_every_candidate_can_be_chosen() {
        let set = incidents(4);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [false; 4];
        for _ in 0..400 {
            let chosen = select_incident(&set, &mut rng).unwrap();
            let idx = set.iter().position(|c| *c == chosen).unwrap();
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
