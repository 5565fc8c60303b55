use std::cmp::Ordering;

use crate::models::ScoredCandidate;

/// Order scored candidates and truncate to the requested count
///
/// Primary key: match score descending. Ties break on carrier rating
/// descending, then carrier id ascending, giving a total order so results
/// are deterministic for identical scoring inputs.
pub fn rank(mut candidates: Vec<ScoredCandidate>, max_results: usize) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.carrier_rating
                    .partial_cmp(&a.carrier_rating)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.carrier_id.cmp(&b.carrier_id))
    });

    candidates.truncate(max_results);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RouteDeviation;
    use uuid::Uuid;

    fn candidate(id: Uuid, score: f64, rating: f64) -> ScoredCandidate {
        ScoredCandidate {
            carrier_id: id,
            match_score: score,
            compensation: 100.0,
            deviation: RouteDeviation { distance_km: 1.0, minutes: 2.0 },
            schedule_overlap: 1.0,
            carrier_rating: rating,
        }
    }

    #[test]
    fn test_sorted_by_score_descending() {
        let a = candidate(Uuid::new_v4(), 0.4, 3.0);
        let b = candidate(Uuid::new_v4(), 0.9, 3.0);
        let c = candidate(Uuid::new_v4(), 0.7, 3.0);

        let ranked = rank(vec![a, b.clone(), c], 10);
        assert_eq!(ranked[0].carrier_id, b.carrier_id);
        assert!(ranked[0].match_score >= ranked[1].match_score);
        assert!(ranked[1].match_score >= ranked[2].match_score);
    }

    #[test]
    fn test_tie_breaks_on_rating_then_id() {
        let low_id = Uuid::from_u128(1);
        let high_id = Uuid::from_u128(2);

        // Equal score: higher rating first
        let ranked = rank(
            vec![candidate(low_id, 0.8, 3.0), candidate(high_id, 0.8, 4.5)],
            10,
        );
        assert_eq!(ranked[0].carrier_id, high_id);

        // Equal score and rating: lower id first
        let ranked = rank(
            vec![candidate(high_id, 0.8, 4.0), candidate(low_id, 0.8, 4.0)],
            10,
        );
        assert_eq!(ranked[0].carrier_id, low_id);
    }

    #[test]
    fn test_truncates_to_max_results() {
        let candidates: Vec<_> = (0..12)
            .map(|i| candidate(Uuid::from_u128(i), i as f64 / 12.0, 3.0))
            .collect();

        assert_eq!(rank(candidates, 5).len(), 5);
    }

    #[test]
    fn test_fewer_candidates_than_requested_is_fine() {
        let candidates = vec![candidate(Uuid::new_v4(), 0.5, 3.0)];
        assert_eq!(rank(candidates, 5).len(), 1);
    }
}
