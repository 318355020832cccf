use std::cmp::Ordering;

use crate::models::assignment::Candidate;

/// Ascending sort: best candidate first. Tier dominates, then measured
/// distance (an unknown distance sorts after any measured one), then
/// rating descending; the cleaner id breaks remaining ties so the order
/// is reproducible.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| cmp_distance(a.distance_km, b.distance_km))
            .then_with(|| b.rating.total_cmp(&a.rating))
            .then_with(|| a.cleaner_id.cmp(&b.cleaner_id))
    });
}

fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::rank;
    use crate::models::assignment::{AvailabilityTier, Candidate};

    fn candidate(
        id_seed: u128,
        tier: AvailabilityTier,
        distance_km: Option<f64>,
        rating: f64,
    ) -> Candidate {
        Candidate {
            cleaner_id: Uuid::from_u128(id_seed),
            tier,
            distance_km,
            rating,
        }
    }

    #[test]
    fn tier_dominates_distance() {
        let mut candidates = vec![
            candidate(1, AvailabilityTier::Limited, Some(0.5), 5.0),
            candidate(2, AvailabilityTier::Available, Some(8.0), 3.0),
        ];
        rank(&mut candidates);

        assert_eq!(candidates[0].cleaner_id, Uuid::from_u128(2));
    }

    #[test]
    fn closer_cleaner_ranks_first_within_tier() {
        let mut candidates = vec![
            candidate(1, AvailabilityTier::Available, Some(6.2), 4.0),
            candidate(2, AvailabilityTier::Available, Some(1.4), 4.0),
        ];
        rank(&mut candidates);

        assert_eq!(candidates[0].cleaner_id, Uuid::from_u128(2));
    }

    #[test]
    fn higher_rating_breaks_distance_tie() {
        let mut candidates = vec![
            candidate(1, AvailabilityTier::Available, Some(3.0), 3.5),
            candidate(2, AvailabilityTier::Available, Some(3.0), 4.8),
        ];
        rank(&mut candidates);

        assert_eq!(candidates[0].cleaner_id, Uuid::from_u128(2));
    }

    #[test]
    fn unknown_distance_sorts_after_measured() {
        let mut candidates = vec![
            candidate(1, AvailabilityTier::Limited, None, 5.0),
            candidate(2, AvailabilityTier::Limited, Some(40.0), 1.0),
        ];
        rank(&mut candidates);

        assert_eq!(candidates[0].cleaner_id, Uuid::from_u128(2));
    }

    #[test]
    fn id_breaks_full_ties_deterministically() {
        let mut first = vec![
            candidate(9, AvailabilityTier::Available, Some(2.0), 4.0),
            candidate(3, AvailabilityTier::Available, Some(2.0), 4.0),
        ];
        let mut second = vec![
            candidate(3, AvailabilityTier::Available, Some(2.0), 4.0),
            candidate(9, AvailabilityTier::Available, Some(2.0), 4.0),
        ];
        rank(&mut first);
        rank(&mut second);

        assert_eq!(first[0].cleaner_id, Uuid::from_u128(3));
        assert_eq!(second[0].cleaner_id, Uuid::from_u128(3));
    }
}
