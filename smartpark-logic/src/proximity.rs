use crate::{catalog::ParkingLot, location::Location};

/// How far from the reference point a lot can be and still be shown
pub const DEFAULT_RADIUS_METERS: f64 = 1000.0;

/// Whether `lot` is within `max_distance_meters` (inclusive) of `center`.
///
/// Never true for a non-finite `center`.
pub fn is_nearby(lot: &ParkingLot, center: &Location, max_distance_meters: f64) -> bool {
    center.is_finite() && lot.location().distance_to(center) <= max_distance_meters
}

/// Every lot within `threshold_meters` of `reference`, in input order.
///
/// A non-finite reference point or a threshold that isn't a non-negative number
/// can't be filtered against, so nothing is returned.
pub fn filter_nearby<'a>(
    lots: impl IntoIterator<Item = &'a ParkingLot>,
    reference: &Location,
    threshold_meters: f64,
) -> Vec<&'a ParkingLot> {
    if !reference.is_finite() || threshold_meters.is_nan() || threshold_meters < 0.0 {
        return Vec::new();
    }

    lots.into_iter()
        .filter(|lot| is_nearby(lot, reference, threshold_meters))
        .collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    const ANN_ARBOR: Location = Location::new(42.2808, -83.7430);

    fn mk_lot(name: &str, lat: f64, long: f64) -> ParkingLot {
        ParkingLot::new(Uuid::new_v4(), name, "", Location::new(lat, long), 1.0)
            .expect("Invalid test lot")
    }

    fn mk_lots() -> Vec<ParkingLot> {
        vec![
            mk_lot("same", 42.2808, -83.7430),
            mk_lot("close", 42.2793, -83.7405),
            mk_lot("edge", 42.2745, -83.7331),
            mk_lot("far", 42.30, -83.70),
            mk_lot("very far", 42.2415, -83.7455),
        ]
    }

    fn names(lots: &[&ParkingLot]) -> Vec<String> {
        lots.iter().map(|lot| lot.name().to_string()).collect()
    }

    #[test]
    fn test_same_point_included() {
        let lots = vec![mk_lot("here", 42.2808, -83.7430)];
        let nearby = filter_nearby(&lots, &ANN_ARBOR, DEFAULT_RADIUS_METERS);
        assert_eq!(nearby.len(), 1);
    }

    #[test]
    fn test_far_lot_excluded() {
        let lots = vec![mk_lot("far", 42.30, -83.70)];
        let nearby = filter_nearby(&lots, &ANN_ARBOR, DEFAULT_RADIUS_METERS);
        assert!(nearby.is_empty());
    }

    #[test]
    fn test_threshold_inclusive() {
        let lot = mk_lot("close", 42.2793, -83.7405);
        let exact = lot.location().distance_to(&ANN_ARBOR);
        assert!(is_nearby(&lot, &ANN_ARBOR, exact));
        assert!(!is_nearby(&lot, &ANN_ARBOR, exact - 0.001));
    }

    #[test]
    fn test_matches_distance() {
        let lots = mk_lots();
        for threshold in [0.0, 250.0, 1000.0, 5000.0] {
            let nearby = filter_nearby(&lots, &ANN_ARBOR, threshold);
            let expected = lots
                .iter()
                .filter(|lot| lot.location().distance_to(&ANN_ARBOR) <= threshold)
                .collect::<Vec<_>>();
            assert_eq!(nearby, expected, "Mismatch at threshold {threshold}");
        }
    }

    #[test]
    fn test_monotonic() {
        let lots = mk_lots();
        let thresholds = [0.0, 100.0, 500.0, 1000.0, 2000.0, 10_000.0];
        for pair in thresholds.windows(2) {
            let small = filter_nearby(&lots, &ANN_ARBOR, pair[0]);
            let large = filter_nearby(&lots, &ANN_ARBOR, pair[1]);
            assert!(
                small.iter().all(|lot| large.contains(lot)),
                "{:?} at {} is not within {:?} at {}",
                names(&small),
                pair[0],
                names(&large),
                pair[1],
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let lots = mk_lots();
        let once = filter_nearby(&lots, &ANN_ARBOR, DEFAULT_RADIUS_METERS);
        let twice = filter_nearby(once.iter().copied(), &ANN_ARBOR, DEFAULT_RADIUS_METERS);
        assert_eq!(once, twice);
        assert_eq!(names(&once), vec!["same", "close"]);
    }

    #[test]
    fn test_empty_catalog() {
        let lots: Vec<ParkingLot> = vec![];
        assert!(filter_nearby(&lots, &ANN_ARBOR, DEFAULT_RADIUS_METERS).is_empty());
        assert!(filter_nearby(&lots, &ANN_ARBOR, f64::MAX).is_empty());
    }

    #[test]
    fn test_non_finite_reference() {
        let lots = mk_lots();
        for reference in [
            Location::new(f64::NAN, -83.7430),
            Location::new(42.2808, f64::INFINITY),
            Location::new(f64::NEG_INFINITY, f64::NAN),
        ] {
            assert!(filter_nearby(&lots, &reference, f64::MAX).is_empty());
        }
    }

    #[test]
    fn test_non_finite_center_never_nearby() {
        let lot = mk_lot("here", 42.2808, -83.7430);
        for center in [
            Location::new(f64::NAN, -83.7430),
            Location::new(42.2808, f64::NEG_INFINITY),
        ] {
            assert!(!is_nearby(&lot, &center, f64::INFINITY));
            assert!(!is_nearby(&lot, &center, f64::MAX));
        }
    }

    #[test]
    fn test_bad_threshold() {
        let lots = mk_lots();
        assert!(filter_nearby(&lots, &ANN_ARBOR, f64::NAN).is_empty());
        assert!(filter_nearby(&lots, &ANN_ARBOR, -1.0).is_empty());
    }
}
