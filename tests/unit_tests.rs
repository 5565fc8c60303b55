// Unit tests for Courier Algo

use chrono::{NaiveTime, TimeZone, Utc};
use courier_algo::core::{
    capacity_fit_score, compensation, distance_km, filter_carriers, is_valid_coordinate,
    platform_fee, rank, route_deviation, schedule_compatibility, window_overlap_ratio,
    HeuristicScorer, ScoreProvider,
};
use courier_algo::models::{
    Carrier, Coordinate, DailyWindow, Dimensions, Package, PackageStatus, RouteDeviation,
    ScoredCandidate, TimeWindow, Urgency, VehicleCapacity,
};
use uuid::Uuid;

fn window(start_h: u32, end_h: u32) -> TimeWindow {
    TimeWindow {
        start: Utc.with_ymd_and_hms(2026, 8, 23, start_h, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 8, 23, end_h, 0, 0).unwrap(),
    }
}

fn daily(start_h: u32, end_h: u32) -> DailyWindow {
    DailyWindow {
        start: NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(end_h, 0, 0).unwrap(),
    }
}

fn create_test_package(urgency: Urgency, weight: f64) -> Package {
    Package {
        id: Uuid::new_v4(),
        pickup: Coordinate::new(40.7128, -74.0060),
        delivery: Coordinate::new(40.7580, -73.9855),
        pickup_window: window(9, 12),
        delivery_window: window(13, 17),
        dimensions: Dimensions {
            length: 40.0,
            width: 30.0,
            height: 20.0,
            weight,
        },
        urgency,
        status: PackageStatus::Pending,
        matched: false,
        matched_at: None,
        requires_signature: false,
    }
}

fn create_test_carrier(lat: f64, lon: f64) -> Carrier {
    Carrier {
        id: Uuid::new_v4(),
        active: true,
        location: Some(Coordinate::new(lat, lon)),
        route: vec![],
        capacity: None,
        schedule: None,
        rating: Some(4.5),
        on_time_rate: Some(0.9),
        completed_deliveries: 25,
    }
}

#[test]
fn test_distance_zero_for_same_point() {
    let p = Coordinate::new(40.7128, -74.0060);
    assert_eq!(distance_km(p, p), 0.0);
}

#[test]
fn test_distance_symmetric() {
    let manhattan = Coordinate::new(40.7580, -73.9855);
    let brooklyn = Coordinate::new(40.6782, -73.9442);

    assert_eq!(distance_km(manhattan, brooklyn), distance_km(brooklyn, manhattan));
}

#[test]
fn test_distance_manhattan_to_brooklyn() {
    // Manhattan to Brooklyn is approximately 5-10 km
    let manhattan = Coordinate::new(40.7580, -73.9855);
    let brooklyn = Coordinate::new(40.6782, -73.9442);

    let distance = distance_km(manhattan, brooklyn);
    assert!(distance > 5.0 && distance < 15.0);
}

#[test]
fn test_coordinate_validation_bounds() {
    assert!(is_valid_coordinate(0.0, 0.0));
    assert!(is_valid_coordinate(90.0, 180.0));
    assert!(is_valid_coordinate(-90.0, -180.0));
    assert!(!is_valid_coordinate(91.0, 0.0));
    assert!(!is_valid_coordinate(0.0, 181.0));
}

#[test]
fn test_route_deviation_uses_nearest_points() {
    let route = vec![
        Coordinate::new(40.80, -73.96),
        Coordinate::new(40.75, -73.99),
        Coordinate::new(40.70, -74.01),
    ];
    // Pickup sits near the middle route point, delivery near the last one
    let pickup = Coordinate::new(40.751, -73.991);
    let delivery = Coordinate::new(40.701, -74.011);

    let deviation = route_deviation(&route, pickup, delivery).unwrap();
    let expected = distance_km(route[1], pickup) + distance_km(route[2], delivery);

    assert!((deviation.distance_km - expected).abs() < 0.05);
}

#[test]
fn test_route_deviation_time_at_thirty_kmh() {
    let route = vec![Coordinate::new(40.7128, -74.0060)];
    let pickup = Coordinate::new(40.7580, -73.9855);
    let delivery = Coordinate::new(40.6782, -73.9442);

    let deviation = route_deviation(&route, pickup, delivery).unwrap();
    let expected_minutes = deviation.distance_km / 30.0 * 60.0;

    assert!((deviation.minutes - expected_minutes).abs() < 0.01);
}

#[test]
fn test_route_deviation_none_without_route() {
    let pickup = Coordinate::new(40.7128, -74.0060);
    let delivery = Coordinate::new(40.7580, -73.9855);

    assert!(route_deviation(&[], pickup, delivery).is_none());
}

#[test]
fn test_window_overlap_full_coverage() {
    let ratio = window_overlap_ratio(daily(8, 18), window(9, 12));
    assert!((ratio - 1.0).abs() < 1e-9);
}

#[test]
fn test_window_overlap_partial_coverage() {
    // Availability 10-11 covers one of the three window hours
    let ratio = window_overlap_ratio(daily(10, 11), window(9, 12));
    assert!((ratio - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_window_overlap_disjoint_is_zero() {
    assert_eq!(window_overlap_ratio(daily(18, 22), window(9, 12)), 0.0);
}

#[test]
fn test_overnight_availability_yields_zero() {
    // Availability 22:00-06:00 spans midnight and is treated as empty
    assert_eq!(window_overlap_ratio(daily(22, 6), window(9, 12)), 0.0);
}

#[test]
fn test_schedule_compatibility_requires_both_windows() {
    // Covers pickup fully but misses the delivery window entirely
    let score = schedule_compatibility(daily(8, 13), window(9, 12), window(14, 17));
    assert_eq!(score, 0.0);
}

#[test]
fn test_nearby_carrier_passes_filters() {
    let package = create_test_package(Urgency::Low, 10.0);
    let carrier = create_test_carrier(40.7130, -74.0062);

    let eligible = filter_carriers(&package, &[carrier], 5.0);
    assert_eq!(eligible.len(), 1);
    assert!(eligible[0].distance_km < 0.1);
    assert!(eligible[0].schedule_overlap > 0.0);
}

#[test]
fn test_distant_carrier_excluded() {
    let package = create_test_package(Urgency::Low, 10.0);
    let los_angeles = create_test_carrier(34.0522, -118.2437);

    assert!(filter_carriers(&package, &[los_angeles], 10.0).is_empty());
}

#[test]
fn test_carrier_exactly_on_radius_boundary_included() {
    let package = create_test_package(Urgency::Low, 10.0);
    let carrier = create_test_carrier(40.7130, -74.0062);
    let distance = distance_km(carrier.location.unwrap(), package.pickup);

    // radius == distance keeps the carrier; the cut is strictly greater-than
    let eligible = filter_carriers(&package, &[carrier], distance);
    assert_eq!(eligible.len(), 1);
}

#[test]
fn test_heavy_package_excludes_small_vehicle() {
    let mut package = create_test_package(Urgency::Low, 40.0);
    package.dimensions.weight = 40.0;

    let mut bike = create_test_carrier(40.7130, -74.0062);
    bike.capacity = Some(VehicleCapacity {
        length: 60.0,
        width: 40.0,
        height: 40.0,
        weight_limit: 20.0,
    });

    let mut van = create_test_carrier(40.7132, -74.0064);
    van.capacity = Some(VehicleCapacity {
        length: 200.0,
        width: 150.0,
        height: 150.0,
        weight_limit: 50.0,
    });
    let van_id = van.id;

    let eligible = filter_carriers(&package, &[bike, van], 5.0);
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].carrier.id, van_id);
}

#[test]
fn test_night_shift_carrier_excluded_for_daytime_package() {
    let package = create_test_package(Urgency::Low, 10.0);
    let mut carrier = create_test_carrier(40.7130, -74.0062);
    carrier.schedule = Some(daily(19, 23));

    assert!(filter_carriers(&package, &[carrier], 5.0).is_empty());
}

#[test]
fn test_compensation_formula() {
    // base 50 + 5km * 10 + 10kg * 5 + high premium 100 = 250.00
    let package = create_test_package(Urgency::High, 10.0);
    assert_eq!(compensation(&package, 5.0), 250.0);

    let package = create_test_package(Urgency::Medium, 4.0);
    assert_eq!(compensation(&package, 2.0), 140.0);

    let package = create_test_package(Urgency::Low, 1.0);
    assert_eq!(compensation(&package, 0.0), 55.0);
}

#[test]
fn test_platform_fee_rate() {
    assert_eq!(platform_fee(250.0, 0.15), 37.5);
    assert_eq!(platform_fee(100.0, 0.0), 0.0);
}

#[test]
fn test_capacity_fit_zero_when_too_big() {
    let cap = VehicleCapacity {
        length: 50.0,
        width: 50.0,
        height: 50.0,
        weight_limit: 10.0,
    };
    let dims = Dimensions {
        length: 60.0,
        width: 10.0,
        height: 10.0,
        weight: 1.0,
    };

    assert_eq!(capacity_fit_score(&cap, &dims), 0.0);
}

#[test]
fn test_capacity_fit_floor_for_anything_that_fits() {
    let cap = VehicleCapacity::default();
    let tiny = Dimensions {
        length: 1.0,
        width: 1.0,
        height: 1.0,
        weight: 0.1,
    };

    assert!(capacity_fit_score(&cap, &tiny) >= 0.1);
}

#[tokio::test]
async fn test_heuristic_scorer_is_deterministic() {
    let scorer = HeuristicScorer::default();
    let package = create_test_package(Urgency::Medium, 10.0);
    let carrier = create_test_carrier(40.7130, -74.0062);

    let a = scorer.score(&package, &carrier).await.unwrap();
    let b = scorer.score(&package, &carrier).await.unwrap();

    assert_eq!(a.match_score, b.match_score);
    assert_eq!(a.compensation, b.compensation);
    assert_eq!(a.deviation, b.deviation);
}

#[tokio::test]
async fn test_heuristic_score_in_unit_range() {
    let scorer = HeuristicScorer::default();
    let package = create_test_package(Urgency::High, 45.0);

    for (lat, lon) in [(40.7130, -74.0062), (40.75, -73.99), (40.80, -73.95)] {
        let carrier = create_test_carrier(lat, lon);
        let estimate = scorer.score(&package, &carrier).await.unwrap();
        assert!((0.0..=1.0).contains(&estimate.match_score));
        assert!(estimate.compensation > 0.0);
    }
}

fn scored(id: u128, score: f64, rating: f64) -> ScoredCandidate {
    ScoredCandidate {
        carrier_id: Uuid::from_u128(id),
        match_score: score,
        compensation: 100.0,
        deviation: RouteDeviation {
            distance_km: 1.0,
            minutes: 2.0,
        },
        schedule_overlap: 1.0,
        carrier_rating: rating,
    }
}

#[test]
fn test_ranking_is_a_total_order() {
    let candidates = vec![
        scored(3, 0.7, 4.0),
        scored(1, 0.7, 4.0),
        scored(2, 0.7, 4.5),
        scored(4, 0.9, 3.0),
    ];

    let ranked = rank(candidates, 10);

    // score desc, then rating desc, then id asc
    assert_eq!(ranked[0].carrier_id, Uuid::from_u128(4));
    assert_eq!(ranked[1].carrier_id, Uuid::from_u128(2));
    assert_eq!(ranked[2].carrier_id, Uuid::from_u128(1));
    assert_eq!(ranked[3].carrier_id, Uuid::from_u128(3));
}

#[test]
fn test_ranking_truncates() {
    let candidates: Vec<_> = (0..20).map(|i| scored(i, i as f64 / 20.0, 3.0)).collect();
    let ranked = rank(candidates, 5);

    assert_eq!(ranked.len(), 5);
    assert_eq!(ranked[0].carrier_id, Uuid::from_u128(19));
}

#[test]
fn test_ranking_stable_across_input_order() {
    let forward = vec![scored(1, 0.5, 3.0), scored(2, 0.8, 4.0), scored(3, 0.6, 3.5)];
    let mut reversed = forward.clone();
    reversed.reverse();

    let a: Vec<Uuid> = rank(forward, 10).iter().map(|c| c.carrier_id).collect();
    let b: Vec<Uuid> = rank(reversed, 10).iter().map(|c| c.carrier_id).collect();

    assert_eq!(a, b);
}
