// Criterion benchmarks for Courier Algo

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

use courier_algo::core::{distance_km, filter_carriers, rank, route_deviation, HeuristicScorer, ScoreProvider};
use courier_algo::models::{
    Carrier, Coordinate, Dimensions, Package, PackageStatus, RouteDeviation, ScoredCandidate,
    TimeWindow, Urgency,
};

fn create_package() -> Package {
    let start = Utc.with_ymd_and_hms(2026, 8, 23, 9, 0, 0).unwrap();
    Package {
        id: Uuid::from_u128(1),
        pickup: Coordinate::new(40.7128, -74.0060),
        delivery: Coordinate::new(40.7580, -73.9855),
        pickup_window: TimeWindow {
            start,
            end: start + chrono::Duration::hours(3),
        },
        delivery_window: TimeWindow {
            start: start + chrono::Duration::hours(4),
            end: start + chrono::Duration::hours(8),
        },
        dimensions: Dimensions {
            length: 40.0,
            width: 30.0,
            height: 20.0,
            weight: 10.0,
        },
        urgency: Urgency::Medium,
        status: PackageStatus::Pending,
        matched: false,
        matched_at: None,
        requires_signature: false,
    }
}

fn create_carrier(id: usize, lat: f64, lon: f64) -> Carrier {
    Carrier {
        id: Uuid::from_u128(id as u128),
        active: true,
        location: Some(Coordinate::new(lat, lon)),
        route: vec![
            Coordinate::new(lat, lon),
            Coordinate::new(lat + 0.01, lon + 0.01),
            Coordinate::new(lat + 0.02, lon + 0.02),
        ],
        capacity: None,
        schedule: None,
        rating: Some(3.5 + (id % 15) as f64 / 10.0),
        on_time_rate: Some(0.8 + (id % 20) as f64 / 100.0),
        completed_deliveries: (id % 100) as u32,
    }
}

fn create_carrier_pool(count: usize) -> Vec<Carrier> {
    (0..count)
        .map(|i| {
            let lat_offset = (i as f64 * 0.001) % 0.5;
            let lon_offset = (i as f64 * 0.001) % 0.5;
            create_carrier(i, 40.7128 + lat_offset, -74.0060 + lon_offset)
        })
        .collect()
}

fn bench_distance(c: &mut Criterion) {
    c.bench_function("distance_km", |b| {
        b.iter(|| {
            distance_km(
                black_box(Coordinate::new(40.7128, -74.0060)),
                black_box(Coordinate::new(40.7580, -73.9855)),
            )
        });
    });
}

fn bench_route_deviation(c: &mut Criterion) {
    let route: Vec<Coordinate> = (0..20)
        .map(|i| Coordinate::new(40.70 + i as f64 * 0.005, -74.01 + i as f64 * 0.003))
        .collect();
    let pickup = Coordinate::new(40.7128, -74.0060);
    let delivery = Coordinate::new(40.7580, -73.9855);

    c.bench_function("route_deviation_20_points", |b| {
        b.iter(|| route_deviation(black_box(&route), black_box(pickup), black_box(delivery)));
    });
}

fn bench_filtering(c: &mut Criterion) {
    let package = create_package();

    let mut group = c.benchmark_group("filtering");
    for carrier_count in [10, 100, 1000, 5000].iter() {
        let carriers = create_carrier_pool(*carrier_count);

        group.bench_with_input(
            BenchmarkId::new("filter_carriers", carrier_count),
            carrier_count,
            |b, _| {
                b.iter(|| filter_carriers(black_box(&package), black_box(&carriers), black_box(10.0)));
            },
        );
    }
    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let scorer = HeuristicScorer::default();
    let package = create_package();
    let carrier = create_carrier(1, 40.7130, -74.0062);

    c.bench_function("heuristic_score", |b| {
        b.iter(|| rt.block_on(scorer.score(black_box(&package), black_box(&carrier))));
    });
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("ranking");
    for candidate_count in [10, 100, 1000].iter() {
        let candidates: Vec<ScoredCandidate> = (0..*candidate_count)
            .map(|i| ScoredCandidate {
                carrier_id: Uuid::from_u128(i as u128),
                match_score: (i as f64 * 0.37) % 1.0,
                compensation: 100.0,
                deviation: RouteDeviation {
                    distance_km: 2.0,
                    minutes: 4.0,
                },
                schedule_overlap: 1.0,
                carrier_rating: (i as f64 * 0.13) % 5.0,
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("rank_top_5", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| rank(black_box(candidates.clone()), black_box(5)));
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_distance,
    bench_route_deviation,
    bench_filtering,
    bench_scoring,
    bench_ranking
);
criterion_main!(benches);
