use std::collections::HashSet;

use chrono::Timelike;
use uuid::Uuid;

use crate::core::geo::distance_km;
use crate::models::{Carrier, DailyWindow, Package, TimeWindow};

/// A carrier that passed every hard constraint for one package
#[derive(Debug, Clone)]
pub struct EligibleCarrier {
    pub carrier: Carrier,
    pub distance_km: f64,
    /// min(pickup, delivery) window overlap ratio, carried into scoring
    pub schedule_overlap: f64,
}

/// Overlap between a carrier's daily availability and a package window,
/// as overlapping minutes divided by the package window's duration.
///
/// Time-of-day only; a window whose end-of-day minute is not after its
/// start (including windows spanning midnight) yields 0.
pub fn window_overlap_ratio(availability: DailyWindow, window: TimeWindow) -> f64 {
    let a_start = minutes_of_day(availability.start);
    let a_end = minutes_of_day(availability.end);
    let w_start = window.start.time().num_seconds_from_midnight() as f64 / 60.0;
    let w_end = window.end.time().num_seconds_from_midnight() as f64 / 60.0;

    let window_duration = w_end - w_start;
    if window_duration <= 0.0 || a_end <= a_start {
        return 0.0;
    }

    let overlap_start = a_start.max(w_start);
    let overlap_end = a_end.min(w_end);
    if overlap_end <= overlap_start {
        return 0.0;
    }

    (overlap_end - overlap_start) / window_duration
}

/// Schedule compatibility across both package windows
///
/// A carrier is schedule-eligible when both ratios are positive; the
/// minimum of the two is the compatibility signal.
pub fn schedule_compatibility(
    availability: DailyWindow,
    pickup_window: TimeWindow,
    delivery_window: TimeWindow,
) -> f64 {
    let pickup = window_overlap_ratio(availability, pickup_window);
    let delivery = window_overlap_ratio(availability, delivery_window);
    pickup.min(delivery)
}

/// Apply the hard-constraint stage: radius, capacity, schedule
///
/// Carriers lacking a last known location are excluded, never an error.
/// Duplicates are impossible by construction (carrier id is the filter key).
/// Output ordering is unspecified; this is filtering, not ranking.
pub fn filter_carriers(
    package: &Package,
    carriers: &[Carrier],
    radius_km: f64,
) -> Vec<EligibleCarrier> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut eligible = Vec::new();

    for carrier in carriers {
        if !carrier.active || !seen.insert(carrier.id) {
            continue;
        }

        let location = match carrier.location {
            Some(loc) => loc,
            None => continue,
        };

        let distance = distance_km(location, package.pickup);
        if distance > radius_km {
            continue;
        }

        if !carrier.capacity().fits(&package.dimensions) {
            continue;
        }

        let overlap = schedule_compatibility(
            carrier.schedule(),
            package.pickup_window,
            package.delivery_window,
        );
        if overlap <= 0.0 {
            continue;
        }

        eligible.push(EligibleCarrier {
            carrier: carrier.clone(),
            distance_km: distance,
            schedule_overlap: overlap,
        });
    }

    eligible
}

#[inline]
fn minutes_of_day(time: chrono::NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 / 60.0
}
