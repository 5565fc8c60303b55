use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Package dimensions in centimeters plus weight in kilograms
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
}

impl Dimensions {
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }
}

/// Vehicle capacity limits in centimeters/kilograms
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VehicleCapacity {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "weightLimit")]
    pub weight_limit: f64,
}

impl VehicleCapacity {
    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }

    pub fn fits(&self, dims: &Dimensions) -> bool {
        dims.length <= self.length
            && dims.width <= self.width
            && dims.height <= self.height
            && dims.weight <= self.weight_limit
    }
}

impl Default for VehicleCapacity {
    /// Default capacity used when a carrier record lacks one (small van)
    fn default() -> Self {
        Self {
            length: 200.0,
            width: 150.0,
            height: 150.0,
            weight_limit: 50.0,
        }
    }
}

/// An absolute time window (e.g. a package's pickup window)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A recurring time-of-day availability window (e.g. a carrier's schedule)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DailyWindow {
    #[serde(rename = "startTime")]
    pub start: NaiveTime,
    #[serde(rename = "endTime")]
    pub end: NaiveTime,
}

impl Default for DailyWindow {
    /// Default carrier availability used when a schedule is missing upstream
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }
}

/// Package urgency tier, drives the compensation premium
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
}

impl Urgency {
    /// Premium added on top of base compensation
    pub fn premium(&self) -> f64 {
        match self {
            Urgency::High => 100.0,
            Urgency::Medium => 50.0,
            Urgency::Low => 0.0,
        }
    }
}

/// Package lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Pending,
    Matched,
    PickupReady,
    InTransit,
    Delivered,
    Cancelled,
    Returned,
}

/// A shipment awaiting transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    #[serde(rename = "pickupCoordinates")]
    pub pickup: Coordinate,
    #[serde(rename = "deliveryCoordinates")]
    pub delivery: Coordinate,
    #[serde(rename = "pickupWindow")]
    pub pickup_window: TimeWindow,
    #[serde(rename = "deliveryWindow")]
    pub delivery_window: TimeWindow,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub urgency: Urgency,
    pub status: PackageStatus,
    #[serde(default)]
    pub matched: bool,
    #[serde(rename = "matchedAt", default)]
    pub matched_at: Option<DateTime<Utc>>,
    #[serde(rename = "requiresSignature", default)]
    pub requires_signature: bool,
}

/// A transport provider with current state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Carrier {
    pub id: Uuid,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(rename = "lastLocation", default)]
    pub location: Option<Coordinate>,
    #[serde(rename = "routeCoordinates", default)]
    pub route: Vec<Coordinate>,
    #[serde(rename = "vehicleCapacity", default)]
    pub capacity: Option<VehicleCapacity>,
    #[serde(default)]
    pub schedule: Option<DailyWindow>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(rename = "onTimeRate", default)]
    pub on_time_rate: Option<f64>,
    #[serde(rename = "completedDeliveries", default)]
    pub completed_deliveries: u32,
}

impl Carrier {
    /// Capacity with the documented default substituted when absent upstream
    pub fn capacity(&self) -> VehicleCapacity {
        self.capacity.unwrap_or_default()
    }

    /// Schedule with the documented 08:00-18:00 default substituted
    pub fn schedule(&self) -> DailyWindow {
        self.schedule.unwrap_or_default()
    }

    /// Rating on a 0-5 scale, 0 when unrated
    pub fn rating(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    /// On-time delivery rate in [0,1], 0 when unknown
    pub fn on_time_rate(&self) -> f64 {
        self.on_time_rate.unwrap_or(0.0)
    }

    /// Planned route, falling back to the last known location as a
    /// single-point route so location-only carriers stay scorable
    pub fn effective_route(&self) -> Vec<Coordinate> {
        if !self.route.is_empty() {
            self.route.clone()
        } else if let Some(loc) = self.location {
            vec![loc]
        } else {
            vec![]
        }
    }
}

fn default_true() -> bool {
    true
}

/// Extra distance/time a carrier must travel to service a package
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteDeviation {
    #[serde(rename = "distance")]
    pub distance_km: f64,
    #[serde(rename = "time")]
    pub minutes: f64,
}

/// Output of a ScoreProvider for one package/carrier pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchEstimate {
    #[serde(rename = "matchScore")]
    pub match_score: f64,
    pub compensation: f64,
    #[serde(rename = "routeDeviation")]
    pub deviation: RouteDeviation,
}

/// A scored, filter-eligible carrier for one package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(rename = "carrierId")]
    pub carrier_id: Uuid,
    #[serde(rename = "matchScore")]
    pub match_score: f64,
    pub compensation: f64,
    #[serde(rename = "routeDeviation")]
    pub deviation: RouteDeviation,
    #[serde(rename = "scheduleOverlap")]
    pub schedule_overlap: f64,
    #[serde(rename = "carrierRating")]
    pub carrier_rating: f64,
}

/// Match offer lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
    Completed,
}

impl MatchStatus {
    /// A match still blocking the package from being re-offered
    pub fn is_active(&self) -> bool {
        matches!(self, MatchStatus::Pending | MatchStatus::Accepted)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// A proposed or resolved package/carrier pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    #[serde(rename = "packageId")]
    pub package_id: Uuid,
    #[serde(rename = "carrierId")]
    pub carrier_id: Uuid,
    pub score: f64,
    #[serde(rename = "deviationKm")]
    pub deviation_km: f64,
    #[serde(rename = "deviationMinutes")]
    pub deviation_minutes: f64,
    pub payout: f64,
    #[serde(rename = "platformFee")]
    pub platform_fee: f64,
    pub status: MatchStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
    #[serde(rename = "respondedAt", default)]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(rename = "pickupCode")]
    pub pickup_code: String,
    #[serde(rename = "deliveryCode")]
    pub delivery_code: String,
}

impl Match {
    /// An expired pending offer is inert: it no longer blocks a fresh match
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == MatchStatus::Pending && now >= self.expires_at
    }
}

/// Batch run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Running,
    Completed,
    Failed,
}

/// One orchestrator run over the unmatched backlog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoMatchBatch {
    pub id: Uuid,
    pub status: BatchStatus,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "finishedAt", default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(rename = "packagesProcessed")]
    pub packages_processed: u32,
    #[serde(rename = "matchesCreated")]
    pub matches_created: u32,
    #[serde(rename = "unableToMatch", default)]
    pub unable_to_match: Vec<Uuid>,
}
