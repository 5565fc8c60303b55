use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

use crate::models::{
    AutoMatchBatch, BatchStatus, Carrier, Coordinate, DailyWindow, Dimensions, Match, MatchStatus,
    Package, PackageStatus, TimeWindow, Urgency, VehicleCapacity,
};
use crate::services::store::{FeedbackWrite, MatchStore, StoreError};

/// PostgreSQL adapter for the canonical persistence port
///
/// Package claims are an optimistic check-and-set on the `claimed` column,
/// so two concurrent batch runs can never both win the same package.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { pool })
    }

    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");
        Self::new(url, max_connections.unwrap_or(10), min_connections.unwrap_or(1)).await
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn get_pending_packages(&self, limit: usize) -> Result<Vec<Package>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM packages
            WHERE status = 'pending' AND matched = FALSE
            ORDER BY created_at
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(package_from_row).collect()
    }

    async fn get_package(&self, id: Uuid) -> Result<Package, StoreError> {
        let row = sqlx::query("SELECT * FROM packages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("package {}", id)))?;

        package_from_row(&row)
    }

    async fn get_active_carriers(&self) -> Result<Vec<Carrier>, StoreError> {
        let rows = sqlx::query("SELECT * FROM carriers WHERE active = TRUE")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(carrier_from_row).collect()
    }

    async fn claim_package(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE packages SET claimed = TRUE
            WHERE id = $1 AND claimed = FALSE AND matched = FALSE
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_package(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE packages SET claimed = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_match(&self, m: &Match) -> Result<Uuid, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO matches (
                id, package_id, carrier_id, score, deviation_km, deviation_minutes,
                payout, platform_fee, status, created_at, expires_at, responded_at,
                pickup_code, delivery_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(m.id)
        .bind(m.package_id)
        .bind(m.carrier_id)
        .bind(m.score)
        .bind(m.deviation_km)
        .bind(m.deviation_minutes)
        .bind(m.payout)
        .bind(m.platform_fee)
        .bind(match_status_str(m.status))
        .bind(m.created_at)
        .bind(m.expires_at)
        .bind(m.responded_at)
        .bind(&m.pickup_code)
        .bind(&m.delivery_code)
        .execute(&self.pool)
        .await?;

        Ok(m.id)
    }

    async fn get_match(&self, id: Uuid) -> Result<Match, StoreError> {
        let row = sqlx::query("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("match {}", id)))?;

        match_from_row(&row)
    }

    async fn update_match_status(
        &self,
        id: Uuid,
        status: MatchStatus,
        responded_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE matches
            SET status = $2, responded_at = COALESCE($3, responded_at)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(match_status_str(status))
        .bind(responded_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("match {}", id)));
        }

        // A rejected/expired/cancelled last offer returns the package to
        // the backlog; a completed match does not
        if status.is_terminal() && status != MatchStatus::Completed {
            sqlx::query(
                r#"
                UPDATE packages
                SET matched = FALSE, matched_at = NULL
                WHERE id = (SELECT package_id FROM matches WHERE id = $1)
                  AND status = 'pending'
                  AND matched = TRUE
                  AND NOT EXISTS (
                      SELECT 1 FROM matches m
                      WHERE m.package_id = packages.id
                        AND (m.status = 'accepted'
                             OR (m.status = 'pending' AND m.expires_at > NOW()))
                  )
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn expire_stale_matches(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let expired = sqlx::query(
            r#"
            UPDATE matches SET status = 'expired'
            WHERE status = 'pending' AND expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if expired > 0 {
            sqlx::query(
                r#"
                UPDATE packages
                SET matched = FALSE, matched_at = NULL
                WHERE matched = TRUE
                  AND status = 'pending'
                  AND NOT EXISTS (
                      SELECT 1 FROM matches m
                      WHERE m.package_id = packages.id
                        AND (m.status = 'accepted'
                             OR (m.status = 'pending' AND m.expires_at > $1))
                  )
                "#,
            )
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(expired)
    }

    async fn mark_package_matched(&self, id: Uuid, matched_at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE packages
            SET matched = TRUE, matched_at = $2, claimed = FALSE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(matched_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("package {}", id)));
        }
        Ok(())
    }

    async fn record_feedback(
        &self,
        match_id: Uuid,
        success: bool,
        feedback: &str,
        rating: Option<f64>,
    ) -> Result<FeedbackWrite, StoreError> {
        let insert = sqlx::query(
            r#"
            INSERT INTO match_feedback (match_id, success, feedback, rating, recorded_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (match_id) DO NOTHING
            "#,
        )
        .bind(match_id)
        .bind(success)
        .bind(feedback)
        .bind(rating)
        .execute(&self.pool)
        .await?;

        let inserted = insert.rows_affected() == 1;
        if !inserted {
            sqlx::query(
                r#"
                UPDATE match_feedback
                SET success = $2, feedback = $3, rating = $4, recorded_at = NOW()
                WHERE match_id = $1
                "#,
            )
            .bind(match_id)
            .bind(success)
            .bind(feedback)
            .bind(rating)
            .execute(&self.pool)
            .await?;
        }

        let row = sqlx::query("SELECT COUNT(*) AS total FROM match_feedback")
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.get("total");

        Ok(FeedbackWrite {
            total: total as u64,
            inserted,
        })
    }

    async fn save_batch(&self, batch: &AutoMatchBatch) -> Result<(), StoreError> {
        let unable = serde_json::to_value(&batch.unable_to_match)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO auto_match_batches (
                id, status, started_at, finished_at,
                packages_processed, matches_created, unable_to_match
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id)
            DO UPDATE SET
                status = EXCLUDED.status,
                finished_at = EXCLUDED.finished_at,
                packages_processed = EXCLUDED.packages_processed,
                matches_created = EXCLUDED.matches_created,
                unable_to_match = EXCLUDED.unable_to_match
            "#,
        )
        .bind(batch.id)
        .bind(batch_status_str(batch.status))
        .bind(batch.started_at)
        .bind(batch.finished_at)
        .bind(batch.packages_processed as i32)
        .bind(batch.matches_created as i32)
        .bind(unable)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn package_from_row(row: &PgRow) -> Result<Package, StoreError> {
    Ok(Package {
        id: row.get("id"),
        pickup: Coordinate::new(row.get("pickup_lat"), row.get("pickup_lon")),
        delivery: Coordinate::new(row.get("delivery_lat"), row.get("delivery_lon")),
        pickup_window: TimeWindow {
            start: row.get("pickup_start"),
            end: row.get("pickup_end"),
        },
        delivery_window: TimeWindow {
            start: row.get("delivery_start"),
            end: row.get("delivery_end"),
        },
        dimensions: Dimensions {
            length: row.get("length"),
            width: row.get("width"),
            height: row.get("height"),
            weight: row.get("weight"),
        },
        urgency: parse_urgency(row.get("urgency"))?,
        status: parse_package_status(row.get("status"))?,
        matched: row.get("matched"),
        matched_at: row.get("matched_at"),
        requires_signature: row.get("requires_signature"),
    })
}

fn carrier_from_row(row: &PgRow) -> Result<Carrier, StoreError> {
    let last_lat: Option<f64> = row.get("last_lat");
    let last_lon: Option<f64> = row.get("last_lon");
    let location = match (last_lat, last_lon) {
        (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
        _ => None,
    };

    let route_json: Option<serde_json::Value> = row.get("route");
    let route: Vec<Coordinate> = match route_json {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| StoreError::Database(format!("bad route json: {}", e)))?,
        None => vec![],
    };

    let cap_weight_limit: Option<f64> = row.get("cap_weight_limit");
    let capacity = cap_weight_limit.map(|weight_limit| VehicleCapacity {
        length: row.get::<Option<f64>, _>("cap_length").unwrap_or(0.0),
        width: row.get::<Option<f64>, _>("cap_width").unwrap_or(0.0),
        height: row.get::<Option<f64>, _>("cap_height").unwrap_or(0.0),
        weight_limit,
    });

    let schedule_start: Option<NaiveTime> = row.get("schedule_start");
    let schedule_end: Option<NaiveTime> = row.get("schedule_end");
    let schedule = match (schedule_start, schedule_end) {
        (Some(start), Some(end)) => Some(DailyWindow { start, end }),
        _ => None,
    };

    Ok(Carrier {
        id: row.get("id"),
        active: row.get("active"),
        location,
        route,
        capacity,
        schedule,
        rating: row.get("rating"),
        on_time_rate: row.get("on_time_rate"),
        completed_deliveries: row.get::<i32, _>("completed_deliveries") as u32,
    })
}

fn match_from_row(row: &PgRow) -> Result<Match, StoreError> {
    Ok(Match {
        id: row.get("id"),
        package_id: row.get("package_id"),
        carrier_id: row.get("carrier_id"),
        score: row.get("score"),
        deviation_km: row.get("deviation_km"),
        deviation_minutes: row.get("deviation_minutes"),
        payout: row.get("payout"),
        platform_fee: row.get("platform_fee"),
        status: parse_match_status(row.get("status"))?,
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        responded_at: row.get("responded_at"),
        pickup_code: row.get("pickup_code"),
        delivery_code: row.get("delivery_code"),
    })
}

fn match_status_str(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Pending => "pending",
        MatchStatus::Accepted => "accepted",
        MatchStatus::Rejected => "rejected",
        MatchStatus::Expired => "expired",
        MatchStatus::Cancelled => "cancelled",
        MatchStatus::Completed => "completed",
    }
}

fn parse_match_status(value: &str) -> Result<MatchStatus, StoreError> {
    match value {
        "pending" => Ok(MatchStatus::Pending),
        "accepted" => Ok(MatchStatus::Accepted),
        "rejected" => Ok(MatchStatus::Rejected),
        "expired" => Ok(MatchStatus::Expired),
        "cancelled" => Ok(MatchStatus::Cancelled),
        "completed" => Ok(MatchStatus::Completed),
        other => Err(StoreError::Database(format!("unknown match status {}", other))),
    }
}

fn parse_package_status(value: &str) -> Result<PackageStatus, StoreError> {
    match value {
        "pending" => Ok(PackageStatus::Pending),
        "matched" => Ok(PackageStatus::Matched),
        "pickup_ready" => Ok(PackageStatus::PickupReady),
        "in_transit" => Ok(PackageStatus::InTransit),
        "delivered" => Ok(PackageStatus::Delivered),
        "cancelled" => Ok(PackageStatus::Cancelled),
        "returned" => Ok(PackageStatus::Returned),
        other => Err(StoreError::Database(format!("unknown package status {}", other))),
    }
}

fn parse_urgency(value: &str) -> Result<Urgency, StoreError> {
    match value {
        "low" => Ok(Urgency::Low),
        "medium" => Ok(Urgency::Medium),
        "high" => Ok(Urgency::High),
        other => Err(StoreError::Database(format!("unknown urgency {}", other))),
    }
}

fn batch_status_str(status: BatchStatus) -> &'static str {
    match status {
        BatchStatus::Running => "running",
        BatchStatus::Completed => "completed",
        BatchStatus::Failed => "failed",
    }
}
