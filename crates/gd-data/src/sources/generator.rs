//! Deterministic sample data

use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use gd_core::{Record, RecordStatus};

use crate::DataError;

/// City anchors the generated sites are scattered around
const CITIES: &[(&str, f64, f64)] = &[
    ("Delhi", 28.6139, 77.2090),
    ("Mumbai", 19.0760, 72.8777),
    ("Bengaluru", 12.9716, 77.5946),
    ("Chennai", 13.0827, 80.2707),
    ("Kolkata", 22.5726, 88.3639),
    ("Hyderabad", 17.3850, 78.4867),
    ("Pune", 18.5204, 73.8567),
    ("Ahmedabad", 23.0225, 72.5714),
    ("Jaipur", 26.9124, 75.7873),
    ("Lucknow", 26.8467, 80.9462),
];

/// Widest useful spread, in degrees
const MAX_SPREAD: f64 = 180.0;

const KINDS: &[&str] = &["Site", "Depot", "Substation", "Warehouse", "Tower"];

/// Generates reproducible records for demos and tests
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    seed: u64,
    /// Maximum distance from the city centre, in degrees
    spread: f64,
}

impl SampleGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed, spread: 0.25 }
    }

    /// Set the maximum distance from the city centre. Non-finite values
    /// keep the current spread; anything wider than the globe is capped.
    pub fn with_spread(mut self, spread: f64) -> Self {
        if spread.is_finite() {
            self.spread = spread.abs().min(MAX_SPREAD);
        } else {
            warn!(spread, "ignoring non-finite sample spread");
        }
        self
    }

    /// Generate `count` records; the same seed always yields the same records
    pub fn generate(&self, count: usize) -> Result<Vec<Record>, DataError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let base_time = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let (city, lat, lon) = CITIES[i % CITIES.len()];
            let kind = KINDS[rng.gen_range(0..KINDS.len())];
            let status = RecordStatus::ALL[rng.gen_range(0..RecordStatus::ALL.len())];

            let latitude = (lat + rng.gen_range(-self.spread..=self.spread)).clamp(-90.0, 90.0);
            let longitude = (lon + rng.gen_range(-self.spread..=self.spread)).clamp(-180.0, 180.0);
            let last_updated = base_time + Duration::minutes(rng.gen_range(0..525_600));

            let progress = match status {
                RecordStatus::Completed => 100.0,
                RecordStatus::Pending => 0.0,
                _ => (rng.gen_range(0.0..100.0_f64) * 10.0).round() / 10.0,
            };
            let budget = (rng.gen_range(50_000.0..5_000_000.0_f64) * 100.0).round() / 100.0;

            let record = Record::new(
                format!("REC-{:05}", i + 1),
                format!("{} {} {:04}", city, kind, i + 1),
                latitude,
                longitude,
                status,
                last_updated,
            )
            .and_then(|r| r.with_budget(budget))
            .and_then(|r| r.with_progress(progress))
            .map_err(|source| DataError::InvalidRecord {
                line: i as u64 + 1,
                source,
            })?
            .with_description(format!("{} {} near {}", status, kind.to_lowercase(), city));

            records.push(record);
        }

        debug!(count, seed = self.seed, "generated sample records");
        Ok(records)
    }
}
