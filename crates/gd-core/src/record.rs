//! Geographically located records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, unique record identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Lifecycle status of a record. Declaration order is the sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordStatus {
    Active,
    Completed,
    Pending,
    OnHold,
}

impl RecordStatus {
    /// All statuses in display order
    pub const ALL: [RecordStatus; 4] = [
        RecordStatus::Active,
        RecordStatus::Completed,
        RecordStatus::Pending,
        RecordStatus::OnHold,
    ];

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Active => "Active",
            RecordStatus::Completed => "Completed",
            RecordStatus::Pending => "Pending",
            RecordStatus::OnHold => "On Hold",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for RecordStatus {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "active" => Ok(RecordStatus::Active),
            "completed" => Ok(RecordStatus::Completed),
            "pending" => Ok(RecordStatus::Pending),
            "onhold" => Ok(RecordStatus::OnHold),
            _ => Err(RecordError::UnknownStatus(s.to_string())),
        }
    }
}

/// Errors raised while constructing a record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("record id must not be empty")]
    EmptyId,

    #[error("latitude {0} is outside -90..=90")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside -180..=180")]
    LongitudeOutOfRange(f64),

    #[error("progress {0} is outside 0..=100")]
    ProgressOutOfRange(f64),

    #[error("budget {0} is not a finite number")]
    InvalidBudget(f64),

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Optional free-form attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordAttributes {
    pub description: Option<String>,
    pub budget: Option<f64>,
    pub progress: Option<f64>,
}

/// A single geographically located entity.
///
/// Records are immutable once built: every field is private and the
/// `with_*` builders consume the value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    name: String,
    latitude: f64,
    longitude: f64,
    status: RecordStatus,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    attributes: RecordAttributes,
}

impl Record {
    /// Create a new record, validating its coordinates
    pub fn new(
        id: impl Into<RecordId>,
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        status: RecordStatus,
        last_updated: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        let id = id.into();
        if id.as_str().trim().is_empty() {
            return Err(RecordError::EmptyId);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(RecordError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(RecordError::LongitudeOutOfRange(longitude));
        }

        Ok(Self {
            id,
            name: name.into(),
            latitude,
            longitude,
            status,
            last_updated,
            attributes: RecordAttributes::default(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.attributes.description = Some(description.into());
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Result<Self, RecordError> {
        if !budget.is_finite() {
            return Err(RecordError::InvalidBudget(budget));
        }
        self.attributes.budget = Some(budget);
        Ok(self)
    }

    pub fn with_progress(mut self, progress: f64) -> Result<Self, RecordError> {
        if !(0.0..=100.0).contains(&progress) {
            return Err(RecordError::ProgressOutOfRange(progress));
        }
        self.attributes.progress = Some(progress);
        Ok(self)
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn attributes(&self) -> &RecordAttributes {
        &self.attributes
    }

    pub fn description(&self) -> Option<&str> {
        self.attributes.description.as_deref()
    }

    pub fn budget(&self) -> Option<f64> {
        self.attributes.budget
    }

    pub fn progress(&self) -> Option<f64> {
        self.attributes.progress
    }
}
