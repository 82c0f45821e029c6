//! Dashboard settings

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::query::{PageSizeOptions, SortSpec};

/// What happens to the selection when an applied page no longer contains it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionRetention {
    /// Keep the selection even if it is not on the current page
    #[default]
    Keep,
    /// Clear the selection when a newly applied page does not contain it
    ClearWhenAbsent,
}

/// Settings for the query state manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub page_sizes: Vec<usize>,
    pub default_page_size: usize,
    pub default_sort: SortSpec,
}

impl Default for QuerySettings {
    fn default() -> Self {
        let options = PageSizeOptions::default();
        Self {
            page_sizes: options.allowed().to_vec(),
            default_page_size: options.default_size(),
            default_sort: SortSpec::default(),
        }
    }
}

impl QuerySettings {
    pub fn page_size_options(&self) -> anyhow::Result<PageSizeOptions> {
        PageSizeOptions::new(self.page_sizes.clone(), self.default_page_size)
            .context("invalid page size settings")
    }
}

/// Settings for the simulated record source used by the binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Delay added to every query, in milliseconds
    pub simulated_latency_ms: u64,
    /// Number of generated records when no CSV file is given
    pub sample_records: usize,
    /// Seed for the sample generator
    pub seed: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            simulated_latency_ms: 150,
            sample_records: 5000,
            seed: 42,
        }
    }
}

/// Dashboard-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub query: QuerySettings,
    /// Debounce window for parameter changes, in milliseconds
    pub debounce_ms: u64,
    pub selection_retention: SelectionRetention,
    pub source: SourceSettings,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            query: QuerySettings::default(),
            debounce_ms: 300,
            selection_retention: SelectionRetention::Keep,
            source: SourceSettings::default(),
        }
    }
}

impl DashboardSettings {
    /// Parse settings from JSON; missing keys take their defaults
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let settings: Self = serde_json::from_str(json).context("failed to parse dashboard settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.query.page_size_options()?;
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
