//! Spatial view: markers for the current page and camera requests

use gd_core::{Record, RecordId, RecordStatus, ViewEvent};
use tracing::trace;

use crate::{SpaceView, SpaceViewId, ViewerContext};

/// Latitude/longitude box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Smallest box covering all records; `None` for no records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Option<Self> {
        records.into_iter().fold(None, |bounds, record| {
            let (lat, lon) = (record.latitude(), record.longitude());
            Some(match bounds {
                None => GeoBounds {
                    min_lat: lat,
                    max_lat: lat,
                    min_lon: lon,
                    max_lon: lon,
                },
                Some(b) => GeoBounds {
                    min_lat: b.min_lat.min(lat),
                    max_lat: b.max_lat.max(lat),
                    min_lon: b.min_lon.min(lon),
                    max_lon: b.max_lon.max(lon),
                },
            })
        })
    }

    /// Grow the box by `margin` degrees on every side, staying on the globe
    pub fn padded(&self, margin: f64) -> Self {
        Self {
            min_lat: (self.min_lat - margin).max(-90.0),
            max_lat: (self.max_lat + margin).min(90.0),
            min_lon: (self.min_lon - margin).max(-180.0),
            max_lon: (self.max_lon + margin).min(180.0),
        }
    }

    /// (latitude, longitude) of the centre
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&latitude) && (self.min_lon..=self.max_lon).contains(&longitude)
    }
}

/// A map marker for one record on the current page
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: RecordId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: RecordStatus,
    pub selected: bool,
}

/// Something the map widget should do with its camera
#[derive(Debug, Clone, PartialEq)]
pub enum CameraRequest {
    FitBounds(GeoBounds),
    CenterOn { latitude: f64, longitude: f64 },
}

/// Everything needed to draw the map for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialFrame {
    pub markers: Vec<Marker>,
    /// Bounds of the current page, unpadded
    pub bounds: Option<GeoBounds>,
    /// Camera moves requested since the previous frame
    pub requests: Vec<CameraRequest>,
    pub center: (f64, f64),
}

/// Spatial view configuration
#[derive(Debug, Clone)]
pub struct SpatialViewConfig {
    /// Margin added around the page bounds when fitting, in degrees
    pub fit_padding: f64,
    /// Centre before any data is shown
    pub initial_center: (f64, f64),
}

impl Default for SpatialViewConfig {
    fn default() -> Self {
        Self {
            fit_padding: 0.5,
            initial_center: (20.5937, 78.9629),
        }
    }
}

/// Map of the current page
pub struct SpatialView {
    id: SpaceViewId,
    title: String,
    pub config: SpatialViewConfig,

    // Change detection
    last_version: Option<u64>,
    last_selected: Option<RecordId>,

    // Map state
    center: (f64, f64),

    events: Vec<ViewEvent>,
}

impl SpatialView {
    pub fn new(id: SpaceViewId, title: String) -> Self {
        let config = SpatialViewConfig::default();
        Self {
            id,
            title,
            center: config.initial_center,
            config,
            last_version: None,
            last_selected: None,
            events: Vec::new(),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        self.center
    }

    /// Build the frame for the current state.
    ///
    /// A new record set asks the map to fit its bounds; a new selection on
    /// the current page asks it to centre on that record.
    pub fn frame(&mut self, ctx: &ViewerContext) -> SpatialFrame {
        let snapshot = ctx.query_state.read().snapshot();
        let selected = ctx.selection.selected();

        let markers: Vec<Marker> = snapshot
            .records
            .iter()
            .map(|record| Marker {
                id: record.id().clone(),
                name: record.name().to_string(),
                latitude: record.latitude(),
                longitude: record.longitude(),
                status: record.status(),
                selected: selected.as_ref() == Some(record.id()),
            })
            .collect();

        let bounds = GeoBounds::from_records(snapshot.records.iter());
        let mut requests = Vec::new();

        if self.last_version != Some(snapshot.version) {
            self.last_version = Some(snapshot.version);
            if let Some(bounds) = bounds {
                let fitted = bounds.padded(self.config.fit_padding);
                self.center = fitted.center();
                trace!(?fitted, "fitting map to page");
                requests.push(CameraRequest::FitBounds(fitted));
            }
        }

        if self.last_selected != selected {
            self.last_selected = selected.clone();
            let index = snapshot.index();
            if let Some(record) = selected.as_ref().and_then(|id| index.get(id)) {
                self.center = (record.latitude(), record.longitude());
                trace!(id = %record.id(), "centering map on selection");
                requests.push(CameraRequest::CenterOn {
                    latitude: record.latitude(),
                    longitude: record.longitude(),
                });
            }
        }

        SpatialFrame {
            markers,
            bounds,
            requests,
            center: self.center,
        }
    }

    pub fn marker_click(&mut self, id: RecordId) {
        self.events.push(ViewEvent::MarkerClicked(id));
    }
}

impl SpaceView for SpatialView {
    fn id(&self) -> SpaceViewId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn view_type(&self) -> &str {
        "map"
    }

    fn drain_events(&mut self) -> Vec<ViewEvent> {
        std::mem::take(&mut self.events)
    }
}
