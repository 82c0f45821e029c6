//! Space view abstraction - base trait for the dashboard views

use gd_core::ViewEvent;
use uuid::Uuid;

/// Unique identifier for a space view
pub type SpaceViewId = Uuid;

/// Base trait for all dashboard views
pub trait SpaceView: Send + Sync {
    /// Get the unique ID of this view
    fn id(&self) -> SpaceViewId;

    /// Get the title of this view
    fn title(&self) -> &str;

    /// Get the view type
    fn view_type(&self) -> &str;

    /// Take the events queued since the last call
    fn drain_events(&mut self) -> Vec<ViewEvent>;
}
