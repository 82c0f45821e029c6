//! View models for the geo dashboard
//!
//! Both views read the shared query state and selection through a
//! `ViewerContext` and report user actions as `ViewEvent`s. They never talk
//! to each other directly.

mod list_view;
mod space_view;
mod spatial_view;

pub use list_view::{ColumnHeader, ListBody, ListFrame, ListRow, ListView, PaginationState, TableConfig};
pub use space_view::{SpaceView, SpaceViewId};
pub use spatial_view::{CameraRequest, GeoBounds, Marker, SpatialFrame, SpatialView, SpatialViewConfig};

use std::sync::Arc;
use parking_lot::RwLock;
use gd_core::{Orchestrator, QueryStateManager, SelectionCoordinator};

/// Shared state handed to views when they build a frame
#[derive(Clone)]
pub struct ViewerContext {
    /// Current page, parameters and loading state
    pub query_state: Arc<RwLock<QueryStateManager>>,

    /// The single selected record
    pub selection: Arc<SelectionCoordinator>,
}

impl ViewerContext {
    pub fn new(query_state: Arc<RwLock<QueryStateManager>>, selection: Arc<SelectionCoordinator>) -> Self {
        Self { query_state, selection }
    }

    /// Context reading from an orchestrator's state
    pub fn from_orchestrator(orchestrator: &Orchestrator) -> Self {
        Self::new(orchestrator.query_state(), orchestrator.selection())
    }
}
