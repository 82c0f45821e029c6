//! Plain-text rendering of view frames

use std::fmt::Write;

use gd_core::{SortDirection, SortField, StatusFilter};
use gd_views::{CameraRequest, ListBody, ListFrame, ListRow, SpatialFrame};

const NAME_WIDTH: usize = 32;

/// Render the list frame as a table with a pagination footer
pub fn list(frame: &ListFrame) -> String {
    let mut out = String::new();

    let _ = write!(out, "{:>6}  {:<12}", "#", "ID");
    for column in &frame.columns {
        let marker = match column.sort {
            Some(SortDirection::Ascending) => " ^",
            Some(SortDirection::Descending) => " v",
            None => "",
        };
        let label = format!("{}{}", column.label, marker);
        let _ = write!(out, "  {:<width$}", label, width = column_width(column.field));
    }
    out.push('\n');

    match &frame.body {
        ListBody::Loading => out.push_str("  loading...\n"),
        ListBody::Error(message) => {
            let _ = writeln!(out, "  failed to load records: {}", message);
        }
        ListBody::NoRecords => out.push_str("  no records match the current filter\n"),
        ListBody::Rows(rows) => {
            for row in rows {
                out.push_str(&row_line(row, frame));
                out.push('\n');
            }
        }
    }

    if let Some(error) = &frame.error {
        let _ = writeln!(out, "  ! last query failed: {}", error);
    }

    let pagination = &frame.pagination;
    let _ = write!(
        out,
        "page {}/{}  {}  size {} {:?}",
        pagination.page,
        pagination.page_count.max(1),
        pagination.summary(),
        pagination.page_size,
        pagination.page_sizes,
    );
    if !frame.filter.is_empty() {
        let _ = write!(out, "  filter \"{}\"", frame.filter.name_contains);
        if let StatusFilter::Only(status) = frame.filter.status {
            let _ = write!(out, " status {}", status);
        }
    }
    if (pagination.requested_page, pagination.requested_page_size) != (pagination.page, pagination.page_size) {
        let _ = write!(
            out,
            "  -> page {} size {}",
            pagination.requested_page, pagination.requested_page_size
        );
    }
    if frame.is_loading {
        out.push_str("  (loading)");
    }
    out.push('\n');

    out
}

fn row_line(row: &ListRow, frame: &ListFrame) -> String {
    let mut line = format!(
        "{}{:>5}  {:<12}",
        if row.selected { '>' } else { ' ' },
        row.row_number,
        row.id
    );
    for column in &frame.columns {
        let width = column_width(column.field);
        let cell = match column.field {
            SortField::Id => row.id.to_string(),
            SortField::Name => truncate(&row.name, NAME_WIDTH),
            SortField::Status => row.status.to_string(),
            SortField::Latitude => format!("{:.4}", row.latitude),
            SortField::Longitude => format!("{:.4}", row.longitude),
            SortField::LastUpdated => row.last_updated.clone(),
            SortField::Budget => optional(row.budget, 0),
            SortField::Progress => optional(row.progress, 1),
        };
        let _ = write!(line, "  {:<width$}", cell, width = width);
    }
    line.trim_end().to_string()
}

/// Render the spatial frame as a marker summary
pub fn map(frame: &SpatialFrame) -> String {
    let mut out = String::new();

    let _ = write!(
        out,
        "map: {} markers, centre {:.3}, {:.3}",
        frame.markers.len(),
        frame.center.0,
        frame.center.1
    );
    match frame.bounds {
        Some(bounds) => {
            let _ = writeln!(
                out,
                ", bounds lat {:.3}..{:.3} lon {:.3}..{:.3}",
                bounds.min_lat, bounds.max_lat, bounds.min_lon, bounds.max_lon
            );
        }
        None => out.push_str(", nothing to show\n"),
    }

    for request in &frame.requests {
        match request {
            CameraRequest::FitBounds(_) => out.push_str("  camera: fit page bounds\n"),
            CameraRequest::CenterOn {
                latitude,
                longitude,
            } => {
                let _ = writeln!(out, "  camera: centre on {:.4}, {:.4}", latitude, longitude);
            }
        }
    }

    if let Some(marker) = frame.markers.iter().find(|m| m.selected) {
        let _ = writeln!(
            out,
            "  selected: {} {} ({}) at {:.4}, {:.4}",
            marker.id, marker.name, marker.status, marker.latitude, marker.longitude
        );
    }

    out
}

fn column_width(field: SortField) -> usize {
    match field {
        SortField::Name => NAME_WIDTH,
        SortField::LastUpdated => 16,
        SortField::Id => 12,
        _ => 10,
    }
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width - 1).collect();
        short.push('~');
        short
    }
}
