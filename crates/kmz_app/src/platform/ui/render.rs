use std::fmt::Write as _;

use kmz_core::{AppViewModel, GeoBounds, LoadState, MapView, NodeKind, TreeRowView};
use kmz_engine::TraversalReport;

/// One line per visible row, numbered by node id so a row can be clicked
/// by typing its number.
pub fn render_tree(view: &AppViewModel) -> String {
    let mut out = String::new();
    for row in &view.rows {
        let _ = writeln!(out, "{}", format_row(row));
    }
    out
}

pub fn render_status(view: &AppViewModel, map: &MapView) -> String {
    let load_label = match view.load {
        LoadState::Empty => "No file",
        LoadState::Loading => "Loading",
        LoadState::Ready => "Ready",
        LoadState::Failed => "Failed",
    };
    let mut status = format!(
        "File: {} | {} | Nodes: {} | Overlays: {}",
        view.file_name.as_deref().unwrap_or("-"),
        load_label,
        view.node_count,
        map.overlays().len()
    );
    match map.fitted() {
        Some(bounds) => {
            let _ = write!(status, " | View: {}", format_bounds(&bounds));
        }
        None => {
            let (lat, lon) = map.center();
            let _ = write!(status, " | View: center {lat:.4},{lon:.4} zoom {}", map.zoom());
        }
    }
    if let Some(notice) = view.notice {
        let _ = write!(status, "\n{notice}");
    }
    status
}

pub fn render_overlays(map: &MapView) -> String {
    let mut out = String::new();
    for overlay in map.overlays() {
        let _ = writeln!(
            out,
            "{} @ {} ({} bytes as data URI)",
            overlay.source,
            format_bounds(&overlay.bounds),
            overlay.data_uri.len()
        );
    }
    out
}

pub fn render_report(label: &str, report: &TraversalReport) -> String {
    let mut out = format!(
        "{label}: followed {}, skipped {}\n",
        report.followed,
        report.skipped.len()
    );
    for skip in &report.skipped {
        let _ = writeln!(out, "  {}: {}", skip.document, skip.reason);
    }
    out
}

/// `S,W .. N,E` with four decimals.
pub fn format_bounds(bounds: &GeoBounds) -> String {
    format!(
        "{:.4},{:.4} .. {:.4},{:.4}",
        bounds.south, bounds.west, bounds.north, bounds.east
    )
}

fn format_row(row: &TreeRowView) -> String {
    let marker = match (row.kind, row.expanded) {
        (NodeKind::Folder, true) => "[-]",
        (NodeKind::Folder, false) => "[+]",
        (NodeKind::Leaf, _) => " * ",
        (NodeKind::Empty, _) => "   ",
    };
    format!(
        "{id:>4} {indent}{marker} {name}",
        id = row.node_id,
        indent = "  ".repeat(row.depth),
        name = row.name
    )
}
