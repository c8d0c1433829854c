//! Drives the presenter state machine: dispatches messages, runs the
//! resulting effects against the map and the engine, and turns engine
//! completions back into messages.

use std::io;
use std::time::{Duration, Instant};

use bytes::Bytes;
use kmz_core::{
    update, AppState, AppViewModel, Effect, Generation, MapSink, MapView, Msg, NodeId, NodeKind,
};
use kmz_engine::{EngineEvent, EngineHandle, LoadOutcome, LoadSettings, TraversalReport};
use kmz_logging::{kmz_debug, kmz_error, kmz_info};

/// Skip reports of the most recent successful load.
#[derive(Debug, Clone, Default)]
pub struct LoadReports {
    pub root_document: String,
    pub tree: TraversalReport,
    pub map: TraversalReport,
}

pub struct Viewer {
    state: AppState,
    engine: EngineHandle,
    map: MapView,
    archive: Option<Bytes>,
    in_flight: usize,
    reports: Option<LoadReports>,
}

impl Viewer {
    pub fn new(settings: LoadSettings, map: MapView) -> io::Result<Self> {
        Ok(Self {
            state: AppState::new(),
            engine: EngineHandle::new(settings)?,
            map,
            archive: None,
            in_flight: 0,
            reports: None,
        })
    }

    /// Choose a new archive. Work still running for a previous file is
    /// left to finish and then ignored.
    pub fn open(&mut self, file_name: impl Into<String>, bytes: Bytes) {
        self.archive = Some(bytes);
        self.reports = None;
        self.dispatch(Msg::FileChosen {
            file_name: file_name.into(),
        });
    }

    pub fn click(&mut self, node_id: NodeId) {
        self.dispatch(Msg::NodeClicked { node_id });
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// True when the last dispatch changed what should be shown.
    pub fn take_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn reports(&self) -> Option<&LoadReports> {
        self.reports.as_ref()
    }

    pub fn node_for_path(&self, path: &str) -> Option<NodeId> {
        self.state.node_for_path(path)
    }

    pub fn node_kind(&self, node_id: NodeId) -> Option<NodeKind> {
        self.state.node_kind(node_id)
    }

    /// Apply engine completions until nothing is outstanding or `timeout`
    /// passes. Returns whether the viewer went idle.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.engine.recv_timeout(remaining) {
                Some(event) => self.handle_event(event),
                None => return false,
            }
        }
        true
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.run_effects(effects);
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ClearMap => self.map.clear_overlays(),
                Effect::LoadArchive { generation } => {
                    if let Some(bytes) = self.archive.clone() {
                        kmz_info!("LoadArchive generation={} bytes={}", generation, bytes.len());
                        self.in_flight += 1;
                        self.engine.load(generation, bytes);
                    }
                }
                Effect::ShowOverlays { overlays } => {
                    for overlay in overlays {
                        self.map.add_image_overlay(overlay);
                    }
                }
                Effect::ZoomToLeaf { generation, path } => {
                    if let Some(bytes) = self.archive.clone() {
                        kmz_debug!("ZoomToLeaf generation={} path={}", generation, path);
                        self.in_flight += 1;
                        self.engine.zoom(generation, bytes, path);
                    }
                }
                Effect::FitBounds { bounds } => self.map.fit_bounds(bounds),
            }
        }
    }

    fn handle_event(&mut self, event: EngineEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if event.generation() != self.state.generation() {
            kmz_debug!("Dropping stale completion for generation {}", event.generation());
        }
        let msg = match event {
            EngineEvent::ArchiveLoaded { generation, result } => match result {
                Ok(outcome) => self.loaded(generation, outcome),
                Err(err) => {
                    kmz_error!("Load {} failed: {}", generation, err);
                    Msg::LoadFailed {
                        generation,
                        notice: err.notice(),
                    }
                }
            },
            EngineEvent::ZoomResolved {
                generation,
                path,
                bounds,
            } => {
                if bounds.is_none() {
                    kmz_debug!("No bounds for {}", path);
                }
                Msg::ZoomResolved { generation, bounds }
            }
        };
        self.dispatch(msg);
    }

    fn loaded(&mut self, generation: Generation, outcome: LoadOutcome) -> Msg {
        if generation == self.state.generation() {
            log_report("tree", &outcome.tree_report);
            log_report("map", &outcome.map_report);
            self.reports = Some(LoadReports {
                root_document: outcome.root_document,
                tree: outcome.tree_report,
                map: outcome.map_report,
            });
        }
        Msg::ArchiveLoaded {
            generation,
            tree: outcome.tree,
            overlays: outcome.overlays,
        }
    }
}

fn log_report(walk: &str, report: &TraversalReport) {
    if !report.is_clean() {
        kmz_info!(
            "{} walk followed {} links and skipped {}",
            walk,
            report.followed,
            report.skipped.len()
        );
    }
}
