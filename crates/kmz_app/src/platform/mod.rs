pub mod cli;
pub mod config;
pub mod logging;
pub mod ui;
pub mod viewer;

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use bytes::Bytes;
use kmz_core::{ImageOverlay, NodeKind, TreeNode};
use kmz_engine::{load_kmz, LoadOutcome, TraversalReport};
use kmz_logging::{kmz_error, kmz_info, kmz_warn};
use serde::Serialize;

use cli::{Cli, Command, OutputFormat};
use config::{load_config, ViewerConfig};
use viewer::Viewer;

/// How long a command waits for the engine before giving up.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(120);

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let loaded = load_config(&cli.config);
    let config = loaded.as_ref().cloned().unwrap_or_default();

    let destination = cli.log.unwrap_or(config.log.destination);
    let level = logging::parse_level(cli.log_level.as_deref().unwrap_or(&config.log.level));
    logging::initialize(destination, level);
    if let Err(err) = &loaded {
        kmz_warn!("{:#}; using defaults", err);
    }

    match cli.command {
        Command::Inspect { file, format } => inspect(&config, &file, format),
        Command::Zoom { file, path } => zoom(&config, &file, &path),
        Command::Browse { file } => browse(&config, &file),
        Command::Serve { bind, dir } => serve(&config, bind, dir),
    }
}

fn read_archive(file: &Path) -> anyhow::Result<(String, Bytes)> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    Ok((name, Bytes::from(bytes)))
}

#[derive(Serialize)]
struct InspectJson<'a> {
    file: &'a str,
    root_document: &'a str,
    tree: &'a TreeNode,
    overlays: &'a [ImageOverlay],
    tree_report: &'a TraversalReport,
    map_report: &'a TraversalReport,
}

fn inspect(config: &ViewerConfig, file: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let (name, bytes) = read_archive(file)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let outcome = match runtime.block_on(load_kmz(bytes, &config.load_settings())) {
        Ok(outcome) => outcome,
        Err(err) => {
            kmz_error!("Failed to load {}: {}", name, err);
            bail!("{}", err.notice());
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let json = InspectJson {
                file: &name,
                root_document: &outcome.root_document,
                tree: &outcome.tree,
                overlays: &outcome.overlays,
                tree_report: &outcome.tree_report,
                map_report: &outcome.map_report,
            };
            serde_json::to_writer_pretty(&mut out, &json)?;
            writeln!(out)?;
        }
        OutputFormat::Text => write_outcome(&mut out, &name, &outcome)?,
    }
    Ok(())
}

fn write_outcome(out: &mut impl Write, name: &str, outcome: &LoadOutcome) -> io::Result<()> {
    writeln!(out, "{name} (root document {})", outcome.root_document)?;
    for (depth, node) in outcome.tree.walk() {
        let path = node.path.as_deref().unwrap_or("-");
        writeln!(out, "{}{} [{}]", "  ".repeat(depth), node.name, path)?;
    }
    writeln!(out, "overlays: {}", outcome.overlays.len())?;
    for overlay in &outcome.overlays {
        writeln!(
            out,
            "  {} @ {}",
            overlay.source,
            ui::render::format_bounds(&overlay.bounds)
        )?;
    }
    write!(out, "{}", ui::render::render_report("tree", &outcome.tree_report))?;
    write!(out, "{}", ui::render::render_report("map", &outcome.map_report))?;
    Ok(())
}

fn open_viewer(config: &ViewerConfig, file: &Path) -> anyhow::Result<Viewer> {
    let (name, bytes) = read_archive(file)?;
    let mut viewer = Viewer::new(config.load_settings(), config.map_view())
        .context("failed to start engine")?;
    viewer.open(name, bytes);
    if !viewer.settle(SETTLE_TIMEOUT) {
        bail!("timed out loading {}", file.display());
    }
    if let Some(notice) = viewer.view().notice {
        bail!("{notice}");
    }
    Ok(viewer)
}

fn zoom(config: &ViewerConfig, file: &Path, path: &str) -> anyhow::Result<()> {
    let mut viewer = open_viewer(config, file)?;
    let Some(node_id) = viewer.node_for_path(path) else {
        bail!("no node in the tree links to {path}");
    };
    if viewer.node_kind(node_id) == Some(NodeKind::Folder) {
        bail!("{path} is a folder; only leaf nodes zoom");
    }

    viewer.click(node_id);
    if !viewer.settle(SETTLE_TIMEOUT) {
        bail!("timed out resolving bounds for {path}");
    }
    match viewer.map().fitted() {
        Some(bounds) => println!("{}", ui::render::format_bounds(&bounds)),
        None => println!("No bounds found for {path}"),
    }
    Ok(())
}

fn browse(config: &ViewerConfig, file: &Path) -> anyhow::Result<()> {
    let mut viewer = open_viewer(config, file)?;
    let stdin = io::stdin();
    print_screen(&mut viewer);
    if let Some(reports) = viewer.reports() {
        println!("Root document: {}", reports.root_document);
        print!("{}", ui::render::render_report("tree", &reports.tree));
        print!("{}", ui::render::render_report("map", &reports.map));
    }

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }
        match input.parse() {
            Ok(node_id) => {
                viewer.click(node_id);
                if !viewer.settle(SETTLE_TIMEOUT) {
                    kmz_warn!("Engine did not answer in time");
                }
            }
            Err(_) => println!("Type a row number, or q to quit."),
        }
        if viewer.take_dirty() {
            print_screen(&mut viewer);
        }
    }
    Ok(())
}

fn print_screen(viewer: &mut Viewer) {
    let view = viewer.view();
    println!("{}", ui::render::render_status(&view, viewer.map()));
    print!("{}", ui::render::render_tree(&view));
    print!("{}", ui::render::render_overlays(viewer.map()));
    let _ = io::stdout().flush();
    viewer.take_dirty();
}

fn serve(
    config: &ViewerConfig,
    bind: Option<String>,
    dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut settings = config.upload_settings();
    if let Some(bind) = bind {
        settings.bind = bind;
    }
    if let Some(dir) = dir {
        settings.dir = dir;
    }
    kmz_info!("Starting upload endpoint on {}", settings.bind);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(kmz_engine::serve(&settings))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use kmz_core::{GeoBounds, ImageOverlay, TreeNode};
    use kmz_engine::{LoadOutcome, Skip, SkipReason, TraversalReport};

    use super::write_outcome;

    #[test]
    fn text_outcome_lists_tree_overlays_and_skips() {
        let mut root = TreeNode::root();
        root.children
            .push(TreeNode::linked("Region", "region.kml", Vec::new()));
        let tree_report = TraversalReport {
            followed: 1,
            skipped: vec![Skip {
                document: "doc.kml".into(),
                reason: SkipReason::EntryMissing {
                    path: "gone.kml".into(),
                },
            }],
        };
        let outcome = LoadOutcome {
            root_document: "doc.kml".into(),
            tree: root,
            overlays: vec![ImageOverlay {
                source: "img.png".into(),
                data_uri: String::new(),
                bounds: GeoBounds::new(10.0, 20.0, 15.0, 25.0),
            }],
            tree_report,
            map_report: TraversalReport::default(),
        };

        let mut out = Vec::new();
        write_outcome(&mut out, "alps.kmz", &outcome).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "alps.kmz (root document doc.kml)\n\
             Root [-]\n\
             \x20 Region [region.kml]\n\
             overlays: 1\n\
             \x20 img.png @ 10.0000,20.0000 .. 15.0000,25.0000\n\
             tree: followed 1, skipped 1\n\
             \x20 doc.kml: no archive entry gone.kml\n\
             map: followed 0, skipped 0\n"
        );
    }
}
