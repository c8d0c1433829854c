use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use kmz_core::Generation;
use kmz_logging::{kmz_debug, kmz_warn};

use crate::loader::{load_kmz, resolve_zoom, LoadSettings};
use crate::EngineEvent;

enum EngineCommand {
    Load {
        generation: Generation,
        bytes: Bytes,
    },
    Zoom {
        generation: Generation,
        bytes: Bytes,
        path: String,
    },
}

/// Runs loads and zoom lookups on a background tokio runtime.
///
/// Commands are fire-and-forget; every one produces exactly one
/// [`EngineEvent`] carrying the generation it was issued with.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: LoadSettings) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("kmz-engine")
            .build()?;

        thread::Builder::new()
            .name("kmz-engine-commands".into())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    let event_tx = event_tx.clone();
                    runtime.spawn(async move {
                        handle_command(&settings, command, event_tx).await;
                    });
                }
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn load(&self, generation: Generation, bytes: Bytes) {
        let _ = self.cmd_tx.send(EngineCommand::Load { generation, bytes });
    }

    pub fn zoom(&self, generation: Generation, bytes: Bytes, path: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Zoom {
            generation,
            bytes,
            path: path.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next completion.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(
    settings: &LoadSettings,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let event = match command {
        EngineCommand::Load { generation, bytes } => {
            kmz_debug!("Load {} started ({} bytes)", generation, bytes.len());
            EngineEvent::ArchiveLoaded {
                generation,
                result: load_kmz(bytes, settings).await,
            }
        }
        EngineCommand::Zoom {
            generation,
            bytes,
            path,
        } => {
            let bounds = match resolve_zoom(bytes, &path).await {
                Ok(bounds) => bounds,
                Err(err) => {
                    kmz_warn!("Zoom to {} failed: {}", path, err);
                    None
                }
            };
            EngineEvent::ZoomResolved {
                generation,
                path,
                bounds,
            }
        }
    };
    let _ = event_tx.send(event);
}
