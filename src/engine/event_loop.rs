//! Presenter event loop
//!
//! Every state change happens on this one task: commands arrive over an
//! mpsc channel and timers are a single `sleep_until` on the controller's
//! earliest deadline. Nothing else touches the controller, so each command
//! runs to completion before the next event is looked at.

use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::persistence::JsonDocumentStore;
use crate::presentation::{LivePosition, PresentationController};

use super::{EngineCommand, EngineStatus};

/// The presenter engine drives a `PresentationController`
pub struct PresenterEngine {
    /// All presentation state
    controller: PresentationController,
    /// Command receiver
    cmd_rx: mpsc::Receiver<EngineCommand>,
    /// Status broadcaster
    status_tx: broadcast::Sender<EngineStatus>,
    /// Where the open document came from
    document_path: Option<PathBuf>,
    /// Song library file, rewritten after imports
    songs_path: Option<PathBuf>,
}

impl PresenterEngine {
    /// Create a new presenter engine
    pub fn new(
        controller: PresentationController,
        cmd_rx: mpsc::Receiver<EngineCommand>,
        status_tx: broadcast::Sender<EngineStatus>,
    ) -> Self {
        Self {
            controller,
            cmd_rx,
            status_tx,
            document_path: None,
            songs_path: None,
        }
    }

    pub fn with_document_path(mut self, path: Option<PathBuf>) -> Self {
        self.document_path = path;
        self
    }

    pub fn with_songs_path(mut self, path: Option<PathBuf>) -> Self {
        self.songs_path = path;
        self
    }

    pub fn controller(&self) -> &PresentationController {
        &self.controller
    }

    /// Run the engine main loop
    pub async fn run(&mut self) -> Result<()> {
        info!("Presenter engine starting");

        if let Some(path) = self.document_path.clone() {
            self.load_document(path);
        }

        let _ = self.status_tx.send(EngineStatus::Ready);

        loop {
            let deadline = self.controller.next_deadline();

            tokio::select! {
                // Handle commands
                cmd = self.cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        info!("Command channel closed");
                        break;
                    };
                    if matches!(cmd, EngineCommand::Shutdown) {
                        info!("Shutdown command received");
                        break;
                    }
                    let before = self.controller.live();
                    self.handle_command(cmd);
                    self.report_live(before);
                }

                // Fire auto-advance, crossfade and debounce timers
                _ = async {
                    match deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending().await,
                    }
                } => {
                    let before = self.controller.live();
                    self.controller.fire_due_timers(Instant::now());
                    self.report_live(before);
                }
            }
        }

        self.controller.clear_projection(Instant::now());
        info!("Presenter engine stopped");
        Ok(())
    }

    fn handle_command(&mut self, cmd: EngineCommand) {
        let now = Instant::now();
        let c = &mut self.controller;

        match cmd {
            EngineCommand::NextSlide => c.next_slide(),
            EngineCommand::PrevSlide => c.prev_slide(),
            EngineCommand::NextStack => c.next_stack(),
            EngineCommand::PrevStack => c.prev_stack(),
            EngineCommand::StageStack(index) => c.stage_stack(index),
            EngineCommand::StageSlide {
                stack_index,
                slide_index,
            } => c.stage_slide(stack_index, slide_index),
            EngineCommand::GoLive => {
                c.go_live(now);
            }
            EngineCommand::Clear => c.clear_projection(now),
            EngineCommand::Remote(command) => c.handle_remote_command(command, now),
            EngineCommand::VideoEnded => c.on_video_complete(now),
            EngineCommand::AddStack { title } => {
                let id = c.add_stack(title, now);
                debug!("Added stack {}", id);
            }
            EngineCommand::RemoveStack(index) => {
                c.remove_stack(index, now);
            }
            EngineCommand::AddSlide { stack_index, slide } => {
                c.add_slide(stack_index, slide, now);
            }
            EngineCommand::RemoveSlide {
                stack_index,
                slide_index,
            } => {
                c.remove_slide(stack_index, slide_index, now);
            }
            EngineCommand::UpdateAutoAdvance {
                stack_index,
                policy,
            } => {
                c.update_auto_advance(stack_index, policy, now);
            }
            EngineCommand::LoadWorshipStack(data) => c.load_worship_stack(data, now),
            EngineCommand::ExitWorship => c.exit_worship_mode(now),
            EngineCommand::WorshipStageSection(index) => c.worship_stage_section(index, now),
            EngineCommand::WorshipNextSection => c.worship_next_section(now),
            EngineCommand::WorshipPrevSection => c.worship_prev_section(now),
            EngineCommand::WorshipGoToSong(index) => c.worship_go_to_song(index, now),
            EngineCommand::WorshipNextSong => c.worship_next_song(now),
            EngineCommand::WorshipPrevSong => c.worship_prev_song(now),
            EngineCommand::WorshipGoLive => c.worship_go_live(now),
            EngineCommand::WorshipClear => c.worship_clear(now),
            EngineCommand::RotateBackground => c.rotate_background_video(now),
            EngineCommand::ImportSongs(paths) => self.import_songs(&paths),
            EngineCommand::SetTextScale(percent) => c.set_text_scale(percent, now),
            EngineCommand::SetLibraryRoot(root) => c.set_library_root(root, now),
            EngineCommand::LoadDocument(path) => self.load_document(path),
            EngineCommand::SaveDocument(path) => self.save_document(path),
            EngineCommand::Shutdown => {}
        }
    }

    /// Tell status listeners when the live position moved
    fn report_live(&self, before: LivePosition) {
        let after = self.controller.live();
        if after == before {
            return;
        }
        let status = match after {
            Some(pos) => EngineStatus::Live {
                stack_index: pos.stack_index,
                slide_index: pos.slide_index,
            },
            None => EngineStatus::Blackout,
        };
        let _ = self.status_tx.send(status);
    }

    fn load_document(&mut self, path: PathBuf) {
        let documents = JsonDocumentStore::new(&path);
        match self.controller.load_from(&documents, Instant::now()) {
            Ok(()) => {
                let store = self.controller.store();
                let _ = self.status_tx.send(EngineStatus::DocumentLoaded {
                    title: store.title().to_string(),
                    stack_count: store.len(),
                });
                self.document_path = Some(path);
            }
            Err(e) => {
                error!("Failed to load presentation {:?}: {}", path, e);
                let _ = self
                    .status_tx
                    .send(EngineStatus::Error(format!("Failed to load presentation: {}", e)));
            }
        }
    }

    fn save_document(&mut self, path: Option<PathBuf>) {
        let Some(path) = path.or_else(|| self.document_path.clone()) else {
            warn!("Save requested but no document path is known");
            let _ = self
                .status_tx
                .send(EngineStatus::Error("No document path to save to".to_string()));
            return;
        };

        match self.controller.save_to(&JsonDocumentStore::new(&path)) {
            Ok(()) => {
                let _ = self.status_tx.send(EngineStatus::DocumentSaved(path.clone()));
                self.document_path = Some(path);
            }
            Err(e) => {
                error!("Failed to save presentation {:?}: {}", path, e);
                let _ = self
                    .status_tx
                    .send(EngineStatus::Error(format!("Failed to save presentation: {}", e)));
            }
        }
    }

    fn import_songs(&mut self, paths: &[PathBuf]) {
        let report = self.controller.songs_mut().import_files(paths);
        info!(
            "Imported {} songs, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );

        if let Some(songs_path) = self.songs_path.as_ref() {
            if let Err(e) = self.controller.songs().save(songs_path) {
                error!("Failed to save song library: {}", e);
                let _ = self
                    .status_tx
                    .send(EngineStatus::Error(format!("Failed to save song library: {}", e)));
            }
        }

        let _ = self.status_tx.send(EngineStatus::SongsImported {
            succeeded: report.succeeded.len(),
            failed: report.failed.len(),
        });
    }
}

/// Create engine command and status channels
pub fn create_engine_channels() -> (
    mpsc::Sender<EngineCommand>,
    mpsc::Receiver<EngineCommand>,
    broadcast::Sender<EngineStatus>,
    broadcast::Receiver<EngineStatus>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (status_tx, status_rx) = broadcast::channel(16);
    (cmd_tx, cmd_rx, status_tx, status_rx)
}
