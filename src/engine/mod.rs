//! Presenter engine - owns the controller and runs its event loop

mod event_loop;

pub use event_loop::{create_engine_channels, PresenterEngine};

use std::path::PathBuf;

use crate::presentation::{AutoAdvancePolicy, Slide};
use crate::remote::RemoteCommand;
use crate::worship::WorshipStackData;

/// Commands that can be sent to the presenter engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Move the staged cursor
    NextSlide,
    PrevSlide,
    NextStack,
    PrevStack,
    StageStack(usize),
    StageSlide { stack_index: usize, slide_index: usize },
    /// Project the staged slide
    GoLive,
    /// Blackout
    Clear,
    /// Command from a remote client
    Remote(RemoteCommand),
    /// The projector reports the live video ended
    VideoEnded,
    /// Edit the presentation
    AddStack { title: String },
    RemoveStack(usize),
    AddSlide { stack_index: usize, slide: Slide },
    RemoveSlide { stack_index: usize, slide_index: usize },
    UpdateAutoAdvance { stack_index: usize, policy: AutoAdvancePolicy },
    /// Worship mode
    LoadWorshipStack(WorshipStackData),
    ExitWorship,
    WorshipStageSection(usize),
    WorshipNextSection,
    WorshipPrevSection,
    WorshipGoToSong(usize),
    WorshipNextSong,
    WorshipPrevSong,
    WorshipGoLive,
    WorshipClear,
    RotateBackground,
    /// Import song files into the library
    ImportSongs(Vec<PathBuf>),
    /// Display settings
    SetTextScale(u32),
    SetLibraryRoot(Option<String>),
    /// Replace the presentation with the document at this path
    LoadDocument(PathBuf),
    /// Save to this path, or to the path the document was loaded from
    SaveDocument(Option<PathBuf>),
    /// Shutdown the engine
    Shutdown,
}

/// Status updates from the presenter engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Engine is running and accepting commands
    Ready,
    /// A slide is on the projector
    Live { stack_index: usize, slide_index: usize },
    /// Nothing is projected
    Blackout,
    DocumentLoaded { title: String, stack_count: usize },
    DocumentSaved(PathBuf),
    SongsImported { succeeded: usize, failed: usize },
    /// An error occurred
    Error(String),
}
