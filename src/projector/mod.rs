//! Projector surface boundary
//!
//! The projector runs in a separate window/process. Everything it needs to
//! draw arrives as a full-replacement payload; nothing is diffed.

mod channel;
mod surface;
#[cfg(test)]
pub(crate) mod testing;

pub use channel::LiveProjectionChannel;
pub use surface::{ChannelSurface, ProjectorMessage};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::presentation::{Slide, Transition};
use crate::worship::WorshipSection;

/// Everything the projector needs to render the live slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectorSnapshot {
    /// Live slide, `None` for blackout
    pub slide: Option<Slide>,
    pub transition: Transition,
    pub library_root: Option<String>,
    /// Lyric/text scale in percent
    pub text_scale: u32,
}

/// Everything the projector needs to render worship mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorshipFrame {
    pub song_title: Option<String>,
    /// Live section, `None` when nothing is live
    pub section: Option<WorshipSection>,
    /// Lyrics hidden while the background keeps playing
    pub lyrics_cleared: bool,
    pub background_video: Option<String>,
    /// Set while a crossfade to a new background is in progress
    pub next_background_video: Option<String>,
    pub library_root: Option<String>,
    pub text_scale: u32,
}

/// The projector window (or anything standing in for it)
pub trait ProjectorSurface: Send {
    /// Replace whatever is on screen with `snapshot`
    fn publish(&mut self, snapshot: &ProjectorSnapshot) -> Result<()>;

    /// Replace the worship overlay with `frame`
    fn publish_worship(&mut self, frame: &WorshipFrame) -> Result<()>;
}
