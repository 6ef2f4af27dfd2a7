//! Remote control boundary
//!
//! Remote observers (phones, tablets) get a read-only summary of the
//! presentation after every change and send back a small closed set of
//! staging commands. There is no acknowledgement: an observer that misses
//! intermediate summaries simply picks up the latest one.

mod watch;

pub use self::watch::WatchRemoteChannel;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::presentation::{LivePosition, Position, SlideStore};

/// Commands a remote client can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum RemoteCommand {
    StageNext,
    StagePrev,
    GoLive,
    Clear,
    StageSlide {
        #[serde(rename = "stackIndex")]
        stack_index: usize,
        #[serde(rename = "slideIndex")]
        slide_index: usize,
    },
    NextStack,
    PrevStack,
}

impl RemoteCommand {
    /// Parse one JSON command, e.g. `{"event":"go-live"}`
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSlide {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStack {
    pub id: String,
    pub title: String,
    pub slide_count: usize,
    pub slides: Vec<RemoteSlide>,
}

/// A cursor as the remote sees it. Every field is null during blackout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePosition {
    pub stack_index: Option<usize>,
    pub slide_index: Option<usize>,
    pub stack_title: Option<String>,
    pub slide_title: Option<String>,
}

impl RemotePosition {
    fn describe(store: &SlideStore, position: Position) -> Self {
        let stack = store.stack(position.stack_index);
        Self {
            stack_index: Some(position.stack_index),
            slide_index: Some(position.slide_index),
            stack_title: stack.map(|s| s.title.clone()),
            slide_title: stack
                .and_then(|s| s.slide(position.slide_index))
                .map(|slide| slide.title().to_string()),
        }
    }
}

/// Read-only projection of the presentation for remote observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSummary {
    pub stacks: Vec<RemoteStack>,
    pub staged: RemotePosition,
    pub live: RemotePosition,
}

impl RemoteSummary {
    pub fn build(store: &SlideStore, staged: Position, live: LivePosition) -> Self {
        let stacks = store
            .stacks()
            .iter()
            .map(|stack| RemoteStack {
                id: stack.id.clone(),
                title: stack.title.clone(),
                slide_count: stack.slides.len(),
                slides: stack
                    .slides
                    .iter()
                    .map(|slide| RemoteSlide {
                        kind: slide.kind().to_string(),
                        title: slide.display_title(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            stacks,
            staged: RemotePosition::describe(store, staged),
            live: live.map_or_else(RemotePosition::default, |pos| {
                RemotePosition::describe(store, pos)
            }),
        }
    }
}

/// Transport to remote observers
pub trait RemoteChannel: Send {
    fn broadcast(&mut self, summary: &RemoteSummary) -> Result<()>;
}

/// Recomputes the summary on every change and hands it to the channel
#[derive(Default)]
pub struct RemoteStateBroadcaster {
    channel: Option<Box<dyn RemoteChannel>>,
    last: Option<RemoteSummary>,
}

impl RemoteStateBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, channel: Box<dyn RemoteChannel>) {
        self.channel = Some(channel);
        // a new channel has seen nothing yet
        self.last = None;
    }

    /// Publish the current state. Returns true if a summary went out.
    pub fn publish(&mut self, store: &SlideStore, staged: Position, live: LivePosition) -> bool {
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };

        let summary = RemoteSummary::build(store, staged, live);
        if self.last.as_ref() == Some(&summary) {
            return false;
        }

        if let Err(e) = channel.broadcast(&summary) {
            warn!("Failed to broadcast state to remote clients: {}", e);
        } else {
            debug!("Broadcast state to remote clients");
        }
        self.last = Some(summary);
        true
    }
}
