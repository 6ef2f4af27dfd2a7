//! IPC adapter that hands serialized projector payloads to another task

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::{ProjectorSnapshot, ProjectorSurface, WorshipFrame};

/// Envelope sent across the projector boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ProjectorMessage {
    UpdateSlide(ProjectorSnapshot),
    UpdateWorship(WorshipFrame),
}

/// Projector surface backed by an unbounded channel of JSON strings
///
/// The receiving side owns the actual window (or, in the headless binary,
/// writes one JSON line per update). A dropped receiver means the projector
/// window is closed; publishes then fail and are logged by the caller.
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSurface {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Create a surface together with the receiving end
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, message: &ProjectorMessage) -> Result<()> {
        let json = serde_json::to_string(message).context("Failed to serialize projector update")?;
        self.tx
            .send(json)
            .map_err(|_| anyhow!("Projector window not open"))
    }
}

impl ProjectorSurface for ChannelSurface {
    fn publish(&mut self, snapshot: &ProjectorSnapshot) -> Result<()> {
        self.send(&ProjectorMessage::UpdateSlide(snapshot.clone()))
    }

    fn publish_worship(&mut self, frame: &WorshipFrame) -> Result<()> {
        self.send(&ProjectorMessage::UpdateWorship(frame.clone()))
    }
}
