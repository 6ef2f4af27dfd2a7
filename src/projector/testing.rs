//! Recording projector used by tests

use anyhow::{bail, Result};
use std::sync::{Arc, Mutex};

use super::{ProjectorSnapshot, ProjectorSurface, WorshipFrame};

#[derive(Clone, Default)]
pub(crate) struct RecordingSurface {
    snapshots: Arc<Mutex<Vec<ProjectorSnapshot>>>,
    frames: Arc<Mutex<Vec<WorshipFrame>>>,
    fail: bool,
}

impl RecordingSurface {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn snapshots(&self) -> Vec<ProjectorSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }

    pub(crate) fn frames(&self) -> Vec<WorshipFrame> {
        self.frames.lock().unwrap().clone()
    }
}

impl ProjectorSurface for RecordingSurface {
    fn publish(&mut self, snapshot: &ProjectorSnapshot) -> Result<()> {
        if self.fail {
            bail!("Projector window not open");
        }
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(())
    }

    fn publish_worship(&mut self, frame: &WorshipFrame) -> Result<()> {
        if self.fail {
            bail!("Projector window not open");
        }
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }
}
