//! Latest-value remote channel with catch-up on connect

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;

use super::{RemoteChannel, RemoteSummary};

/// Holds the most recent summary; subscribers always see the newest one
#[derive(Clone)]
pub struct WatchRemoteChannel {
    tx: Arc<watch::Sender<Option<RemoteSummary>>>,
}

impl Default for WatchRemoteChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchRemoteChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Connect an observer. It starts with the current summary, if any.
    pub fn subscribe(&self) -> watch::Receiver<Option<RemoteSummary>> {
        self.tx.subscribe()
    }
}

impl RemoteChannel for WatchRemoteChannel {
    fn broadcast(&mut self, summary: &RemoteSummary) -> Result<()> {
        // send_replace succeeds with no observers connected
        self.tx.send_replace(Some(summary.clone()));
        Ok(())
    }
}
