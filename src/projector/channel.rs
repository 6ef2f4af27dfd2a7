//! Debounced live projection channel
//!
//! Live changes arrive in bursts (auto-advance chains, an operator
//! hammering the arrow keys, the reload blackout). Each publish crosses a
//! process boundary, so only the last payload inside the debounce window is
//! sent. At most one debounce timer is pending at any time.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{ProjectorSnapshot, ProjectorSurface, WorshipFrame};
use crate::assets::AssetResolver;
use crate::timer::TimerSlot;

pub struct LiveProjectionChannel {
    surface: Option<Box<dyn ProjectorSurface>>,
    resolver: Option<Box<dyn AssetResolver>>,
    debounce: Duration,
    timer: TimerSlot<()>,
    pending_slide: Option<ProjectorSnapshot>,
    pending_worship: Option<WorshipFrame>,
}

impl LiveProjectionChannel {
    pub fn new(debounce: Duration) -> Self {
        Self {
            surface: None,
            resolver: None,
            debounce,
            timer: TimerSlot::new(),
            pending_slide: None,
            pending_worship: None,
        }
    }

    pub fn attach_surface(&mut self, surface: Box<dyn ProjectorSurface>) {
        self.surface = Some(surface);
    }

    pub fn set_resolver(&mut self, resolver: Box<dyn AssetResolver>) {
        self.resolver = Some(resolver);
    }

    /// Drop cached asset resolutions (library root changed)
    pub fn clear_asset_cache(&mut self) {
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.clear_cache();
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Queue a slide snapshot, restarting the debounce window
    pub fn schedule(&mut self, snapshot: ProjectorSnapshot, now: Instant) {
        self.pending_slide = Some(snapshot);
        self.timer.arm(now, self.debounce, ());
    }

    /// Queue a worship frame, restarting the debounce window
    pub fn schedule_worship(&mut self, frame: WorshipFrame, now: Instant) {
        self.pending_worship = Some(frame);
        self.timer.arm(now, self.debounce, ());
    }

    /// Publish whatever is pending if the debounce window has elapsed
    pub fn fire_due(&mut self, now: Instant) -> bool {
        if self.timer.take_due(now).is_none() {
            return false;
        }
        self.flush();
        true
    }

    fn flush(&mut self) {
        let slide = self.pending_slide.take();
        let worship = self.pending_worship.take();

        let Some(surface) = self.surface.as_mut() else {
            debug!("No projector attached, dropping update");
            return;
        };

        if let Some(mut snapshot) = slide {
            if let (Some(resolver), Some(slide)) = (self.resolver.as_mut(), snapshot.slide.as_mut()) {
                if let Some(url) = slide.asset_url() {
                    let resolved = resolver.resolve(snapshot.library_root.as_deref(), url);
                    slide.set_asset_url(resolved);
                }
            }

            match surface.publish(&snapshot) {
                Ok(()) => {
                    debug!(
                        "Sent snapshot to projector ({})",
                        snapshot.slide.as_ref().map_or("blackout".to_string(), |s| s.display_title())
                    );
                }
                Err(e) => warn!("Failed to update projector: {}", e),
            }
        }

        if let Some(frame) = worship {
            match surface.publish_worship(&frame) {
                Ok(()) => debug!("Sent worship frame to projector"),
                Err(e) => warn!("Failed to update projector worship overlay: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::LibraryAssetResolver;
    use crate::presentation::{Slide, Transition};
    use crate::projector::testing::RecordingSurface;

    fn snapshot(title: &str) -> ProjectorSnapshot {
        ProjectorSnapshot {
            slide: Some(Slide::Image {
                title: title.to_string(),
                image_url: format!("assets://{}.png", title),
            }),
            transition: Transition::Fade,
            library_root: Some("/lib".to_string()),
            text_scale: 100,
        }
    }

    #[test]
    fn test_burst_within_window_publishes_last_snapshot_once() {
        let surface = RecordingSurface::new();
        let mut channel = LiveProjectionChannel::new(Duration::from_millis(50));
        channel.attach_surface(Box::new(surface.clone()));

        let start = Instant::now();
        for i in 0..5u64 {
            channel.schedule(snapshot(&format!("s{}", i)), start + Duration::from_millis(i * 5));
        }

        assert!(!channel.fire_due(start + Duration::from_millis(50)));
        assert!(channel.fire_due(start + Duration::from_millis(70)));

        let published = surface.snapshots();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].slide.as_ref().map(|s| s.title()), Some("s4"));
        assert!(channel.deadline().is_none());
    }

    #[test]
    fn test_missing_surface_is_a_no_op() {
        let mut channel = LiveProjectionChannel::new(Duration::from_millis(50));
        let now = Instant::now();
        channel.schedule(snapshot("a"), now);
        assert!(channel.fire_due(now + Duration::from_millis(50)));
        assert!(channel.deadline().is_none());
        assert!(!channel.fire_due(now + Duration::from_millis(100)));
    }

    #[test]
    fn test_resolver_rewrites_asset_urls() {
        let surface = RecordingSurface::new();
        let mut channel = LiveProjectionChannel::new(Duration::from_millis(50));
        channel.attach_surface(Box::new(surface.clone()));
        channel.set_resolver(Box::new(LibraryAssetResolver::new()));

        let now = Instant::now();
        channel.schedule(snapshot("welcome"), now);
        channel.fire_due(now + Duration::from_millis(50));

        let published = surface.snapshots();
        assert_eq!(
            published[0].slide.as_ref().and_then(|s| s.asset_url()),
            Some("local-image:///lib/assets/welcome.png")
        );
    }

    #[test]
    fn test_failed_publish_is_not_retried() {
        let surface = RecordingSurface::failing();
        let mut channel = LiveProjectionChannel::new(Duration::from_millis(50));
        channel.attach_surface(Box::new(surface.clone()));

        let now = Instant::now();
        channel.schedule(snapshot("a"), now);
        assert!(channel.fire_due(now + Duration::from_millis(50)));
        assert!(surface.snapshots().is_empty());
        assert!(channel.deadline().is_none());
        assert!(!channel.fire_due(now + Duration::from_millis(100)));
    }
}
