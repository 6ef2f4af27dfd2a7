//! Presentation controller
//!
//! Owns every piece of presentation state for one running presentation:
//! the slide store, the staged cursor, the live position, the auto-advance
//! engine, the worship sequencer and the outbound projector and remote
//! channels. All mutation goes through methods here and each one runs to
//! completion; timers are plain deadlines that the engine loop fires via
//! [`PresentationController::fire_due_timers`].
//!
//! Observers are notified only after state has been updated, so nobody can
//! see a stale live position after an operation returns.

use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info};

use super::auto_advance::{AdvanceState, AdvanceStep, AutoAdvanceEngine};
use super::cursor::{adjust_live, LiveAdjustment, LivePosition, Position, StagingCursor};
use super::slide::{AutoAdvancePolicy, Slide, Transition};
use super::store::{PresentationDocument, SlideStore, StoreChange};
use crate::assets::AssetResolver;
use crate::error::Result;
use crate::persistence::DocumentStore;
use crate::projector::{LiveProjectionChannel, ProjectorSnapshot, ProjectorSurface};
use crate::remote::{RemoteChannel, RemoteCommand, RemoteStateBroadcaster};
use crate::timer::earliest;
use crate::worship::{SongLibrary, WorshipSequencer, WorshipStackData};

/// Fixed delays used by the controller's timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub projector_debounce: Duration,
    pub reload_settle: Duration,
    pub crossfade: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            projector_debounce: Duration::from_millis(50),
            reload_settle: Duration::from_millis(50),
            crossfade: Duration::from_millis(3000),
        }
    }
}

pub const DEFAULT_TEXT_SCALE: u32 = 100;

/// Change notifications for in-process observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    LiveChanged(LivePosition),
    StagedChanged(Position),
    StacksChanged,
    WorshipChanged,
}

pub struct PresentationController {
    store: SlideStore,
    cursor: StagingCursor,
    live: LivePosition,
    auto_advance: AutoAdvanceEngine,
    projector: LiveProjectionChannel,
    worship: WorshipSequencer,
    songs: SongLibrary,
    remote: RemoteStateBroadcaster,
    library_root: Option<String>,
    text_scale: u32,
    events: broadcast::Sender<PresentationEvent>,
}

impl PresentationController {
    pub fn new(timing: Timing, lines_per_section: usize) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store: SlideStore::new(),
            cursor: StagingCursor::new(),
            live: None,
            auto_advance: AutoAdvanceEngine::new(timing.reload_settle),
            projector: LiveProjectionChannel::new(timing.projector_debounce),
            worship: WorshipSequencer::new(timing.crossfade, lines_per_section),
            songs: SongLibrary::new(),
            remote: RemoteStateBroadcaster::new(),
            library_root: None,
            text_scale: DEFAULT_TEXT_SCALE,
            events,
        }
    }

    /// Start from a store that already holds at least one stack
    pub fn with_store(timing: Timing, lines_per_section: usize, store: SlideStore) -> Self {
        let mut controller = Self::new(timing, lines_per_section);
        controller.store = store;
        controller
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresentationEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &SlideStore {
        &self.store
    }

    pub fn staged(&self) -> Position {
        self.cursor.position()
    }

    pub fn live(&self) -> LivePosition {
        self.live
    }

    pub fn live_slide(&self) -> Option<&Slide> {
        let live = self.live?;
        self.store.slide(live.stack_index, live.slide_index)
    }

    pub fn auto_advance_state(&self) -> AdvanceState {
        self.auto_advance.state()
    }

    pub fn worship(&self) -> &WorshipSequencer {
        &self.worship
    }

    pub fn songs(&self) -> &SongLibrary {
        &self.songs
    }

    pub fn songs_mut(&mut self) -> &mut SongLibrary {
        &mut self.songs
    }

    pub fn set_song_library(&mut self, songs: SongLibrary) {
        self.songs = songs;
    }

    pub fn text_scale(&self) -> u32 {
        self.text_scale
    }

    pub fn library_root(&self) -> Option<&str> {
        self.library_root.as_deref()
    }

    // Collaborators

    pub fn attach_projector(&mut self, surface: Box<dyn ProjectorSurface>, now: Instant) {
        info!("Projector attached");
        self.projector.attach_surface(surface);
        // bring the new surface up to date
        self.schedule_snapshot(now);
        if self.worship.is_active() {
            let frame = self.worship.frame(self.library_root.as_deref(), self.text_scale);
            self.projector.schedule_worship(frame, now);
        }
    }

    pub fn set_asset_resolver(&mut self, resolver: Box<dyn AssetResolver>) {
        self.projector.set_resolver(resolver);
    }

    pub fn attach_remote(&mut self, channel: Box<dyn RemoteChannel>) {
        info!("Remote channel attached");
        self.remote.attach(channel);
        self.publish_remote();
    }

    // Navigation guards

    pub fn can_go_prev_slide(&self) -> bool {
        self.cursor.can_go_prev_slide()
    }

    pub fn can_go_next_slide(&self) -> bool {
        self.cursor.can_go_next_slide(&self.store)
    }

    pub fn can_go_prev_stack(&self) -> bool {
        self.cursor.can_go_prev_stack()
    }

    pub fn can_go_next_stack(&self) -> bool {
        self.cursor.can_go_next_stack(&self.store)
    }

    // Staging

    pub fn next_slide(&mut self) {
        let moved = self.cursor.next_slide(&self.store);
        self.after_staging(moved);
    }

    pub fn prev_slide(&mut self) {
        let moved = self.cursor.prev_slide();
        self.after_staging(moved);
    }

    pub fn next_stack(&mut self) {
        let moved = self.cursor.next_stack(&self.store);
        self.after_staging(moved);
    }

    pub fn prev_stack(&mut self) {
        let moved = self.cursor.prev_stack();
        self.after_staging(moved);
    }

    pub fn stage_stack(&mut self, stack_index: usize) {
        let moved = self.cursor.stage_stack(&self.store, stack_index);
        self.after_staging(moved);
    }

    pub fn stage_slide(&mut self, stack_index: usize, slide_index: usize) {
        let moved = self.cursor.stage_slide(&self.store, stack_index, slide_index);
        self.after_staging(moved);
    }

    fn after_staging(&mut self, moved: bool) {
        if !moved {
            return;
        }
        let staged = self.cursor.position();
        debug!("Staged stack {} slide {}", staged.stack_index, staged.slide_index);
        let _ = self.events.send(PresentationEvent::StagedChanged(staged));
        self.publish_remote();
    }

    // Live

    /// Project the staged slide. Returns false when there is nothing to show.
    pub fn go_live(&mut self, now: Instant) -> bool {
        let staged = self.cursor.position();
        if self.store.slide(staged.stack_index, staged.slide_index).is_none() {
            debug!("Nothing staged, go live ignored");
            return false;
        }
        info!("Going live: stack {} slide {}", staged.stack_index, staged.slide_index);
        self.set_live(Some(staged), now);
        true
    }

    /// Blackout. Synchronous, idempotent, and cancels any pending advance.
    pub fn clear_projection(&mut self, now: Instant) {
        self.auto_advance.cancel();
        if self.live.is_none() {
            return;
        }
        info!("Projection cleared");
        self.live = None;
        self.notify_live(now);
    }

    /// The projector finished playing the live video
    pub fn on_video_complete(&mut self, now: Instant) {
        if let Some(step) = self.auto_advance.on_video_complete(&self.store, self.live, now) {
            self.apply_step(step, now);
        }
    }

    fn set_live(&mut self, live: LivePosition, now: Instant) {
        self.live = live;
        self.auto_advance.on_live_changed(&self.store, live, now);
        self.notify_live(now);
    }

    fn apply_step(&mut self, step: AdvanceStep, now: Instant) {
        match step {
            AdvanceStep::MoveTo(position) => self.set_live(Some(position), now),
            AdvanceStep::BeginReload(_) => {
                // the engine holds the settle timer; re-evaluating would drop it
                self.live = None;
                self.notify_live(now);
            }
            AdvanceStep::FinishReload(position) => self.set_live(Some(position), now),
        }
    }

    fn notify_live(&mut self, now: Instant) {
        let _ = self.events.send(PresentationEvent::LiveChanged(self.live));
        self.schedule_snapshot(now);
        self.publish_remote();
    }

    pub fn snapshot(&self) -> ProjectorSnapshot {
        let transition = self
            .live
            .and_then(|live| self.store.stack(live.stack_index))
            .map_or(Transition::default(), |stack| stack.auto_advance.transition);
        ProjectorSnapshot {
            slide: self.live_slide().cloned(),
            transition,
            library_root: self.library_root.clone(),
            text_scale: self.text_scale,
        }
    }

    fn schedule_snapshot(&mut self, now: Instant) {
        let snapshot = self.snapshot();
        self.projector.schedule(snapshot, now);
    }

    fn publish_remote(&mut self) {
        self.remote
            .publish(&self.store, self.cursor.position(), self.live);
    }

    // Editing

    /// Append a new empty stack and return its id
    pub fn add_stack(&mut self, title: impl Into<String>, now: Instant) -> String {
        let (id, change) = self.store.add_stack(title);
        self.apply_change(change, now);
        id
    }

    pub fn remove_stack(&mut self, index: usize, now: Instant) -> bool {
        match self.store.remove_stack(index) {
            Some(change) => {
                self.apply_change(change, now);
                true
            }
            None => {
                debug!("Refusing to remove stack {}", index);
                false
            }
        }
    }

    pub fn add_slide(&mut self, stack_index: usize, slide: Slide, now: Instant) -> bool {
        match self.store.add_slide(stack_index, slide) {
            Some(change) => {
                self.apply_change(change, now);
                true
            }
            None => false,
        }
    }

    pub fn remove_slide(&mut self, stack_index: usize, slide_index: usize, now: Instant) -> bool {
        match self.store.remove_slide(stack_index, slide_index) {
            Some(change) => {
                self.apply_change(change, now);
                true
            }
            None => false,
        }
    }

    pub fn update_auto_advance(
        &mut self,
        stack_index: usize,
        policy: AutoAdvancePolicy,
        now: Instant,
    ) -> bool {
        match self.store.update_auto_advance(stack_index, policy) {
            Some(change) => {
                self.apply_change(change, now);
                true
            }
            None => false,
        }
    }

    /// Keep the live and staged positions valid after a store mutation
    fn apply_change(&mut self, change: StoreChange, now: Instant) {
        match adjust_live(self.live, &change) {
            LiveAdjustment::Cleared => {
                info!("Live slide removed, clearing projection");
                self.clear_projection(now);
            }
            LiveAdjustment::Moved(position) => {
                let slide_moved = self.live.map(|p| p.slide_index) != Some(position.slide_index);
                self.live = Some(position);
                if slide_moved {
                    // pending timers are keyed on the old slide index
                    self.auto_advance.on_live_changed(&self.store, self.live, now);
                }
                let _ = self.events.send(PresentationEvent::LiveChanged(self.live));
            }
            LiveAdjustment::Unchanged => {}
        }

        if let StoreChange::PolicyUpdated { stack_index } = change {
            if let Some(live) = self.live.filter(|live| live.stack_index == stack_index) {
                self.auto_advance.on_live_changed(&self.store, Some(live), now);
                self.schedule_snapshot(now);
            }
        }

        if self.cursor.follow_change(&self.store, &change) {
            let _ = self
                .events
                .send(PresentationEvent::StagedChanged(self.cursor.position()));
        }

        let _ = self.events.send(PresentationEvent::StacksChanged);
        self.publish_remote();
    }

    // Remote

    pub fn handle_remote_command(&mut self, command: RemoteCommand, now: Instant) {
        info!("Remote command: {:?}", command);
        match command {
            RemoteCommand::StageNext => self.next_slide(),
            RemoteCommand::StagePrev => self.prev_slide(),
            RemoteCommand::GoLive => {
                self.go_live(now);
            }
            RemoteCommand::Clear => self.clear_projection(now),
            RemoteCommand::StageSlide {
                stack_index,
                slide_index,
            } => self.stage_slide(stack_index, slide_index),
            RemoteCommand::NextStack => self.next_stack(),
            RemoteCommand::PrevStack => self.prev_stack(),
        }
    }

    // Display settings

    pub fn set_text_scale(&mut self, percent: u32, now: Instant) {
        if percent == self.text_scale {
            return;
        }
        info!("Text scale set to {}%", percent);
        self.text_scale = percent;
        self.republish(now);
    }

    pub fn set_library_root(&mut self, root: Option<String>, now: Instant) {
        if root == self.library_root {
            return;
        }
        info!("Library root set to {:?}", root);
        self.library_root = root;
        self.projector.clear_asset_cache();
        self.republish(now);
    }

    fn republish(&mut self, now: Instant) {
        if self.live.is_some() {
            self.schedule_snapshot(now);
        }
        if self.worship.live().is_some() {
            let frame = self.worship.frame(self.library_root.as_deref(), self.text_scale);
            self.projector.schedule_worship(frame, now);
        }
    }

    // Worship

    pub fn load_worship_stack(&mut self, data: WorshipStackData, now: Instant) {
        self.worship.load_worship_stack(data, &self.songs);
        self.after_worship(true, now);
    }

    pub fn exit_worship_mode(&mut self, now: Instant) {
        self.worship.exit_worship_mode();
        self.after_worship(true, now);
    }

    pub fn worship_stage_section(&mut self, index: usize, now: Instant) {
        let changed = self.worship.stage_section(index);
        self.after_worship(changed, now);
    }

    pub fn worship_next_section(&mut self, now: Instant) {
        let changed = self.worship.next_section();
        self.after_worship(changed, now);
    }

    pub fn worship_prev_section(&mut self, now: Instant) {
        let changed = self.worship.prev_section();
        self.after_worship(changed, now);
    }

    pub fn worship_go_to_song(&mut self, index: usize, now: Instant) {
        let changed = self.worship.go_to_song(index, now);
        self.after_worship(changed, now);
    }

    pub fn worship_next_song(&mut self, now: Instant) {
        let changed = self.worship.next_song(now);
        self.after_worship(changed, now);
    }

    pub fn worship_prev_song(&mut self, now: Instant) {
        let changed = self.worship.prev_song(now);
        self.after_worship(changed, now);
    }

    pub fn worship_go_live(&mut self, now: Instant) {
        let changed = self.worship.go_live();
        self.after_worship(changed, now);
    }

    pub fn worship_clear(&mut self, now: Instant) {
        self.worship.clear_projection();
        self.after_worship(true, now);
    }

    pub fn rotate_background_video(&mut self, now: Instant) {
        self.worship.rotate_background_video(now);
        self.after_worship(true, now);
    }

    fn after_worship(&mut self, changed: bool, now: Instant) {
        if self.worship.take_frame_dirty() {
            let frame = self.worship.frame(self.library_root.as_deref(), self.text_scale);
            self.projector.schedule_worship(frame, now);
        } else if !changed {
            return;
        }
        let _ = self.events.send(PresentationEvent::WorshipChanged);
    }

    // Timers

    /// Earliest pending deadline across all timers
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.auto_advance.deadline(),
            self.worship.deadline(),
            self.projector.deadline(),
        ])
    }

    /// Fire every timer whose deadline has passed: auto-advance first, then
    /// the background crossfade, then the projector debounce.
    pub fn fire_due_timers(&mut self, now: Instant) {
        if let Some(step) = self.auto_advance.fire_due(&self.store, self.live, now) {
            self.apply_step(step, now);
        }
        if self.worship.fire_due(now) {
            self.after_worship(true, now);
        }
        self.projector.fire_due(now);
    }

    // Persistence

    /// Replace the whole store with `document`. On error nothing changes.
    pub fn load_document(&mut self, document: PresentationDocument, now: Instant) -> Result<()> {
        let store = SlideStore::deserialize(document)?;

        self.auto_advance.cancel();
        self.worship.exit_worship_mode();
        self.store = store;
        self.cursor.reset();
        self.live = None;
        // blank any worship overlay left on the projector
        self.after_worship(false, now);

        info!(
            "Presentation {:?} loaded with {} stacks",
            self.store.title(),
            self.store.len()
        );
        let _ = self.events.send(PresentationEvent::StacksChanged);
        let _ = self
            .events
            .send(PresentationEvent::StagedChanged(self.cursor.position()));
        self.notify_live(now);
        Ok(())
    }

    pub fn load_from(&mut self, documents: &dyn DocumentStore, now: Instant) -> Result<()> {
        debug!("Loading presentation from {}", documents.location());
        let document = documents.load_document()?;
        self.load_document(document, now)
    }

    pub fn save_to(&self, documents: &dyn DocumentStore) -> Result<()> {
        debug!("Saving presentation to {}", documents.location());
        documents.save_document(&self.store.serialize())
    }
}
