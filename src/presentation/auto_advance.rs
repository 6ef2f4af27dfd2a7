//! Auto-advance engine
//!
//! Decides, for whatever is currently live, whether to arm a delay timer,
//! wait for the projector to report the end of a video, or do nothing.
//! The engine never touches the live position itself: it hands back an
//! `AdvanceStep` and the controller applies it through its narrow
//! live-position API. The staged cursor is never consulted or changed.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::cursor::{LivePosition, Position};
use super::store::SlideStore;
use crate::timer::TimerSlot;

/// Observable state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceState {
    Idle,
    TimerArmed,
    WaitingForVideoEnd,
    /// Single-slide repeat: live is blacked out briefly before re-showing
    ReloadSettling,
}

/// Identity of the live slide a timer or video wait belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArmedFor {
    stack_id: String,
    slide_index: usize,
}

impl ArmedFor {
    fn matches(&self, store: &SlideStore, live: LivePosition) -> bool {
        let Some(pos) = live else {
            return false;
        };
        pos.slide_index == self.slide_index
            && store
                .stack(pos.stack_index)
                .is_some_and(|stack| stack.id == self.stack_id)
    }
}

#[derive(Debug)]
enum PendingTimer {
    Advance(ArmedFor),
    Reload { stack_id: String, slide_index: usize },
}

/// What the controller must do to the live position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceStep {
    /// Show another slide of the live stack
    MoveTo(Position),
    /// Black out now; the engine has armed the settle timer
    BeginReload(Position),
    /// Settle elapsed; show the slide again
    FinishReload(Position),
}

#[derive(Debug)]
pub struct AutoAdvanceEngine {
    timer: TimerSlot<PendingTimer>,
    waiting_video: Option<ArmedFor>,
    state: AdvanceState,
    reload_settle: Duration,
}

impl AutoAdvanceEngine {
    pub fn new(reload_settle: Duration) -> Self {
        Self {
            timer: TimerSlot::new(),
            waiting_video: None,
            state: AdvanceState::Idle,
            reload_settle,
        }
    }

    pub fn state(&self) -> AdvanceState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Drop any armed timer or video wait
    pub fn cancel(&mut self) {
        if self.timer.cancel() {
            debug!("Auto-advance timer cancelled");
        }
        self.waiting_video = None;
        self.state = AdvanceState::Idle;
    }

    /// Re-evaluate after the live position changed
    pub fn on_live_changed(&mut self, store: &SlideStore, live: LivePosition, now: Instant) {
        self.cancel();

        let Some(pos) = live else {
            return;
        };
        let Some(stack) = store.stack(pos.stack_index) else {
            return;
        };
        let Some(slide) = stack.slide(pos.slide_index) else {
            return;
        };

        let policy = &stack.auto_advance;
        if !policy.enabled {
            return;
        }

        let armed_for = ArmedFor {
            stack_id: stack.id.clone(),
            slide_index: pos.slide_index,
        };

        if policy.waits_for_video_end(slide) {
            debug!(
                "Auto-advance waiting for video end on stack {} slide {}",
                pos.stack_index, pos.slide_index
            );
            self.waiting_video = Some(armed_for);
            self.state = AdvanceState::WaitingForVideoEnd;
        } else {
            let delay = Duration::from_millis(policy.delay_ms);
            debug!(
                "Auto-advance armed for {:?} on stack {} slide {}",
                delay, pos.stack_index, pos.slide_index
            );
            self.timer.arm(now, delay, PendingTimer::Advance(armed_for));
            self.state = AdvanceState::TimerArmed;
        }
    }

    /// Handle the projector reporting that the live video finished
    pub fn on_video_complete(
        &mut self,
        store: &SlideStore,
        live: LivePosition,
        now: Instant,
    ) -> Option<AdvanceStep> {
        let eligible = match (&self.waiting_video, live) {
            (Some(armed), Some(pos)) => {
                armed.matches(store, live)
                    && store.stack(pos.stack_index).is_some_and(|stack| {
                        stack.auto_advance.enabled
                            && stack
                                .slide(pos.slide_index)
                                .is_some_and(|slide| stack.auto_advance.waits_for_video_end(slide))
                    })
            }
            _ => false,
        };

        if !eligible {
            debug!("Ignoring stale video completion");
            return None;
        }

        self.waiting_video = None;
        self.state = AdvanceState::Idle;
        live.and_then(|pos| self.advance(store, pos, now))
    }

    /// Fire the timer if due
    pub fn fire_due(
        &mut self,
        store: &SlideStore,
        live: LivePosition,
        now: Instant,
    ) -> Option<AdvanceStep> {
        let pending = self.timer.take_due(now)?;
        self.state = AdvanceState::Idle;

        match pending {
            PendingTimer::Advance(armed) => {
                if !armed.matches(store, live) {
                    debug!("Dropping stale auto-advance timer for stack {}", armed.stack_id);
                    return None;
                }
                live.and_then(|pos| self.advance(store, pos, now))
            }
            PendingTimer::Reload { stack_id, slide_index } => {
                // stacks before this one may have been removed while settling
                let stack_index = store
                    .stacks()
                    .iter()
                    .position(|stack| stack.id == stack_id && stack.slide(slide_index).is_some());
                match stack_index {
                    Some(stack_index) if live.is_none() => {
                        Some(AdvanceStep::FinishReload(Position::new(stack_index, slide_index)))
                    }
                    _ => {
                        debug!("Dropping stale reload for stack {}", stack_id);
                        None
                    }
                }
            }
        }
    }

    /// Move past the live slide according to the stack's repeat setting
    fn advance(&mut self, store: &SlideStore, pos: Position, now: Instant) -> Option<AdvanceStep> {
        let stack = store.stack(pos.stack_index)?;
        let last = stack.last_index()?;
        let repeat = stack.auto_advance.repeat;

        if pos.slide_index < last {
            info!("Auto-advancing live to slide {}", pos.slide_index + 1);
            return Some(AdvanceStep::MoveTo(Position::new(pos.stack_index, pos.slide_index + 1)));
        }

        if !repeat {
            info!("End of stack reached without repeat, auto-advance stopped");
            self.cancel();
            return None;
        }

        if pos.slide_index == 0 {
            info!("Single-slide stack repeating, reloading slide");
            self.timer.arm(
                now,
                self.reload_settle,
                PendingTimer::Reload {
                    stack_id: stack.id.clone(),
                    slide_index: pos.slide_index,
                },
            );
            self.state = AdvanceState::ReloadSettling;
            Some(AdvanceStep::BeginReload(pos))
        } else {
            info!("End of stack reached, looping back to first slide");
            Some(AdvanceStep::MoveTo(Position::new(pos.stack_index, 0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::slide::{AutoAdvancePolicy, Slide, VideoAdvanceMode};

    fn image() -> Slide {
        Slide::Image {
            title: String::new(),
            image_url: "assets://a.png".to_string(),
        }
    }

    fn video() -> Slide {
        Slide::Video {
            title: String::new(),
            video_url: "assets://a.mp4".to_string(),
            looping: false,
            muted: false,
        }
    }

    fn store(slides: Vec<Slide>, policy: AutoAdvancePolicy) -> SlideStore {
        let mut store = SlideStore::new();
        store.add_stack("Loop");
        for slide in slides {
            store.add_slide(0, slide);
        }
        store.update_auto_advance(0, policy);
        store
    }

    fn enabled(delay_ms: u64, repeat: bool) -> AutoAdvancePolicy {
        AutoAdvancePolicy {
            enabled: true,
            delay_ms,
            repeat,
            ..AutoAdvancePolicy::default()
        }
    }

    #[test]
    fn test_disabled_policy_stays_idle() {
        let store = store(vec![image(), image()], AutoAdvancePolicy::default());
        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        engine.on_live_changed(&store, Some(Position::new(0, 0)), Instant::now());
        assert_eq!(engine.state(), AdvanceState::Idle);
        assert!(engine.deadline().is_none());
    }

    #[test]
    fn test_video_end_mode_waits_without_timer() {
        let store = store(vec![video(), image()], enabled(100, false));
        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        engine.on_live_changed(&store, Some(Position::new(0, 0)), Instant::now());
        assert_eq!(engine.state(), AdvanceState::WaitingForVideoEnd);
        assert!(engine.deadline().is_none());
    }

    #[test]
    fn test_timer_mode_arms_delay_for_video() {
        let policy = AutoAdvancePolicy {
            video_advance_mode: VideoAdvanceMode::Timer,
            ..enabled(250, false)
        };
        let store = store(vec![video(), image()], policy);
        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        let now = Instant::now();
        engine.on_live_changed(&store, Some(Position::new(0, 0)), now);
        assert_eq!(engine.state(), AdvanceState::TimerArmed);
        assert_eq!(engine.deadline(), Some(now + Duration::from_millis(250)));
    }

    #[test]
    fn test_timer_does_not_fire_early() {
        let store = store(vec![image(), image()], enabled(100, false));
        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        let now = Instant::now();
        let live = Some(Position::new(0, 0));
        engine.on_live_changed(&store, live, now);
        assert!(engine.fire_due(&store, live, now + Duration::from_millis(99)).is_none());
        assert_eq!(
            engine.fire_due(&store, live, now + Duration::from_millis(100)),
            Some(AdvanceStep::MoveTo(Position::new(0, 1)))
        );
    }

    #[test]
    fn test_repeat_wraps_multi_slide_stack() {
        let store = store(vec![image(), image()], enabled(100, true));
        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        let now = Instant::now();
        let live = Some(Position::new(0, 1));
        engine.on_live_changed(&store, live, now);
        assert_eq!(
            engine.fire_due(&store, live, now + Duration::from_millis(100)),
            Some(AdvanceStep::MoveTo(Position::new(0, 0)))
        );
    }

    #[test]
    fn test_single_slide_repeat_begins_reload() {
        let store = store(vec![image()], enabled(100, true));
        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        let now = Instant::now();
        let live = Some(Position::new(0, 0));
        engine.on_live_changed(&store, live, now);

        let fired_at = now + Duration::from_millis(100);
        assert_eq!(
            engine.fire_due(&store, live, fired_at),
            Some(AdvanceStep::BeginReload(Position::new(0, 0)))
        );
        assert_eq!(engine.state(), AdvanceState::ReloadSettling);
        assert_eq!(engine.deadline(), Some(fired_at + Duration::from_millis(50)));

        assert_eq!(
            engine.fire_due(&store, None, fired_at + Duration::from_millis(50)),
            Some(AdvanceStep::FinishReload(Position::new(0, 0)))
        );
    }

    #[test]
    fn test_stale_video_completion_is_ignored() {
        let store = store(vec![video(), image()], enabled(100, false));
        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        let now = Instant::now();
        engine.on_live_changed(&store, Some(Position::new(0, 1)), now);
        assert!(engine
            .on_video_complete(&store, Some(Position::new(0, 1)), now)
            .is_none());
    }

    #[test]
    fn test_reload_follows_stack_shifted_during_settle() {
        let mut store = SlideStore::new();
        store.add_stack("Announcements");
        store.add_slide(0, image());
        store.add_stack("Loop");
        store.add_slide(1, image());
        store.update_auto_advance(1, enabled(100, true));

        let mut engine = AutoAdvanceEngine::new(Duration::from_millis(50));
        let now = Instant::now();
        let live = Some(Position::new(1, 0));
        engine.on_live_changed(&store, live, now);

        let fired_at = now + Duration::from_millis(100);
        assert_eq!(
            engine.fire_due(&store, live, fired_at),
            Some(AdvanceStep::BeginReload(Position::new(1, 0)))
        );

        store.remove_stack(0);
        assert_eq!(
            engine.fire_due(&store, None, fired_at + Duration::from_millis(50)),
            Some(AdvanceStep::FinishReload(Position::new(0, 0)))
        );
    }
}
