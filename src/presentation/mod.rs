//! Presentation state: slides, staging, live position and auto-advance

mod auto_advance;
mod controller;
mod cursor;
mod slide;
mod store;

pub use auto_advance::{AdvanceState, AdvanceStep, AutoAdvanceEngine};
pub use controller::{PresentationController, PresentationEvent, Timing, DEFAULT_TEXT_SCALE};
pub use cursor::{adjust_live, LiveAdjustment, LivePosition, Position, StagingCursor};
pub use slide::{AutoAdvancePolicy, Slide, Stack, Transition, VideoAdvanceMode};
pub use store::{PresentationDocument, SlideStore, StoreChange};
