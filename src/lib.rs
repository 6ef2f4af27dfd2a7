//! DongleControl presenter core
//!
//! Staged/live slide state for live-event projection: stacks of slides,
//! an operator's staged cursor, the live position, timer and video-driven
//! auto-advance, worship song sequencing, and debounced delivery of the
//! live state to a projector surface and remote observers.

pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod presentation;
pub mod projector;
pub mod remote;
pub mod timer;
pub mod worship;

pub use error::{PresenterError, Result};
