//! Worship mode: songs, section processing and the worship sequencer

pub mod chordpro;
pub mod onsong;
mod sections;
mod sequencer;
mod song;

pub use sections::{process_sections, WorshipSection, INTRO_TITLE, OUTRO_TITLE};
pub use sequencer::{
    BackgroundMode, LiveSection, SetlistEntry, WorshipSequencer, WorshipStackData,
    DEFAULT_LINES_PER_SECTION,
};
pub use song::{ChordPair, ImportReport, RawSection, Song, SongLibrary, SongLine, SongPresentation};
