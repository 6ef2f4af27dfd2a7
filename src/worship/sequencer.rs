//! Worship sequencer
//!
//! Drives a single active worship stack: a setlist of songs, each split into
//! processed sections, with a staged section, a live section and a
//! background video policy. Live lyrics can be cleared while the background
//! keeps playing; a second clear blacks out entirely.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use super::sections::{process_sections, WorshipSection};
use super::song::SongLibrary;
use crate::projector::WorshipFrame;
use crate::timer::TimerSlot;

pub const DEFAULT_LINES_PER_SECTION: usize = 4;

/// How background videos are chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundMode {
    #[default]
    Single,
    PerSong,
    AutoRotate,
}

/// A worship stack as stored in the presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorshipStackData {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Song ids in running order
    #[serde(default)]
    pub setlist: Vec<String>,
    #[serde(default)]
    pub background_mode: BackgroundMode,
    /// Rotation list
    #[serde(default)]
    pub background_videos: Vec<String>,
    /// Declared video for `single` mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines_per_section: Option<usize>,
}

/// One entry of the setlist view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetlistEntry {
    pub id: String,
    pub index: usize,
    pub title: String,
    pub artist: String,
    pub is_current: bool,
}

#[derive(Debug, Clone)]
struct LoadedSong {
    id: String,
    title: Option<String>,
    artist: String,
    background_video: Option<String>,
    /// Empty when the song is missing from the library
    sections: Vec<WorshipSection>,
}

/// Position of the live lyrics: (song, section)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSection {
    pub song_index: usize,
    pub section_index: usize,
}

#[derive(Debug)]
struct ActiveWorship {
    data: WorshipStackData,
    songs: Vec<LoadedSong>,
}

#[derive(Debug)]
pub struct WorshipSequencer {
    active: Option<ActiveWorship>,
    current_song: usize,
    staged_section: usize,
    live: Option<LiveSection>,
    lyrics_cleared: bool,
    current_background: Option<String>,
    next_background: Option<String>,
    crossfade: TimerSlot<String>,
    crossfade_duration: Duration,
    default_lines_per_section: usize,
    frame_dirty: bool,
}

impl WorshipSequencer {
    pub fn new(crossfade_duration: Duration, default_lines_per_section: usize) -> Self {
        Self {
            active: None,
            current_song: 0,
            staged_section: 0,
            live: None,
            lyrics_cleared: false,
            current_background: None,
            next_background: None,
            crossfade: TimerSlot::new(),
            crossfade_duration,
            default_lines_per_section,
            frame_dirty: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn staged_section_index(&self) -> usize {
        self.staged_section
    }

    pub fn live(&self) -> Option<LiveSection> {
        self.live
    }

    pub fn lyrics_cleared(&self) -> bool {
        self.lyrics_cleared
    }

    pub fn current_background(&self) -> Option<&str> {
        self.current_background.as_deref()
    }

    pub fn next_background(&self) -> Option<&str> {
        self.next_background.as_deref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.crossfade.deadline()
    }

    /// Sections of the song at `song_index`
    pub fn sections(&self, song_index: usize) -> &[WorshipSection] {
        self.active
            .as_ref()
            .and_then(|a| a.songs.get(song_index))
            .map_or(&[], |song| song.sections.as_slice())
    }

    pub fn staged_section(&self) -> Option<&WorshipSection> {
        self.sections(self.current_song).get(self.staged_section)
    }

    pub fn live_section(&self) -> Option<&WorshipSection> {
        let live = self.live?;
        self.sections(live.song_index).get(live.section_index)
    }

    fn song(&self, index: usize) -> Option<&LoadedSong> {
        self.active.as_ref()?.songs.get(index)
    }

    fn setlist_len(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.songs.len())
    }

    /// Activate a worship stack, pre-processing every song in the setlist
    pub fn load_worship_stack(&mut self, data: WorshipStackData, library: &SongLibrary) {
        let lines_per_section = data
            .lines_per_section
            .unwrap_or(self.default_lines_per_section);

        let songs = data
            .setlist
            .iter()
            .map(|id| match library.find_by_id(id) {
                Some(song) => LoadedSong {
                    id: id.clone(),
                    title: Some(song.title.clone()),
                    artist: song.artist.clone(),
                    background_video: song.background_video().map(str::to_string),
                    sections: process_sections(&song.sections, lines_per_section),
                },
                None => {
                    debug!("Setlist song {} not in library", id);
                    LoadedSong {
                        id: id.clone(),
                        title: None,
                        artist: String::new(),
                        background_video: None,
                        sections: Vec::new(),
                    }
                }
            })
            .collect();

        info!(
            "Loaded worship stack {:?} with {} songs",
            data.title,
            data.setlist.len()
        );

        self.crossfade.cancel();
        self.current_song = 0;
        self.staged_section = 0;
        self.live = None;
        self.lyrics_cleared = false;
        self.next_background = None;
        self.current_background = None;
        self.active = Some(ActiveWorship { data, songs });

        let mode = self.background_mode();
        match mode {
            Some(BackgroundMode::Single) => {
                self.current_background = self.active.as_ref().and_then(|a| {
                    a.data
                        .background_video
                        .clone()
                        .or_else(|| a.data.background_videos.first().cloned())
                });
            }
            Some(BackgroundMode::PerSong) => self.load_background_for_current_song(),
            Some(BackgroundMode::AutoRotate) => {
                self.current_background = self.active.as_ref().and_then(|a| {
                    let videos = &a.data.background_videos;
                    if videos.is_empty() {
                        None
                    } else {
                        let pick = rand::thread_rng().gen_range(0..videos.len());
                        Some(videos[pick].clone())
                    }
                });
            }
            None => {}
        }
        self.frame_dirty = true;
    }

    /// Leave worship mode and forget everything, backgrounds included
    pub fn exit_worship_mode(&mut self) {
        if self.active.is_none() {
            return;
        }
        info!("Exiting worship mode");
        self.active = None;
        self.crossfade.cancel();
        self.current_song = 0;
        self.staged_section = 0;
        self.live = None;
        self.lyrics_cleared = false;
        self.current_background = None;
        self.next_background = None;
        self.frame_dirty = true;
    }

    fn background_mode(&self) -> Option<BackgroundMode> {
        self.active.as_ref().map(|a| a.data.background_mode)
    }

    fn load_background_for_current_song(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        let Some(song) = active.songs.get(self.current_song) else {
            return;
        };
        if let Some(video) = song
            .background_video
            .clone()
            .or_else(|| active.data.background_videos.first().cloned())
        {
            self.current_background = Some(video);
            self.frame_dirty = true;
        }
    }

    pub fn can_go_prev_section(&self) -> bool {
        self.staged_section > 0
    }

    pub fn can_go_next_section(&self) -> bool {
        self.staged_section + 1 < self.sections(self.current_song).len()
    }

    pub fn can_go_prev_song(&self) -> bool {
        self.is_active() && self.current_song > 0
    }

    pub fn can_go_next_song(&self) -> bool {
        self.current_song + 1 < self.setlist_len()
    }

    pub fn stage_section(&mut self, index: usize) -> bool {
        if index >= self.sections(self.current_song).len() {
            return false;
        }
        self.staged_section = index;
        true
    }

    pub fn next_section(&mut self) -> bool {
        if !self.can_go_next_section() {
            return false;
        }
        self.staged_section += 1;
        true
    }

    pub fn prev_section(&mut self) -> bool {
        if !self.can_go_prev_section() {
            return false;
        }
        self.staged_section -= 1;
        true
    }

    /// Select a song, staging its first section
    pub fn go_to_song(&mut self, index: usize, now: Instant) -> bool {
        if index >= self.setlist_len() {
            return false;
        }
        self.current_song = index;
        self.staged_section = 0;

        match self.background_mode() {
            Some(BackgroundMode::PerSong) => self.load_background_for_current_song(),
            Some(BackgroundMode::AutoRotate) => self.rotate_background_video(now),
            _ => {}
        }
        true
    }

    pub fn next_song(&mut self, now: Instant) -> bool {
        if !self.can_go_next_song() {
            return false;
        }
        self.go_to_song(self.current_song + 1, now)
    }

    pub fn prev_song(&mut self, now: Instant) -> bool {
        if !self.can_go_prev_song() {
            return false;
        }
        self.go_to_song(self.current_song - 1, now)
    }

    /// Start a crossfade to the next video in the rotation list
    pub fn rotate_background_video(&mut self, now: Instant) {
        let Some(videos) = self
            .active
            .as_ref()
            .map(|a| a.data.background_videos.clone())
        else {
            return;
        };
        if videos.is_empty() {
            return;
        }

        // a rotation during a crossfade commits the one in flight
        if let Some(pending) = self.crossfade.payload().cloned() {
            self.crossfade.cancel();
            self.current_background = Some(pending);
        }

        let next_index = self
            .current_background
            .as_ref()
            .and_then(|current| videos.iter().position(|v| v == current))
            .map_or(0, |i| (i + 1) % videos.len());
        let next = videos[next_index].clone();

        debug!("Crossfading background to {}", next);
        self.next_background = Some(next.clone());
        self.crossfade.arm(now, self.crossfade_duration, next);
        self.frame_dirty = true;
    }

    /// Commit a finished crossfade. Returns true if one completed.
    pub fn fire_due(&mut self, now: Instant) -> bool {
        let Some(video) = self.crossfade.take_due(now) else {
            return false;
        };
        self.current_background = Some(video);
        self.next_background = None;
        self.frame_dirty = true;
        true
    }

    /// Project the staged section
    pub fn go_live(&mut self) -> bool {
        if self.staged_section().is_none() {
            return false;
        }
        self.live = Some(LiveSection {
            song_index: self.current_song,
            section_index: self.staged_section,
        });
        self.lyrics_cleared = false;
        self.frame_dirty = true;
        info!(
            "Worship live: song {} section {}",
            self.current_song, self.staged_section
        );
        true
    }

    /// First call hides the lyrics, the next one blacks out
    pub fn clear_projection(&mut self) {
        if self.live.is_some() && !self.lyrics_cleared {
            info!("Worship lyrics cleared, background kept");
            self.lyrics_cleared = true;
        } else {
            info!("Worship blackout");
            self.live = None;
            self.lyrics_cleared = false;
        }
        self.frame_dirty = true;
    }

    pub fn setlist(&self) -> Vec<SetlistEntry> {
        let Some(active) = self.active.as_ref() else {
            return Vec::new();
        };
        active
            .songs
            .iter()
            .enumerate()
            .map(|(index, song)| SetlistEntry {
                id: song.id.clone(),
                index,
                title: song
                    .title
                    .clone()
                    .unwrap_or_else(|| "Unknown Song".to_string()),
                artist: song.artist.clone(),
                is_current: index == self.current_song,
            })
            .collect()
    }

    /// Whether the projector frame changed since the last call
    pub fn take_frame_dirty(&mut self) -> bool {
        std::mem::take(&mut self.frame_dirty)
    }

    pub fn frame(&self, library_root: Option<&str>, text_scale: u32) -> WorshipFrame {
        WorshipFrame {
            song_title: self
                .live
                .and_then(|live| self.song(live.song_index))
                .and_then(|song| song.title.clone()),
            section: self.live_section().cloned(),
            lyrics_cleared: self.lyrics_cleared,
            background_video: self.current_background.clone(),
            next_background_video: self.next_background.clone(),
            library_root: library_root.map(str::to_string),
            text_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worship::song::{RawSection, Song, SongPresentation};

    fn song(id: &str, title: &str, verses: usize) -> Song {
        Song {
            id: id.to_string(),
            sections: (0..verses)
                .map(|i| RawSection {
                    title: format!("Verse {}", i + 1),
                    lines: vec![vec![(String::new(), "la".to_string())]],
                })
                .collect(),
            ..Song::new(title)
        }
    }

    fn library() -> SongLibrary {
        let mut second = song("b", "How Great", 1);
        second.presentation = Some(SongPresentation {
            background_video: Some("clouds.mp4".to_string()),
        });
        SongLibrary::from_songs(vec![song("a", "Amazing Grace", 2), second])
    }

    fn stack(mode: BackgroundMode, setlist: &[&str]) -> WorshipStackData {
        WorshipStackData {
            id: "w1".to_string(),
            title: "Worship".to_string(),
            setlist: setlist.iter().map(|s| s.to_string()).collect(),
            background_mode: mode,
            background_videos: vec!["one.mp4".to_string(), "two.mp4".to_string()],
            background_video: None,
            lines_per_section: None,
        }
    }

    fn sequencer() -> WorshipSequencer {
        WorshipSequencer::new(Duration::from_millis(3000), DEFAULT_LINES_PER_SECTION)
    }

    #[test]
    fn test_load_processes_sections_and_resets() {
        let mut seq = sequencer();
        seq.load_worship_stack(stack(BackgroundMode::Single, &["a", "b"]), &library());

        let titles: Vec<_> = seq.sections(0).iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Verse 1", "Verse 2", "Outro"]);
        assert_eq!(seq.staged_section_index(), 0);
        assert!(seq.live().is_none());
        assert_eq!(seq.current_background(), Some("one.mp4"));
        assert!(seq.take_frame_dirty());
        assert!(!seq.take_frame_dirty());
    }

    #[test]
    fn test_two_stage_clear() {
        let mut seq = sequencer();
        seq.load_worship_stack(stack(BackgroundMode::Single, &["a"]), &library());
        seq.next_section();
        assert!(seq.go_live());

        seq.clear_projection();
        assert!(seq.lyrics_cleared());
        assert_eq!(
            seq.live(),
            Some(LiveSection {
                song_index: 0,
                section_index: 1
            })
        );

        seq.clear_projection();
        assert!(seq.live().is_none());
        assert!(!seq.lyrics_cleared());
        assert_eq!(seq.current_background(), Some("one.mp4"));
    }

    #[test]
    fn test_go_live_restores_lyrics() {
        let mut seq = sequencer();
        seq.load_worship_stack(stack(BackgroundMode::Single, &["a"]), &library());
        seq.go_live();
        seq.clear_projection();
        seq.go_live();
        assert!(!seq.lyrics_cleared());
        assert_eq!(seq.frame(None, 100).section.map(|s| s.title), Some("Intro".to_string()));
    }

    #[test]
    fn test_song_navigation_resets_section_and_loads_per_song_video() {
        let now = Instant::now();
        let mut seq = sequencer();
        seq.load_worship_stack(stack(BackgroundMode::PerSong, &["a", "b"]), &library());
        assert_eq!(seq.current_background(), Some("one.mp4"));

        seq.next_section();
        assert!(seq.next_song(now));
        assert_eq!(seq.staged_section_index(), 0);
        assert_eq!(seq.current_background(), Some("clouds.mp4"));
        assert!(!seq.next_song(now));
        assert!(seq.prev_song(now));
        assert!(!seq.prev_song(now));
    }

    #[test]
    fn test_auto_rotate_crossfades_then_commits() {
        let now = Instant::now();
        let mut seq = sequencer();
        seq.load_worship_stack(stack(BackgroundMode::AutoRotate, &["a", "b"]), &library());
        let first = seq.current_background().map(str::to_string);
        assert!(first.is_some());

        seq.go_to_song(1, now);
        let expected = if first.as_deref() == Some("one.mp4") { "two.mp4" } else { "one.mp4" };
        assert_eq!(seq.current_background(), first.as_deref());
        assert_eq!(seq.next_background(), Some(expected));

        assert!(!seq.fire_due(now + Duration::from_millis(2999)));
        assert!(seq.fire_due(now + Duration::from_millis(3000)));
        assert_eq!(seq.current_background(), Some(expected));
        assert!(seq.next_background().is_none());
    }

    #[test]
    fn test_missing_song_shows_unknown_and_has_no_sections() {
        let mut seq = sequencer();
        seq.load_worship_stack(stack(BackgroundMode::Single, &["a", "gone"]), &library());
        let setlist = seq.setlist();
        assert_eq!(setlist[1].title, "Unknown Song");
        assert!(setlist[0].is_current);

        seq.go_to_song(1, Instant::now());
        assert!(seq.sections(1).is_empty());
        assert!(!seq.go_live());
    }

    #[test]
    fn test_exit_clears_backgrounds() {
        let mut seq = sequencer();
        seq.load_worship_stack(stack(BackgroundMode::Single, &["a"]), &library());
        seq.exit_worship_mode();
        assert!(!seq.is_active());
        assert!(seq.current_background().is_none());
        assert!(seq.setlist().is_empty());
    }
}
