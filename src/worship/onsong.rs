//! OnSong song parser
//!
//! OnSong files open with a `Key: Value` metadata block terminated by the
//! first blank line. Section headers are bare lines ending in a colon, or
//! ChordPro-style `{c: Name}` comments. Chords use the inline `[C]` form.

use super::chordpro::{parse_chord_line, parse_directive};
use super::song::{default_key, default_tempo, RawSection, Song};

fn is_section_header(line: &str) -> Option<&str> {
    if line.ends_with(':') && !line.contains('[') {
        return Some(line[..line.len() - 1].trim());
    }
    None
}

/// Parse OnSong text. `fallback_title` is used when there is no `Title:`.
pub fn parse(data: &str, fallback_title: &str) -> Song {
    let mut song = Song::new(fallback_title);
    let mut key = None;
    let mut sections = Vec::new();
    let mut current: Option<RawSection> = None;
    let mut in_metadata = true;

    fn close(current: &mut Option<RawSection>, sections: &mut Vec<RawSection>) {
        if let Some(section) = current.take() {
            if !section.lines.is_empty() {
                sections.push(section);
            }
        }
    }

    for line in data.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            in_metadata = false;
            continue;
        }

        if in_metadata {
            if let Some((field, value)) = trimmed.split_once(':') {
                let value = value.trim();
                match field.trim() {
                    "Title" => song.title = value.to_string(),
                    "Artist" => song.artist = value.to_string(),
                    "Key" => key = Some(value.to_string()).filter(|k| !k.is_empty()),
                    "Tempo" => song.tempo = value.parse().unwrap_or_else(|_| default_tempo()),
                    "Time" => song.time_signature = value.to_string(),
                    "CCLI" => song.ccli = value.to_string(),
                    _ => {}
                }
            }
            continue;
        }

        if let Some(name) = is_section_header(trimmed) {
            close(&mut current, &mut sections);
            current = Some(RawSection {
                title: name.to_string(),
                lines: Vec::new(),
            });
            continue;
        }

        if trimmed.starts_with("{c:") || trimmed.starts_with("{comment:") {
            close(&mut current, &mut sections);
            let name = parse_directive(trimmed)
                .and_then(|(_, value)| value)
                .filter(|v| !v.is_empty())
                .unwrap_or("Section");
            current = Some(RawSection {
                title: name.to_string(),
                lines: Vec::new(),
            });
            continue;
        }

        let parsed = parse_chord_line(trimmed);
        if parsed.is_empty() {
            continue;
        }
        current
            .get_or_insert_with(|| RawSection {
                title: "Verse".to_string(),
                lines: Vec::new(),
            })
            .lines
            .push(parsed);
    }
    close(&mut current, &mut sections);

    song.key = key.unwrap_or_else(default_key);
    song.sections = sections;
    song
}
