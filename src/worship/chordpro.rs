//! ChordPro song parser

use super::song::{default_key, default_tempo, default_time_signature, RawSection, Song, SongLine};

/// Split `{name: value}` into its name and optional value
pub(crate) fn parse_directive(line: &str) -> Option<(&str, Option<&str>)> {
    let body = line.strip_prefix('{')?;
    let body = body.split('}').next().unwrap_or(body);
    match body.split_once(':') {
        Some((name, value)) => Some((name.trim(), Some(value.trim()))),
        None => Some((body.trim(), None)),
    }
}

/// Parse an inline-chord line into `[chord, lyric]` pairs
///
/// `"You're [C]rich in[G] love"` becomes
/// `[("", "You're "), ("C", "rich in"), ("G", " love")]`.
pub fn parse_chord_line(line: &str) -> SongLine {
    let mut result = Vec::new();
    let mut chord = String::new();
    let mut lyric = String::new();
    let mut rest = line;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if !chord.is_empty() || !lyric.is_empty() {
                result.push((std::mem::take(&mut chord), std::mem::take(&mut lyric)));
            }
            match rest.find(']') {
                Some(end) => {
                    chord = rest[1..end].to_string();
                    rest = &rest[end + 1..];
                }
                None => rest = &rest[1..],
            }
        } else {
            lyric.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    if !chord.is_empty() || !lyric.is_empty() {
        result.push((chord, lyric));
    }
    result
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Parse ChordPro text. `fallback_title` is used when there is no `{title}`.
pub fn parse(data: &str, fallback_title: &str) -> Song {
    let mut song = Song::new(fallback_title);
    let mut key = None;
    let mut sections = Vec::new();
    let mut current: Option<RawSection> = None;

    fn close(current: &mut Option<RawSection>, sections: &mut Vec<RawSection>) {
        if let Some(section) = current.take() {
            if !section.lines.is_empty() {
                sections.push(section);
            }
        }
    }

    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((name, value)) = parse_directive(line) {
            match name {
                "title" | "t" => {
                    if let Some(title) = non_empty(value) {
                        song.title = title;
                    }
                }
                "artist" | "a" => song.artist = value.unwrap_or_default().to_string(),
                "key" | "k" => key = non_empty(value),
                "tempo" => {
                    if let Some(tempo) = value.and_then(|v| v.parse().ok()) {
                        song.tempo = tempo;
                    }
                }
                "time" => {
                    song.time_signature = non_empty(value).unwrap_or_else(default_time_signature)
                }
                "ccli" => song.ccli = value.unwrap_or_default().to_string(),
                "soc" => {
                    close(&mut current, &mut sections);
                    current = Some(RawSection {
                        title: non_empty(value).unwrap_or_else(|| "Section".to_string()),
                        lines: Vec::new(),
                    });
                }
                "eoc" => close(&mut current, &mut sections),
                _ if name.starts_with("start_of_") => {
                    close(&mut current, &mut sections);
                    let kind = &name["start_of_".len()..];
                    let title = non_empty(value)
                        .or_else(|| non_empty(Some(kind)))
                        .unwrap_or_else(|| "Section".to_string());
                    current = Some(RawSection {
                        title: capitalize(&title),
                        lines: Vec::new(),
                    });
                }
                _ if name.starts_with("end_of_") => close(&mut current, &mut sections),
                _ => {}
            }
            continue;
        }

        let parsed = parse_chord_line(line);
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
    if song.tempo == 0 {
        song.tempo = default_tempo();
    }
    song.sections = sections;
    song
}
