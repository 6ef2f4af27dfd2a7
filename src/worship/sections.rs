//! Section processing: splitting long sections and adding Intro/Outro

use serde::{Deserialize, Serialize};

use super::song::{RawSection, SongLine};

pub const INTRO_TITLE: &str = "Intro";
pub const OUTRO_TITLE: &str = "Outro";

/// A section ready to be staged and sent live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorshipSection {
    pub title: String,
    pub lines: Vec<SongLine>,
    /// Title of the authored section this part was split from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_section: Option<String>,
    /// 1-based part number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_parts: Option<usize>,
}

impl WorshipSection {
    /// Section with no lyrics; shows only the background
    pub fn blank(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: Vec::new(),
            original_section: None,
            part: None,
            total_parts: None,
        }
    }
}

/// Split every section longer than `lines_per_section` into numbered parts,
/// in source order, then make sure the result starts with Intro and ends
/// with Outro. A limit of 0 disables splitting.
pub fn process_sections(raw: &[RawSection], lines_per_section: usize) -> Vec<WorshipSection> {
    let mut processed = Vec::with_capacity(raw.len() + 2);

    for section in raw {
        if lines_per_section == 0 || section.lines.len() <= lines_per_section {
            processed.push(WorshipSection {
                title: section.title.clone(),
                lines: section.lines.clone(),
                original_section: None,
                part: None,
                total_parts: None,
            });
            continue;
        }

        let total = section.lines.len().div_ceil(lines_per_section);
        for (i, chunk) in section.lines.chunks(lines_per_section).enumerate() {
            processed.push(WorshipSection {
                title: format!("{} ({}/{})", section.title, i + 1, total),
                lines: chunk.to_vec(),
                original_section: Some(section.title.clone()),
                part: Some(i + 1),
                total_parts: Some(total),
            });
        }
    }

    if processed.first().map(|s| s.title.as_str()) != Some(INTRO_TITLE) {
        processed.insert(0, WorshipSection::blank(INTRO_TITLE));
    }
    if processed.len() < 2 || processed.last().map(|s| s.title.as_str()) != Some(OUTRO_TITLE) {
        processed.push(WorshipSection::blank(OUTRO_TITLE));
    }

    processed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title: &str, count: usize) -> RawSection {
        RawSection {
            title: title.to_string(),
            lines: (0..count)
                .map(|i| vec![(String::new(), format!("line {}", i))])
                .collect(),
        }
    }

    #[test]
    fn test_long_section_splits_into_numbered_parts() {
        let processed = process_sections(&[section("Verse 1", 10)], 4);
        let titles: Vec<_> = processed.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Intro", "Verse 1 (1/3)", "Verse 1 (2/3)", "Verse 1 (3/3)", "Outro"]
        );

        let parts = &processed[1..4];
        assert!(parts.iter().all(|p| p.lines.len() <= 4));
        let lyrics: Vec<_> = parts
            .iter()
            .flat_map(|p| p.lines.iter().map(|l| l[0].1.clone()))
            .collect();
        let expected: Vec<_> = (0..10).map(|i| format!("line {}", i)).collect();
        assert_eq!(lyrics, expected);

        assert_eq!(parts[2].part, Some(3));
        assert_eq!(parts[2].total_parts, Some(3));
        assert_eq!(parts[0].original_section.as_deref(), Some("Verse 1"));

        assert!(processed[0].lines.is_empty());
        assert!(processed[4].lines.is_empty());
    }

    #[test]
    fn test_short_sections_are_untouched() {
        let processed = process_sections(&[section("Chorus", 4)], 4);
        assert_eq!(processed[1].title, "Chorus");
        assert_eq!(processed[1].part, None);
    }

    #[test]
    fn test_existing_intro_and_outro_are_kept() {
        let raw = vec![section("Intro", 1), section("Verse", 2), section("Outro", 1)];
        let processed = process_sections(&raw, 4);
        assert_eq!(processed.len(), 3);
        assert_eq!(processed[0].lines.len(), 1);
        assert_eq!(processed[2].lines.len(), 1);
    }

    #[test]
    fn test_empty_song_gets_intro_and_outro() {
        let processed = process_sections(&[], 4);
        let titles: Vec<_> = processed.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Intro", "Outro"]);
    }
}
