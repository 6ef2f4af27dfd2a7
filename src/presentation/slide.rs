//! Slide, stack and auto-advance policy data structures

use serde::{Deserialize, Serialize};

/// A single projectable slide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Slide {
    /// Still image
    #[serde(rename_all = "camelCase")]
    Image {
        #[serde(default)]
        title: String,
        image_url: String,
    },

    /// Local video file
    #[serde(rename_all = "camelCase")]
    Video {
        #[serde(default)]
        title: String,
        video_url: String,
        /// Restart playback at the end instead of stopping
        #[serde(default, rename = "loop")]
        looping: bool,
        #[serde(default)]
        muted: bool,
    },

    /// Embedded YouTube video
    #[serde(rename_all = "camelCase")]
    Youtube {
        #[serde(default)]
        title: String,
        video_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    /// Bible passage
    #[serde(rename_all = "camelCase")]
    Bible {
        #[serde(default)]
        title: String,
        reference: String,
        text: String,
        #[serde(default)]
        translation: String,
    },

    /// Arbitrary HTML content
    #[serde(rename_all = "camelCase")]
    Custom {
        #[serde(default)]
        title: String,
        html: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        background: Option<String>,
    },

    /// Reference to a song in the song library
    #[serde(rename_all = "camelCase")]
    Worship {
        #[serde(default)]
        title: String,
        song_id: String,
    },
}

impl Slide {
    /// Wire name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Slide::Image { .. } => "image",
            Slide::Video { .. } => "video",
            Slide::Youtube { .. } => "youtube",
            Slide::Bible { .. } => "bible",
            Slide::Custom { .. } => "custom",
            Slide::Worship { .. } => "worship",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Slide::Image { title, .. }
            | Slide::Video { title, .. }
            | Slide::Youtube { title, .. }
            | Slide::Bible { title, .. }
            | Slide::Custom { title, .. }
            | Slide::Worship { title, .. } => title,
        }
    }

    /// Title for display, falling back to "<type> slide" when untitled
    pub fn display_title(&self) -> String {
        let title = self.title();
        if title.is_empty() {
            format!("{} slide", self.kind())
        } else {
            title.to_string()
        }
    }

    /// Whether the slide plays media that signals its own end
    pub fn is_video(&self) -> bool {
        match self {
            Slide::Video { .. } | Slide::Youtube { .. } => true,
            Slide::Image { .. } | Slide::Bible { .. } | Slide::Custom { .. } | Slide::Worship { .. } => {
                false
            }
        }
    }

    /// Library media reference that may need resolving before projection
    pub fn asset_url(&self) -> Option<&str> {
        match self {
            Slide::Image { image_url, .. } => Some(image_url),
            Slide::Video { video_url, .. } => Some(video_url),
            Slide::Youtube { .. } | Slide::Bible { .. } | Slide::Custom { .. } | Slide::Worship { .. } => {
                None
            }
        }
    }

    /// Replace the library media reference, if the variant carries one
    pub fn set_asset_url(&mut self, resolved: String) {
        match self {
            Slide::Image { image_url, .. } => *image_url = resolved,
            Slide::Video { video_url, .. } => *video_url = resolved,
            Slide::Youtube { .. } | Slide::Bible { .. } | Slide::Custom { .. } | Slide::Worship { .. } => {}
        }
    }
}

/// How video and YouTube slides decide when to advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoAdvanceMode {
    /// Wait for the projector to report the end of playback
    #[default]
    VideoEnd,
    /// Use the stack delay like any other slide
    Timer,
}

/// Visual transition the projector applies between slides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transition {
    None,
    #[default]
    Fade,
    Slide,
}

/// Per-stack auto-advance settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoAdvancePolicy {
    #[serde(default)]
    pub enabled: bool,

    /// Delay before advancing timer-driven slides (ms)
    #[serde(default = "default_delay_ms", alias = "delay")]
    pub delay_ms: u64,

    #[serde(default, alias = "videoAdvance")]
    pub video_advance_mode: VideoAdvanceMode,

    /// Wrap back to the first slide after the last one
    #[serde(default)]
    pub repeat: bool,

    #[serde(default)]
    pub transition: Transition,
}

fn default_delay_ms() -> u64 {
    5000
}

impl Default for AutoAdvancePolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: default_delay_ms(),
            video_advance_mode: VideoAdvanceMode::default(),
            repeat: false,
            transition: Transition::default(),
        }
    }
}

impl AutoAdvancePolicy {
    /// Whether `slide` waits for a video-end signal instead of a timer
    pub fn waits_for_video_end(&self, slide: &Slide) -> bool {
        slide.is_video() && self.video_advance_mode == VideoAdvanceMode::VideoEnd
    }
}

/// An ordered group of slides presented as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub auto_advance: AutoAdvancePolicy,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Stack {
    /// Create an empty stack with a fresh unique id and default policy
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            auto_advance: AutoAdvancePolicy::default(),
            slides: Vec::new(),
        }
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    pub fn last_index(&self) -> Option<usize> {
        self.slides.len().checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_wire_format_uses_type_tag() {
        let slide = Slide::Image {
            title: "Welcome".to_string(),
            image_url: "assets://welcome.png".to_string(),
        };
        let json = serde_json::to_value(&slide).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["imageUrl"], "assets://welcome.png");

        let video: Slide =
            serde_json::from_str(r#"{"type":"video","videoUrl":"assets://intro.mp4","loop":true}"#)
                .unwrap();
        assert!(matches!(video, Slide::Video { looping: true, muted: false, .. }));
        assert_eq!(video.title(), "");
    }

    #[test]
    fn test_policy_accepts_legacy_field_names() {
        let json = r#"{"enabled":true,"delay":3000,"videoAdvance":"timer","repeat":true,"transition":"none"}"#;
        let policy: AutoAdvancePolicy = serde_json::from_str(json).unwrap();
        assert!(policy.enabled);
        assert_eq!(policy.delay_ms, 3000);
        assert_eq!(policy.video_advance_mode, VideoAdvanceMode::Timer);
        assert_eq!(policy.transition, Transition::None);
    }

    #[test]
    fn test_only_video_slides_wait_for_video_end() {
        let policy = AutoAdvancePolicy::default();
        let video = Slide::Youtube {
            title: String::new(),
            video_id: "abc".to_string(),
            url: None,
        };
        let bible = Slide::Bible {
            title: "John 3:16".to_string(),
            reference: "John 3:16".to_string(),
            text: "For God so loved the world".to_string(),
            translation: "KJV".to_string(),
        };
        assert!(policy.waits_for_video_end(&video));
        assert!(!policy.waits_for_video_end(&bible));

        let timer = AutoAdvancePolicy {
            video_advance_mode: VideoAdvanceMode::Timer,
            ..AutoAdvancePolicy::default()
        };
        assert!(!timer.waits_for_video_end(&video));
    }

    #[test]
    fn test_display_title_falls_back_to_kind() {
        let slide = Slide::Custom {
            title: String::new(),
            html: "<h1>Hi</h1>".to_string(),
            background: None,
        };
        assert_eq!(slide.display_title(), "custom slide");
    }
}
