//! Slide store: the ordered collection of stacks
//!
//! Pure data plus mutation. Index bookkeeping for the staged and live
//! cursors lives in the controller, which reacts to the `StoreChange`
//! each mutation returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::slide::{AutoAdvancePolicy, Slide, Stack};
use crate::error::{PresenterError, Result};

/// Persisted presentation document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationDocument {
    pub title: String,
    pub stacks: Vec<Stack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl PresentationDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject documents the store could not hold consistently
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (index, stack) in self.stacks.iter().enumerate() {
            if stack.id.is_empty() {
                return Err(PresenterError::InvalidDocument(format!(
                    "stack {} has an empty id",
                    index
                )));
            }
            if !seen.insert(stack.id.as_str()) {
                return Err(PresenterError::InvalidDocument(format!(
                    "duplicate stack id {:?}",
                    stack.id
                )));
            }
        }
        Ok(())
    }
}

/// What a store mutation did, for cursor bookkeeping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    StackAdded { index: usize },
    StackRemoved { index: usize },
    SlideAdded { stack_index: usize, slide_index: usize },
    SlideRemoved { stack_index: usize, slide_index: usize },
    PolicyUpdated { stack_index: usize },
}

const DEFAULT_TITLE: &str = "Sunday Service";

/// Owns the ordered stacks of one running presentation
#[derive(Debug, Clone, PartialEq)]
pub struct SlideStore {
    title: String,
    stacks: Vec<Stack>,
}

impl Default for SlideStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideStore {
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            stacks: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn stack(&self, index: usize) -> Option<&Stack> {
        self.stacks.get(index)
    }

    pub fn slide(&self, stack_index: usize, slide_index: usize) -> Option<&Slide> {
        self.stacks.get(stack_index)?.slides.get(slide_index)
    }

    /// Number of slides in a stack, 0 for a missing stack
    pub fn slide_count(&self, stack_index: usize) -> usize {
        self.stacks.get(stack_index).map_or(0, |s| s.slides.len())
    }

    pub fn add_stack(&mut self, title: impl Into<String>) -> (String, StoreChange) {
        let stack = Stack::new(title);
        let id = stack.id.clone();
        self.stacks.push(stack);
        (id, StoreChange::StackAdded { index: self.stacks.len() - 1 })
    }

    /// Remove a stack. Refused when out of range or when it is the last one.
    pub fn remove_stack(&mut self, index: usize) -> Option<StoreChange> {
        if self.stacks.len() <= 1 || index >= self.stacks.len() {
            return None;
        }
        self.stacks.remove(index);
        Some(StoreChange::StackRemoved { index })
    }

    pub fn add_slide(&mut self, stack_index: usize, slide: Slide) -> Option<StoreChange> {
        let stack = self.stacks.get_mut(stack_index)?;
        stack.slides.push(slide);
        Some(StoreChange::SlideAdded {
            stack_index,
            slide_index: stack.slides.len() - 1,
        })
    }

    pub fn remove_slide(&mut self, stack_index: usize, slide_index: usize) -> Option<StoreChange> {
        let stack = self.stacks.get_mut(stack_index)?;
        if slide_index >= stack.slides.len() {
            return None;
        }
        stack.slides.remove(slide_index);
        Some(StoreChange::SlideRemoved {
            stack_index,
            slide_index,
        })
    }

    pub fn update_auto_advance(
        &mut self,
        stack_index: usize,
        policy: AutoAdvancePolicy,
    ) -> Option<StoreChange> {
        let stack = self.stacks.get_mut(stack_index)?;
        stack.auto_advance = policy;
        Some(StoreChange::PolicyUpdated { stack_index })
    }

    pub fn serialize(&self) -> PresentationDocument {
        PresentationDocument {
            title: self.title.clone(),
            stacks: self.stacks.clone(),
            saved_at: None,
        }
    }

    /// Build a store from a document; all-or-nothing
    pub fn deserialize(document: PresentationDocument) -> Result<Self> {
        document.validate()?;
        Ok(Self {
            title: document.title,
            stacks: document.stacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(title: &str) -> Slide {
        Slide::Image {
            title: title.to_string(),
            image_url: format!("assets://{}.png", title),
        }
    }

    #[test]
    fn test_last_stack_cannot_be_removed() {
        let mut store = SlideStore::new();
        store.add_stack("Only");
        assert!(store.remove_stack(0).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_out_of_range_mutations_are_ignored() {
        let mut store = SlideStore::new();
        store.add_stack("Welcome");
        assert!(store.add_slide(3, image("a")).is_none());
        assert!(store.remove_slide(0, 0).is_none());
        assert!(store.update_auto_advance(9, AutoAdvancePolicy::default()).is_none());
        assert_eq!(store.slide_count(0), 0);
    }

    #[test]
    fn test_stack_ids_are_unique() {
        let mut store = SlideStore::new();
        let (a, _) = store.add_stack("A");
        let (b, _) = store.add_stack("A");
        assert_ne!(a, b);
    }

    #[test]
    fn test_document_with_duplicate_ids_is_rejected() {
        let mut store = SlideStore::new();
        store.add_stack("A");
        let mut doc = store.serialize();
        doc.stacks.push(doc.stacks[0].clone());

        let err = SlideStore::deserialize(doc).unwrap_err();
        assert!(matches!(err, PresenterError::InvalidDocument(_)));
    }

    #[test]
    fn test_document_json_round_trip_preserves_stacks() {
        let mut store = SlideStore::new();
        store.add_stack("Welcome");
        store.add_slide(0, image("one"));
        let json = store.serialize().to_json_pretty().unwrap();

        let restored = SlideStore::deserialize(PresentationDocument::from_json(&json).unwrap()).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn test_legacy_document_loads() {
        let json = r##"{
            "title": "Sunday Service",
            "stacks": [{
                "id": "1",
                "title": "Welcome",
                "autoAdvance": {"enabled": false, "delay": 5000, "videoAdvance": "video-end", "repeat": false, "transition": "fade"},
                "slides": [
                    {"type": "image", "imageUrl": "assets://a.png", "title": "Welcome 1"},
                    {"type": "custom", "html": "<p>hi</p>", "background": "#000", "title": "Welcome 2"}
                ]
            }]
        }"##;
        let store = SlideStore::deserialize(PresentationDocument::from_json(json).unwrap()).unwrap();
        assert_eq!(store.slide_count(0), 2);
        assert_eq!(store.slide(0, 1).map(|s| s.title()), Some("Welcome 2"));
    }
}
