//! Presentation document persistence

use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

use crate::error::{PresenterError, Result};
use crate::presentation::PresentationDocument;

/// Where presentation documents are loaded from and saved to
pub trait DocumentStore {
    fn load_document(&self) -> Result<PresentationDocument>;

    /// Persist `document`, stamping its save time
    fn save_document(&self, document: &PresentationDocument) -> Result<()>;

    /// Human-readable location for log messages
    fn location(&self) -> String;
}

/// A presentation stored as one pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    path: PathBuf,
}

impl JsonDocumentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentStore for JsonDocumentStore {
    fn load_document(&self) -> Result<PresentationDocument> {
        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| PresenterError::io(&self.path, e))?;
        let document = PresentationDocument::from_json(&contents)?;
        document.validate()?;
        info!(
            "Loaded presentation {:?} ({} stacks) from {:?}",
            document.title,
            document.stacks.len(),
            self.path
        );
        Ok(document)
    }

    fn save_document(&self, document: &PresentationDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| PresenterError::io(parent, e))?;
            }
        }

        let mut stamped = document.clone();
        stamped.saved_at = Some(Utc::now());
        let contents = stamped.to_json_pretty()?;

        // write to a sibling temp file first so a failed write keeps the old document
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| PresenterError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| PresenterError::io(&self.path, e))?;

        info!("Saved presentation {:?} to {:?}", stamped.title, self.path);
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::SlideStore;

    #[test]
    fn test_save_stamps_and_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDocumentStore::new(dir.path().join("service").join("sunday.json"));

        let mut slides = SlideStore::new();
        slides.add_stack("Welcome");
        let document = slides.serialize();
        assert!(document.saved_at.is_none());

        store.save_document(&document).unwrap();
        let loaded = store.load_document().unwrap();
        assert!(loaded.saved_at.is_some());
        assert_eq!(loaded.stacks, document.stacks);
        assert_eq!(loaded.title, "Sunday Service");
    }

    #[test]
    fn test_corrupt_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, r#"{"title":"x","stacks":[{"id":"a"}]}"#).unwrap();

        let err = JsonDocumentStore::new(&path).load_document().unwrap_err();
        assert!(matches!(err, PresenterError::Json(_)));
    }

    #[test]
    fn test_duplicate_stack_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dupes.json");
        std::fs::write(
            &path,
            r#"{"title":"x","stacks":[{"id":"a","title":"A"},{"id":"a","title":"B"}]}"#,
        )
        .unwrap();

        let err = JsonDocumentStore::new(&path).load_document().unwrap_err();
        assert!(matches!(err, PresenterError::InvalidDocument(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonDocumentStore::new(dir.path().join("nope.json"))
            .load_document()
            .unwrap_err();
        assert!(matches!(err, PresenterError::Io { .. }));
    }
}
