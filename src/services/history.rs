use crate::models::Story;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Durable, newest-first collection of saved stories.
///
/// The whole collection lives in one JSON file: it is read once at open and
/// rewritten in full before every mutating call returns, so a restart sees
/// exactly what the last successful call left behind.
pub struct HistoryStore {
    path: PathBuf,
    stories: Vec<Story>,
}

impl HistoryStore {
    /// Opens the store at `path`, creating parent directories as needed. A
    /// missing file is an empty store, not an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let stories = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt history file {}", path.display()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
        };
        Ok(HistoryStore { path, stories })
    }

    /// Inserts `content` as a new story, or updates an existing record in
    /// place when `content` equals or continues that record's content. The
    /// updated record keeps its id, creation time, and list position; a new
    /// record goes to the front.
    pub fn add(&mut self, content: &str) -> Result<Story> {
        let existing = self
            .stories
            .iter_mut()
            .find(|s| s.content == content || content.starts_with(&s.content));

        let story = match existing {
            Some(story) => {
                story.replace_content(content);
                story.clone()
            }
            None => {
                let story = Story::new(content);
                self.stories.insert(0, story.clone());
                story
            }
        };

        self.persist()?;
        Ok(story)
    }

    /// Updates the record with the given id. Unknown ids are an error; the
    /// continuation path always knows which story it extends.
    pub fn update(&mut self, id: &str, content: &str) -> Result<Story> {
        let story = self
            .stories
            .iter_mut()
            .find(|s| s.id == id)
            .with_context(|| format!("no history record with id {id}"))?;
        story.replace_content(content);
        let story = story.clone();
        self.persist()?;
        Ok(story)
    }

    pub fn get(&self, id: &str) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }

    /// Removes the record with the given id. Deleting a missing id is a
    /// no-op.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.stories.len();
        self.stories.retain(|s| s.id != id);
        if self.stories.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    /// All saved stories, newest first.
    pub fn list(&self) -> &[Story] {
        &self.stories
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(&self.stories)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path().join("stories.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn add_creates_record_with_preview() {
        let (_dir, mut store) = temp_store();
        let story = store.add("Hello world").unwrap();

        assert_eq!(store.list().len(), 1);
        assert_eq!(story.preview, "Hello world...");
        assert_eq!(story.content, "Hello world");
    }

    #[test]
    fn add_with_continuation_updates_in_place() {
        let (_dir, mut store) = temp_store();
        let original = store.add("Hello world").unwrap();
        let updated = store.add("Hello world\n\nMore text").unwrap();

        assert_eq!(store.list().len(), 1);
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.content, "Hello world\n\nMore text");
    }

    #[test]
    fn add_with_new_content_inserts_at_front() {
        let (_dir, mut store) = temp_store();
        let first = store.add("An old tale").unwrap();
        let second = store.add("A brand new tale").unwrap();

        assert_ne!(first.id, second.id);
        let ids: Vec<&str> = store.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[test]
    fn update_by_id_does_not_duplicate() {
        let (_dir, mut store) = temp_store();
        let story = store.add("Hello world").unwrap();
        let updated = store.update(&story.id, "Hello world\n\nMore text").unwrap();

        assert_eq!(store.list().len(), 1);
        assert_eq!(updated.id, story.id);
        assert_eq!(store.get(&story.id).unwrap().content, "Hello world\n\nMore text");
    }

    #[test]
    fn update_unknown_id_is_an_error() {
        let (_dir, mut store) = temp_store();
        assert!(store.update("missing", "text").is_err());
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, mut store) = temp_store();
        let story = store.add("A doomed tale").unwrap();

        store.delete(&story.id).unwrap();
        assert!(store.list().is_empty());
        store.delete(&story.id).unwrap();
        store.delete("never existed").unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stories.json");

        let kept_id = {
            let mut store = HistoryStore::open(&path).unwrap();
            store.add("A persistent tale").unwrap();
            let doomed = store.add("A doomed tale").unwrap();
            store.delete(&doomed.id).unwrap();
            store.list()[0].id.clone()
        };

        let store = HistoryStore::open(&path).unwrap();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].id, kept_id);
        assert_eq!(store.list()[0].content, "A persistent tale");
    }

    #[test]
    fn persisted_records_use_camel_case_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stories.json");
        let mut store = HistoryStore::open(&path).unwrap();
        store.add("Hello world").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"createdAt\""));
        assert!(raw.contains("\"preview\""));
    }
}
