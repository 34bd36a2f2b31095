use crate::models::{SessionSnapshot, Story, View, Viewport};
use crate::services::generator::{Generate, seed_prompt};
use crate::services::history::HistoryStore;
use crate::services::paginator::{FontMetricsMeasurer, paginate};
use tokio::sync::{Mutex, Semaphore};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("a generation request is already in flight")]
    Busy,
    #[error("no story is currently loaded")]
    NoStory,
    #[error("no history record with that id")]
    NotFound,
    #[error("story generation failed: {0}")]
    Generation(anyhow::Error),
    #[error("history store failure: {0}")]
    Store(anyhow::Error),
}

/// Everything the reader session tracks between requests. Lives behind one
/// lock so history read-modify-write cycles stay atomic.
struct SessionState {
    store: HistoryStore,
    view: View,
    current: Option<Story>,
    previous: Option<Story>,
    pages: Vec<String>,
    page_index: usize,
    viewport: Option<Viewport>,
}

impl SessionState {
    /// Re-derives the page set from the current story. Without a viewport
    /// there is nothing to measure against, so derived pages are dropped
    /// rather than left describing stale content.
    fn repaginate(&mut self) {
        match (&self.current, self.viewport) {
            (Some(story), Some(viewport)) => {
                let measurer = FontMetricsMeasurer::new(viewport);
                self.pages = paginate(&story.content, &measurer);
            }
            _ => self.pages.clear(),
        }
        self.clamp_page_index();
    }

    fn clamp_page_index(&mut self) {
        self.page_index = if self.pages.is_empty() {
            0
        } else {
            self.page_index.min(self.pages.len() - 1)
        };
    }

    fn snapshot(&self, generating: bool) -> SessionSnapshot {
        SessionSnapshot {
            view: self.view,
            story_id: self.current.as_ref().map(|s| s.id.clone()),
            page_index: self.page_index,
            page_count: self.pages.len(),
            page: self.pages.get(self.page_index).cloned(),
            generating,
        }
    }
}

/// Orchestrates generation, history, and pagination for one reader.
///
/// The in-flight guard is a capacity-1 semaphore: `try_acquire` turns an
/// overlapping generation request into a `Busy` no-op instead of queueing it,
/// and dropping the permit clears the flag on success and failure alike.
/// Generation awaits never hold the state lock.
pub struct SessionController<G> {
    generator: G,
    in_flight: Semaphore,
    state: Mutex<SessionState>,
}

impl<G: Generate> SessionController<G> {
    pub fn new(generator: G, store: HistoryStore) -> Self {
        SessionController {
            generator,
            in_flight: Semaphore::new(1),
            state: Mutex::new(SessionState {
                store,
                view: View::Reading,
                current: None,
                previous: None,
                pages: Vec::new(),
                page_index: 0,
                viewport: None,
            }),
        }
    }

    fn generating(&self) -> bool {
        self.in_flight.available_permits() == 0
    }

    /// Generates a fresh story, replacing whatever is currently loaded. The
    /// optional genre selects one of the story-type seed prompts; anything
    /// else defers to the backend's default scenario.
    pub async fn start_new(&self, genre: Option<&str>) -> Result<SessionSnapshot, SessionError> {
        let _permit = self
            .in_flight
            .try_acquire()
            .map_err(|_| SessionError::Busy)?;

        let prompt = genre.and_then(seed_prompt);
        let content = self
            .generator
            .generate(prompt)
            .await
            .map_err(SessionError::Generation)?;

        let mut state = self.state.lock().await;
        let story = state.store.add(&content).map_err(SessionError::Store)?;
        tracing::info!(story_id = %story.id, chars = content.len(), "generated new story");
        state.current = Some(story);
        state.previous = None;
        state.page_index = 0;
        state.repaginate();
        Ok(state.snapshot(false))
    }

    /// Extends the current story. The backend gets the full story text as its
    /// prompt; the result is appended after a blank line. The story id is
    /// captured before the await, so the matching history record is updated
    /// even if the reader switches stories while the request is in flight;
    /// the live view is only touched when it still shows that id.
    pub async fn continue_current(&self) -> Result<SessionSnapshot, SessionError> {
        let _permit = self
            .in_flight
            .try_acquire()
            .map_err(|_| SessionError::Busy)?;

        let (id, base) = {
            let state = self.state.lock().await;
            let story = state.current.as_ref().ok_or(SessionError::NoStory)?;
            (story.id.clone(), story.content.clone())
        };

        let part = self
            .generator
            .generate(Some(&base))
            .await
            .map_err(SessionError::Generation)?;
        let combined = format!("{base}\n\n{part}");

        let mut state = self.state.lock().await;
        let updated = if state.store.get(&id).is_some() {
            state.store.update(&id, &combined)
        } else {
            // Record deleted mid-flight: keep the finished continuation as a
            // fresh entry instead of dropping it.
            state.store.add(&combined)
        }
        .map_err(SessionError::Store)?;
        tracing::info!(story_id = %updated.id, chars = combined.len(), "continued story");

        if state.current.as_ref().is_some_and(|s| s.id == id) {
            let previous_page_count = state.pages.len();
            state.current = Some(updated);
            state.repaginate();
            // Land the reader on the first newly created page.
            state.page_index = previous_page_count;
            state.clamp_page_index();
        }
        Ok(state.snapshot(false))
    }

    /// Loads a saved story into the reading view, stashing the one that was
    /// on screen for back-navigation.
    pub async fn select_from_history(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        let mut state = self.state.lock().await;
        let story = state.store.get(id).cloned().ok_or(SessionError::NotFound)?;
        state.previous = state.current.take();
        state.current = Some(story);
        state.view = View::Reading;
        state.page_index = 0;
        state.repaginate();
        Ok(state.snapshot(self.generating()))
    }

    /// Removes a history record; deleting a missing id is a no-op. Deleting
    /// the story currently on screen clears the reading view too, so no
    /// unsaved ghost of it lingers.
    pub async fn delete_entry(&self, id: &str) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        state.store.delete(id).map_err(SessionError::Store)?;
        if state.current.as_ref().is_some_and(|s| s.id == id) {
            state.current = None;
            state.pages.clear();
            state.page_index = 0;
        }
        if state.previous.as_ref().is_some_and(|s| s.id == id) {
            state.previous = None;
        }
        Ok(())
    }

    pub async fn go_to_history(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.view = View::History;
        state.snapshot(self.generating())
    }

    /// Back to the reading view; restores the stashed story when nothing is
    /// loaded.
    pub async fn go_to_reading(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.view = View::Reading;
        if state.current.is_none() {
            state.current = state.previous.take();
            state.page_index = 0;
            state.repaginate();
        }
        state.snapshot(self.generating())
    }

    /// Clears the reading view down to the entry prompt, stashing the current
    /// story for back-navigation.
    pub async fn go_to_new_story(&self) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.previous = state.current.take();
        state.pages.clear();
        state.page_index = 0;
        state.view = View::Reading;
        state.snapshot(self.generating())
    }

    /// Replaces the viewport metrics and re-derives the page set.
    pub async fn set_viewport(&self, viewport: Viewport) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.viewport = Some(viewport);
        state.repaginate();
        state.snapshot(self.generating())
    }

    /// Jumps to a page, clamped into the valid range.
    pub async fn set_page(&self, index: usize) -> SessionSnapshot {
        let mut state = self.state.lock().await;
        state.page_index = index;
        state.clamp_page_index();
        state.snapshot(self.generating())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.snapshot(self.generating())
    }

    pub async fn history(&self) -> Vec<Story> {
        self.state.lock().await.store.list().to_vec()
    }
}
