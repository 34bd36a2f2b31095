use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum number of characters of the first line kept in a story preview.
const PREVIEW_CHARS: usize = 100;

/// A saved story. `preview` is always derived from `content`, never edited
/// on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub preview: String,
}

impl Story {
    pub fn new(content: &str) -> Self {
        Story {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.to_string(),
            created_at: Utc::now().to_rfc3339(),
            preview: preview_of(content),
        }
    }

    /// Replaces `content` and recomputes `preview`; `id` and `created_at`
    /// stay as they were.
    pub fn replace_content(&mut self, content: &str) {
        self.content = content.to_string();
        self.preview = preview_of(content);
    }
}

/// First line of the content, truncated to 100 characters, with a trailing
/// ellipsis marker.
pub fn preview_of(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or("");
    let truncated: String = first_line.chars().take(PREVIEW_CHARS).collect();
    format!("{truncated}...")
}

/// Content-area metrics reported by the client, replaced wholesale on resize.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Reading,
    History,
}

/// What the display surface needs to render the current state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub view: View,
    pub story_id: Option<String>,
    pub page_index: usize,
    pub page_count: usize,
    pub page: Option<String>,
    pub generating: bool,
}

// Chat-completions response shape (OpenAI-compatible backends).

#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}
