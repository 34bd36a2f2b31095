use crate::models::ChatCompletion;
use anyhow::{Result, anyhow};
use serde_json::json;

const SYSTEM_PROMPT: &str = "You are a master storyteller who writes engaging, magical stories. Your stories are:\n- Well-structured with clear narrative flow\n- Rich in vivid, sensory details\n- Engaging and imaginative\n- Between 1000-5000 words\nIf continuing a story, maintain consistency with the existing narrative and add meaningful progression.";

const DEFAULT_PROMPT: &str = "Write a magical short story that captures the reader's imagination. \nThe story should be engaging, well-structured, and suitable for all ages. \nInclude vivid descriptions and a satisfying narrative arc.";

const FALLBACK_STORY: &str = "Once upon a time...";

/// Genre-specific opening prompts offered by the story-type picker. Unknown
/// genres fall through to the backend's default scenario.
pub fn seed_prompt(genre: &str) -> Option<&'static str> {
    match genre {
        "fantasy" => Some(
            "Create a fantasy adventure story with magic, mythical creatures, and epic quests",
        ),
        "scifi" => Some(
            "Write a science fiction story with advanced technology, space exploration, or futuristic concepts",
        ),
        "romance" => {
            Some("Tell a romantic story about love, relationships, and emotional connections")
        }
        "mystery" => Some("Create a mystery story with suspense, clues, and unexpected twists"),
        "adventure" => Some(
            "Write an adventure story about exploration, discovery, and exciting journeys",
        ),
        "random" => Some("Create an engaging story of any genre, with your creative freedom"),
        _ => None,
    }
}

/// The text-generation backend, seen as an opaque prompt-to-prose function.
/// An absent prompt lets the backend apply its default scenario.
pub trait Generate: Send + Sync {
    fn generate(
        &self,
        prompt: Option<&str>,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct StoryClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl StoryClient {
    pub fn new() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY").unwrap_or_else(|_| "dummy_key".to_string()); // In production, make this required
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1/chat/completions".to_string());
        let model =
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "mixtral-8x7b-32768".to_string());

        Ok(StoryClient {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        })
    }
}

impl Generate for StoryClient {
    async fn generate(&self, prompt: Option<&str>) -> Result<String> {
        let mut request_builder = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt.unwrap_or(DEFAULT_PROMPT) }
                ],
                "temperature": 0.7,
                "max_tokens": 1024,
                "top_p": 1,
                "stream": false
            }));

        // Add authorization header if API key is provided and not dummy
        if self.api_key != "dummy_key" {
            request_builder =
                request_builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request_builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("generation backend returned {status}: {body}"));
        }

        let completion: ChatCompletion = response.json().await?;
        let story = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_else(|| FALLBACK_STORY.to_string());

        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_story_type_has_a_seed_prompt() {
        for genre in ["fantasy", "scifi", "romance", "mystery", "adventure", "random"] {
            assert!(seed_prompt(genre).is_some(), "missing prompt for {genre}");
        }
    }

    #[test]
    fn unknown_genre_falls_back_to_default_scenario() {
        assert_eq!(seed_prompt("western"), None);
        assert_eq!(seed_prompt(""), None);
    }
}
