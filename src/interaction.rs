//! Pending interaction prompts, one slot per session.

use std::collections::HashMap;

use agent_events::{InteractionPrompt, InteractionResponse};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct InteractionCorrelator {
    prompts: HashMap<String, InteractionPrompt>,
}

impl InteractionCorrelator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the prompt for its session, replacing any previous one.
    pub fn set_prompt(&mut self, prompt: InteractionPrompt) -> Option<InteractionPrompt> {
        let replaced = self.prompts.insert(prompt.session_id.clone(), prompt);
        if let Some(previous) = replaced.as_ref() {
            debug!(
                session_id = %previous.session_id,
                request_id = previous.request_id.as_deref().unwrap_or(""),
                "replacing unanswered prompt"
            );
        }
        replaced
    }

    #[must_use]
    pub fn prompt(&self, session_id: &str) -> Option<&InteractionPrompt> {
        self.prompts.get(session_id)
    }

    #[must_use]
    pub fn has_pending(&self, session_id: &str) -> bool {
        self.prompts.contains_key(session_id)
    }

    pub fn clear(&mut self, session_id: &str) -> Option<InteractionPrompt> {
        self.prompts.remove(session_id)
    }

    /// Consumes the pending prompt and builds the response for `text`.
    ///
    /// The slot is cleared whether or not the response is later delivered.
    /// Returns `None` when the session has no pending prompt.
    pub fn resolve(&mut self, session_id: &str, text: &str) -> Option<InteractionResponse> {
        let prompt = self.prompts.remove(session_id)?;
        let answer = text.trim();
        let option_id = prompt.options.as_deref().and_then(|options| {
            options
                .iter()
                .find(|option| option.option_id == answer)
                .or_else(|| {
                    options
                        .iter()
                        .find(|option| option.name.eq_ignore_ascii_case(answer))
                })
                .map(|option| option.option_id.clone())
        });

        Some(InteractionResponse {
            session_id: prompt.session_id,
            response: answer.to_string(),
            request_id: prompt.request_id,
            option_id,
        })
    }
}
