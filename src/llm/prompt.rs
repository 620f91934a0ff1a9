//! Prompt builder for answer generation.
//!
//! [`PromptBuilder`] produces the `(system_msg, user_msg)` pair sent to the
//! Ollama `/api/chat` endpoint.  The system message pins the assistant to
//! short, direct answers; the user message carries the question and, when
//! available, a rendered block of recent conversation (see
//! [`ConversationContext::prompt_block`](crate::llm::ConversationContext::prompt_block))
//! so follow-up questions resolve against what was just said.

// ---------------------------------------------------------------------------
// System instruction
// ---------------------------------------------------------------------------

const SYSTEM_INSTRUCTION: &str = "\
You are a helpful assistant. Provide concise, direct answers to questions. \
Keep responses brief and to the point.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds answer prompts in chat-message format.
///
/// # Example
/// ```rust
/// use audio_assistant::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new();
/// let (system, user) = builder.build_chat("What time is it?", None);
/// assert!(system.contains("concise"));
/// assert!(user.contains("What time is it?"));
/// ```
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build a **(system_msg, user_msg)** pair for one question.
    ///
    /// With context:
    /// ```text
    /// Based on the following conversation context, provide a concise and
    /// direct answer to the question.
    ///
    /// Context: <rendered transcript block>
    ///
    /// Question: <question>
    ///
    /// Answer:
    /// ```
    ///
    /// Without context the preamble and `Context:` section are dropped.
    pub fn build_chat(&self, question: &str, context: Option<&str>) -> (String, String) {
        let system_msg = SYSTEM_INSTRUCTION.to_string();

        let user_msg = match context {
            Some(ctx) => format!(
                "Based on the following conversation context, provide a concise \
                 and direct answer to the question.\n\n\
                 Context: {ctx}\n\n\
                 Question: {question}\n\n\
                 Answer:"
            ),
            None => format!(
                "Provide a concise and direct answer to the following question.\n\n\
                 Question: {question}\n\n\
                 Answer:"
            ),
        };

        (system_msg, user_msg)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_pins_concise_answers() {
        let builder = PromptBuilder::new();
        let (system, _) = builder.build_chat("Why is the sky blue?", None);

        assert!(system.contains("helpful assistant"));
        assert!(system.contains("concise"));
        assert!(system.contains("brief"));
    }

    #[test]
    fn user_message_has_question_and_answer_cue() {
        let builder = PromptBuilder::new();
        let (_, user) = builder.build_chat("Why is the sky blue?", None);

        assert!(user.contains("Question: Why is the sky blue?"));
        assert!(user.ends_with("Answer:"));
    }

    #[test]
    fn context_block_is_embedded_when_present() {
        let builder = PromptBuilder::new();
        let ctx = "Speaker: the deploy finished\nQuestion: did the tests pass?";
        let (_, user) = builder.build_chat("which suite failed?", Some(ctx));

        assert!(user.contains("conversation context"));
        assert!(user.contains("Context: Speaker: the deploy finished"));
        assert!(user.contains("Question: which suite failed?"));
    }

    #[test]
    fn no_context_drops_the_context_section() {
        let builder = PromptBuilder::new();
        let (_, user) = builder.build_chat("What time is it?", None);

        assert!(!user.contains("Context:"));
        assert!(!user.contains("conversation context"));
    }
}
