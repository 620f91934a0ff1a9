//! Answer generation for detected questions.
//!
//! This module provides:
//! * [`AnswerGenerator`] — async trait implemented by all answer backends.
//! * [`OllamaClient`] — local Ollama chat-API backend.
//! * [`PromptBuilder`] — builds system/user chat prompts.
//! * [`ConversationContext`] — rolling window of recent conversation entries.
//! * [`AnswerError`] — single failure condition for answer generation.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audio_assistant::config::AppConfig;
//! use audio_assistant::llm::{new_shared_context, AnswerGenerator, OllamaClient, Role};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = OllamaClient::from_config(&config.llm);
//!
//!     let context = new_shared_context();
//!     context
//!         .lock()
//!         .unwrap()
//!         .push(Role::Speaker, "we deploy every friday afternoon");
//!
//!     let prompt_ctx = context.lock().unwrap().prompt_block(6);
//!     let answer = client
//!         .answer("When do we deploy?", prompt_ctx.as_deref())
//!         .await
//!         .unwrap();
//!     println!("{}", answer);
//! }
//! ```

pub mod answer;
pub mod context;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use answer::{AnswerError, AnswerGenerator, OllamaClient};
pub use context::{
    new_shared_context, ConversationContext, ConversationEntry, Role, SharedContext,
};
pub use prompt::PromptBuilder;
