//! Rolling conversation transcript shared between pipeline and prompts.
//!
//! [`ConversationContext`] keeps the most recent transcript entries — what
//! was said, questions that were detected, answers that were generated —
//! each tagged with a [`Role`] and a timestamp.  The window is bounded:
//! oldest entries fall off as new ones arrive.
//!
//! [`PromptBuilder`](crate::llm::PromptBuilder) embeds the last few entries
//! (rendered by [`ConversationContext::prompt_block`]) in every answer
//! prompt so the model sees what the question refers back to.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Default window bound — roughly five minutes of conversation at a
/// normal speaking pace.
const DEFAULT_MAX_ENTRIES: usize = 100;

// ---------------------------------------------------------------------------
// Role / ConversationEntry
// ---------------------------------------------------------------------------

/// Who (or what) produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Plain transcribed speech.
    Speaker,
    /// A transcript the scorer classified as a question.
    Question,
    /// An answer generated for a question.
    Answer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Speaker => "Speaker",
            Role::Question => "Question",
            Role::Answer => "Answer",
        };
        f.write_str(label)
    }
}

/// One line of the conversation transcript.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub role: Role,
    pub text: String,
    /// Wall-clock time the entry was appended.
    pub timestamp: SystemTime,
}

// ---------------------------------------------------------------------------
// ConversationContext
// ---------------------------------------------------------------------------

/// Bounded FIFO transcript window.
///
/// # Example
/// ```rust
/// use audio_assistant::llm::{ConversationContext, Role};
///
/// let mut context = ConversationContext::new(10);
/// context.push(Role::Speaker, "the deploy finished");
/// context.push(Role::Question, "what broke this time?");
/// let block = context.prompt_block(2).unwrap();
/// assert!(block.contains("Question: what broke this time?"));
/// ```
pub struct ConversationContext {
    entries: VecDeque<ConversationEntry>,
    max_entries: usize,
}

impl ConversationContext {
    /// Create a window bounded at `max_entries` (at least 1).
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries.min(DEFAULT_MAX_ENTRIES)),
            max_entries,
        }
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Append an entry, evicting the oldest once the bound is reached.
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.entries.push_back(ConversationEntry {
            role,
            text: text.into(),
            timestamp: SystemTime::now(),
        });
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Drop all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of the current window, oldest first.
    pub fn window(&self) -> Vec<ConversationEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Render the last `n` entries as `Role: text` lines for the prompt,
    /// oldest first.  `None` when the window is empty.
    pub fn prompt_block(&self, n: usize) -> Option<String> {
        if self.entries.is_empty() || n == 0 {
            return None;
        }
        let skip = self.entries.len().saturating_sub(n);
        let block = self
            .entries
            .iter()
            .skip(skip)
            .map(|e| format!("{}: {}", e.role, e.text))
            .collect::<Vec<_>>()
            .join("\n");
        Some(block)
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the window is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

// ---------------------------------------------------------------------------
// SharedContext
// ---------------------------------------------------------------------------

/// The context as shared between the pipeline task and anything that reads
/// the transcript.  Lock, read or push, unlock — never hold the guard
/// across an await.
pub type SharedContext = Arc<Mutex<ConversationContext>>;

/// Convenience constructor for the shared, default-bounded context.
pub fn new_shared_context() -> SharedContext {
    Arc::new(Mutex::new(ConversationContext::default()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
