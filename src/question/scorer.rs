//! Deterministic question detection over transcript text.
//!
//! [`QuestionScorer`] assigns a confidence in `[0.0, 1.0]` to a piece of
//! text by summing fixed weights for independent surface signals:
//!
//! | signal                                   | weight |
//! |------------------------------------------|--------|
//! | terminal question mark                   | 0.5    |
//! | leading interrogative / auxiliary word   | 0.3    |
//! | any question-shaped pattern match        | 0.2    |
//! | subject–auxiliary inversion              | 0.2    |
//!
//! The decision threshold scales inversely with the configured sensitivity:
//! `threshold = 0.3 + 0.4 · (1 − sensitivity)`, so sensitivity 1.0 accepts
//! at 0.3 and sensitivity 0.0 requires 0.7.  Scoring is a pure function of
//! the text and the sensitivity — same input, same score, no model calls.

use regex::Regex;

// Signal weights; the sum is clamped to 1.0.
const W_QUESTION_MARK: f32 = 0.5;
const W_LEAD_WORD: f32 = 0.3;
const W_PATTERN: f32 = 0.2;
const W_INVERSION: f32 = 0.2;

// threshold = floor + span · (1 − sensitivity)
const THRESHOLD_FLOOR: f32 = 0.3;
const THRESHOLD_SPAN: f32 = 0.4;

/// Words that open a direct question, interrogatives and auxiliaries both.
const QUESTION_WORDS: &[&str] = &[
    "who", "what", "where", "when", "why", "how", "which", "whose", "whom", "can", "could",
    "would", "should", "will", "is", "are", "was", "were", "do", "does", "did", "has", "have",
    "had",
];

/// Auxiliaries that signal subject–auxiliary inversion when in first
/// position ("is it…", "did they…").
const AUX_WORDS: &[&str] = &[
    "is", "are", "was", "were", "do", "does", "did", "can", "could", "would", "should", "will",
    "has", "have", "had",
];

// ---------------------------------------------------------------------------
// ScoredText
// ---------------------------------------------------------------------------

/// A classified piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredText {
    /// The trimmed input text.
    pub text: String,
    /// Accumulated signal weight, clamped to `[0.0, 1.0]`.
    pub confidence: f32,
    /// `confidence >= threshold` for the scorer's sensitivity.
    pub is_question: bool,
}

// ---------------------------------------------------------------------------
// QuestionScorer
// ---------------------------------------------------------------------------

/// Heuristic question classifier.
///
/// # Example
///
/// ```rust
/// use audio_assistant::question::QuestionScorer;
///
/// let scorer = QuestionScorer::new(0.5);
/// assert!(scorer.score("What time is it?").is_question);
/// assert!(!scorer.score("Hello there.").is_question);
/// ```
pub struct QuestionScorer {
    sensitivity: f32,
    patterns: Vec<Regex>,
    sentence_split: Regex,
}

impl QuestionScorer {
    /// Create a scorer; `sensitivity` is clamped to `[0.0, 1.0]`.
    pub fn new(sensitivity: f32) -> Self {
        let patterns = [
            r"\?",
            r"(?i)^(who|what|where|when|why|how|which|whose|whom)\s+",
            r"(?i)\b(can|could|would|should|will|is|are|was|were|do|does|did|has|have|had)\s+\w+\s+\?",
            r"(?i)^(is|are|was|were|do|does|did|can|could|would|should|will)\s+",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("hardcoded question pattern"))
        .collect();

        Self {
            sensitivity: sensitivity.clamp(0.0, 1.0),
            patterns,
            sentence_split: Regex::new(r"[.!?]+").expect("hardcoded sentence splitter"),
        }
    }

    /// The decision threshold implied by this scorer's sensitivity.
    pub fn threshold(&self) -> f32 {
        THRESHOLD_FLOOR + THRESHOLD_SPAN * (1.0 - self.sensitivity)
    }

    /// Score `text`; pure and deterministic.
    pub fn score(&self, text: &str) -> ScoredText {
        let text = text.trim();
        if text.is_empty() {
            return ScoredText {
                text: String::new(),
                confidence: 0.0,
                is_question: false,
            };
        }

        let mut confidence = 0.0;

        if text.ends_with('?') {
            confidence += W_QUESTION_MARK;
        }

        if let Some(first) = text.split_whitespace().next() {
            let first = first
                .trim_end_matches(|c| matches!(c, '?' | '.' | ',' | '!'))
                .to_lowercase();
            if QUESTION_WORDS.contains(&first.as_str()) {
                confidence += W_LEAD_WORD;
            }
        }

        // One pattern bonus no matter how many patterns match.
        if self.patterns.iter().any(|p| p.is_match(text)) {
            confidence += W_PATTERN;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() >= 2 && AUX_WORDS.contains(&words[0].to_lowercase().as_str()) {
            confidence += W_INVERSION;
        }

        let confidence = confidence.min(1.0);
        ScoredText {
            text: text.to_string(),
            confidence,
            is_question: confidence >= self.threshold(),
        }
    }

    /// Split a transcript on sentence terminators and return the sentences
    /// classified as questions, in order.
    ///
    /// Useful when one utterance carries several sentences.  Note that the
    /// split strips terminal punctuation, so classification of the parts
    /// leans on word order rather than the question mark.
    pub fn extract_questions(&self, text: &str) -> Vec<ScoredText> {
        self.sentence_split
            .split(text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| self.score(s))
            .filter(|s| s.is_question)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Scoring ----------------------------------------------------------------

    #[test]
    fn clear_question_scores_high() {
        let scorer = QuestionScorer::new(0.5);
        let scored = scorer.score("What time is it?");
        assert!(scored.confidence >= 0.7, "got {}", scored.confidence);
        assert!(scored.is_question);
    }

    #[test]
    fn statement_scores_zero() {
        let scorer = QuestionScorer::new(1.0);
        // Even at the most permissive threshold this never classifies.
        let scored = scorer.score("Hello there");
        assert_eq!(scored.confidence, 0.0);
        assert!(!scored.is_question);
    }

    #[test]
    fn inverted_auxiliary_counts_without_question_mark() {
        let scorer = QuestionScorer::new(0.7);
        // "is" leads: lead word + pattern + inversion = 0.7.
        let scored = scorer.score("Is it raining");
        assert!((scored.confidence - 0.7).abs() < 1e-6, "got {}", scored.confidence);
        assert!(scored.is_question);
    }

    #[test]
    fn confidence_is_clamped_to_one() {
        let scorer = QuestionScorer::new(0.5);
        let scored = scorer.score("Can you tell me what time it is ?");
        assert!(scored.confidence <= 1.0);
    }

    #[test]
    fn empty_and_whitespace_score_zero() {
        let scorer = QuestionScorer::new(0.5);
        assert_eq!(scorer.score("").confidence, 0.0);
        assert_eq!(scorer.score("   ").confidence, 0.0);
        assert!(!scorer.score("   ").is_question);
    }

    #[test]
    fn scoring_is_deterministic() {
        let scorer = QuestionScorer::new(0.6);
        let first = scorer.score("Would you mind checking the logs?");
        let second = scorer.score("Would you mind checking the logs?");
        assert_eq!(first, second);
    }

    // ---- Threshold ---------------------------------------------------------------

    #[test]
    fn threshold_tracks_sensitivity() {
        assert!((QuestionScorer::new(1.0).threshold() - 0.3).abs() < 1e-6);
        assert!((QuestionScorer::new(0.5).threshold() - 0.5).abs() < 1e-6);
        assert!((QuestionScorer::new(0.0).threshold() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn threshold_is_monotone_in_sensitivity() {
        let mut last = f32::INFINITY;
        for step in 0..=10 {
            let threshold = QuestionScorer::new(step as f32 / 10.0).threshold();
            assert!(
                threshold <= last,
                "threshold rose from {last} to {threshold} at sensitivity {}",
                step as f32 / 10.0
            );
            last = threshold;
        }
    }

    #[test]
    fn sensitivity_is_clamped() {
        assert_eq!(
            QuestionScorer::new(7.0).threshold(),
            QuestionScorer::new(1.0).threshold()
        );
        assert_eq!(
            QuestionScorer::new(-3.0).threshold(),
            QuestionScorer::new(0.0).threshold()
        );
    }

    #[test]
    fn higher_sensitivity_accepts_weaker_signals() {
        // "Where …" scores 0.5 (lead word + pattern, no inversion);
        // threshold 0.42 at sensitivity 0.7 accepts it, threshold 0.7 at
        // sensitivity 0.0 rejects it.
        let text = "Where should we put the logs";
        assert!(QuestionScorer::new(0.7).score(text).is_question);
        assert!(!QuestionScorer::new(0.0).score(text).is_question);
    }

    // ---- extract_questions --------------------------------------------------

    #[test]
    fn extract_finds_question_sentences() {
        let scorer = QuestionScorer::new(0.7);
        let questions =
            scorer.extract_questions("The deploy finished. What broke this time? Check the logs.");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "What broke this time");
    }

    #[test]
    fn extract_on_statements_is_empty() {
        let scorer = QuestionScorer::new(0.7);
        let questions = scorer.extract_questions("The deploy finished. Everything is green.");
        assert!(questions.is_empty());
    }

    #[test]
    fn extract_handles_empty_input() {
        let scorer = QuestionScorer::new(0.7);
        assert!(scorer.extract_questions("").is_empty());
        assert!(scorer.extract_questions("...").is_empty());
    }
}
