//! Question detection over transcripts.
//!
//! Purely lexical: weighted surface signals and a sensitivity-scaled
//! threshold, no model in the loop.  See [`scorer`] for the weights.

pub mod scorer;

pub use scorer::{QuestionScorer, ScoredText};
