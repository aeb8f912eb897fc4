//! Language-model assistance: corrective re-parsing and narrative summaries.
//!
//! Nothing here is required for a correct answer. Every call is time-bounded
//! and callers treat any [`CompletionError`] as "no assistance".

mod completion;
pub use completion::{AssistConfig, Completion, CompletionError, DisabledCompletion, HttpCompletion};

pub mod corrective;
pub use corrective::{CorrectiveGuess, corrective_parse};

pub mod narrative;
pub use narrative::narrate;
