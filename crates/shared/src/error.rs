use thiserror::Error;

/// Failures surfaced by a generation or refinement cycle.
///
/// The `Display` output is the message stored in session state, so every
/// variant reads as a sentence a user can act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NewsletterError {
    #[error("{0}")]
    Validation(String),

    #[error("No news articles were found for the selected topics. Try broader or different topics.")]
    EmptyResult,

    #[error("Could not find {0} in the AI response")]
    Extraction(String),

    #[error("The AI response was not valid JSON: {0}")]
    Parse(String),

    #[error("AI service request failed: {0}")]
    Transport(String),

    #[error("The AI response was missing required fields: {0}")]
    UnexpectedShape(String),
}

impl NewsletterError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(err: &anyhow::Error) -> Self {
        // {:#} keeps the whole context chain on one line
        Self::Transport(format!("{:#}", err))
    }
}
