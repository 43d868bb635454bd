//! Generation Errors

use mindmap_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Error, Debug)]
pub enum GenerationError {
    /// Input was empty or whitespace only; the model was not called
    #[error("Input text is empty")]
    EmptyInput,

    /// Every attempt hit the per-request deadline
    #[error("Model request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    #[error(transparent)]
    Provider(#[from] CoreError),

    /// The model answered with nothing usable
    #[error("Model output could not be turned into a mind map: {0}")]
    MalformedOutput(String),

    /// Uploaded document could not be read
    #[error("Document error: {0}")]
    Document(String),
}

impl GenerationError {
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Provider(err) => err.is_retryable(),
            Self::EmptyInput | Self::MalformedOutput(_) | Self::Document(_) => false,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Please enter some text to build a mind map from.".into(),
            Self::Timeout { .. } => {
                "The AI service took too long to respond. Please try again.".into()
            }
            Self::Provider(err) => err.user_message(),
            Self::MalformedOutput(_) => {
                "The AI service returned something we couldn't turn into a mind map.".into()
            }
            Self::Document(msg) => format!("We couldn't read that document: {msg}"),
        }
    }
}
