//! # mindmap-runtime
//!
//! LLM backends for the mind map service.
//!
//! ## Providers
//!
//! - **OpenAI**: hosted chat-completion API (production default)
//! - **Ollama** (feature `ollama`, on by default): local inference for development
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mindmap_runtime::OpenAiProvider;
//!
//! let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::from_env()?);
//! let service = GenerationService::new(provider, GenerationConfig::default());
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;
pub mod openai;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use mindmap_core::{CoreError, LlmProvider, Message, Result, Role};
