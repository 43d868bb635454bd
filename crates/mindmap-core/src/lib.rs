//! # mindmap-core
//!
//! Shared building blocks for the mind map service: the outline tree every
//! component passes around, and a provider-agnostic LLM abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Generation pipeline                       │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌───────────────┐  │
//! │  │   Prompt    │──▶│   LlmProvider    │──▶│  OutlineNode  │  │
//! │  │  (Message)  │   │   (Strategy)     │   │    (tree)     │  │
//! │  └─────────────┘   └──────────────────┘   └───────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between OpenAI, Ollama, or a test
//! double without changing generation logic.

pub mod error;
pub mod message;
pub mod outline;
pub mod provider;

pub use error::{CoreError, Result};
pub use message::{Message, Role};
pub use outline::{OutlineNode, SourceRef, escape_heading, parse_markdown, strip_code_fences};
pub use provider::{Completion, GenerationOptions, LlmProvider};
