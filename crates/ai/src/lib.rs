//! Language model access for the standup assistant.
//!
//! Provides the [`ChatModel`] seam, an OpenAI-compatible client, JSON
//! extraction from model replies, and structured task analysis.

#![warn(missing_docs)]

pub mod analysis;
pub mod llm;
pub mod parser;

pub use analysis::{AnalyzedTask, Priority, TaskAnalysis, TaskAnalyzer, TaskStatus};
pub use llm::{ChatMessage, ChatModel, ChatRequest, LlmError, OpenAiClient, OpenAiConfig, Result, Role};
pub use parser::{extract_json, strip_fences};
