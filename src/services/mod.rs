//! Services layer for the Dokimi evaluation engine
//!
//! Provides the generative evaluator seam and its Anthropic implementation.

pub mod llm;

pub use llm::{GenerativeEvaluator, LlmConfig, LlmService};
