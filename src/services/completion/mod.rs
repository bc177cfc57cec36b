//! Completion module for turning prompts into SQL suggestions.
//!
//! This module provides:
//! - `client` - The chat-completions client and the `CompletionService` seam
//! - `types` - Request/response wire types

mod client;
mod types;

pub use client::{
    CompletionClient, CompletionClientBuilder, CompletionService, DEFAULT_ENDPOINT, DEFAULT_MODEL,
    parse_chat_response,
};

pub use types::{ChatMessage, ChatRequest};
