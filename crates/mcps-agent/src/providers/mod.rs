//! Model adapters for the supported LLM providers

mod gemini;
mod openai;

use std::time::Duration;

pub use gemini::{GeminiAdapter, GeminiReply};
pub use openai::{OpenAiAdapter, OpenAiReply};

/// Upper bound for one model request
const REQUEST_TIMEOUT_SECS: u64 = 60;

fn http_client() -> crate::errors::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}
