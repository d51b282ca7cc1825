//! Receipt extraction through Google's Gemini models.
//!
//! Two strategies implement [`engine::ReceiptExtractor`]:
//!
//! - [`GeminiClient`] sends the image to the `generateContent` endpoint with
//!   a response schema restricted to the budget categories.
//! - [`FixtureExtractor`] answers from a local JSON file, for offline work.

pub use client::{GeminiClient, GeminiClientBuilder};
pub use fixture::{DEFAULT_FIXTURE, FixtureExtractor};
pub use prompt::{build_prompt, system_instruction};
pub use schema::{GenerationConfig, response_schema};

mod client;
mod fixture;
mod prompt;
mod schema;
