//! Narrator adapters.

pub mod anthropic_api;
pub mod mock;

pub use anthropic_api::AnthropicNarrator;
pub use mock::{MockNarrator, MockReply};
