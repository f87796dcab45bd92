//! These models represent the objects passed around by the agent
//!
//! The conversation is stored in these internal structs and converted to the
//! model provider's wire format only at the provider boundary, so the agent
//! loop never depends on a particular LLM API.
pub mod content;
pub mod message;
pub mod role;
pub mod tool;
