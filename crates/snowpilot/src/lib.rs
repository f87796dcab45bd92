pub mod agent;
pub mod attachments;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod servicenow;
pub mod tools;
