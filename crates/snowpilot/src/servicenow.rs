//! Adapter for the ServiceNow Table API.
//!
//! Every operation resolves to a [`RemoteCallResult`], whatever HTTP status the
//! instance answered with. Only transport faults surface as [`SnowError`].
//!
//! [`SnowError`]: crate::errors::SnowError
mod client;
mod query;
mod result;
mod store;

#[cfg(test)]
pub mod mock;

pub use client::{normalize_instance, ServiceNowClient, REQUEST_TIMEOUT};
pub use query::{QueryOptions, DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};
pub use result::{normalize_response, RemoteCallResult, ERROR_DETAIL_SNIPPET, NO_CONTENT_MESSAGE};
pub use store::{RecordStore, SCHEMA_FIELDS, SCHEMA_LIMIT};
