use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

use super::query::QueryOptions;
use super::result::RemoteCallResult;
use super::store::RecordStore;
use crate::errors::SnowResult;

/// A call received by [`MockStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Query {
        table: String,
        options: QueryOptions,
    },
    Get {
        table: String,
        sys_id: String,
        fields: Vec<String>,
        display_value: bool,
    },
    Create {
        table: String,
        data: Value,
        input_display_value: bool,
    },
    Update {
        table: String,
        sys_id: String,
        data: Value,
        input_display_value: bool,
    },
    Delete {
        table: String,
        sys_id: String,
    },
}

impl RecordedCall {
    pub fn table(&self) -> &str {
        match self {
            RecordedCall::Query { table, .. }
            | RecordedCall::Get { table, .. }
            | RecordedCall::Create { table, .. }
            | RecordedCall::Update { table, .. }
            | RecordedCall::Delete { table, .. } => table,
        }
    }
}

/// A record store that records every call and replays queued results.
/// Once the queue is drained every call succeeds with an empty list.
pub struct MockStore {
    responses: Mutex<VecDeque<RemoteCallResult>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue the result of the next unanswered call
    pub fn respond(self, result: RemoteCallResult) -> Self {
        self.responses.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) -> SnowResult<RemoteCallResult> {
        self.calls.lock().unwrap().push(call);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RemoteCallResult::success(json!([]))))
    }
}

#[async_trait]
impl RecordStore for MockStore {
    fn username(&self) -> &str {
        "admin"
    }

    async fn query(&self, table: &str, options: &QueryOptions) -> SnowResult<RemoteCallResult> {
        self.record(RecordedCall::Query {
            table: table.to_string(),
            options: options.clone(),
        })
    }

    async fn get(
        &self,
        table: &str,
        sys_id: &str,
        fields: &[String],
        display_value: bool,
    ) -> SnowResult<RemoteCallResult> {
        self.record(RecordedCall::Get {
            table: table.to_string(),
            sys_id: sys_id.to_string(),
            fields: fields.to_vec(),
            display_value,
        })
    }

    async fn create(
        &self,
        table: &str,
        data: &Value,
        input_display_value: bool,
    ) -> SnowResult<RemoteCallResult> {
        self.record(RecordedCall::Create {
            table: table.to_string(),
            data: data.clone(),
            input_display_value,
        })
    }

    async fn update(
        &self,
        table: &str,
        sys_id: &str,
        data: &Value,
        input_display_value: bool,
    ) -> SnowResult<RemoteCallResult> {
        self.record(RecordedCall::Update {
            table: table.to_string(),
            sys_id: sys_id.to_string(),
            data: data.clone(),
            input_display_value,
        })
    }

    async fn delete(&self, table: &str, sys_id: &str) -> SnowResult<RemoteCallResult> {
        self.record(RecordedCall::Delete {
            table: table.to_string(),
            sys_id: sys_id.to_string(),
        })
    }
}
