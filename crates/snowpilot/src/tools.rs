//! The fixed catalog of tools offered to the model, and the dispatcher that
//! runs a requested tool against the record store.
//!
//! Dispatch never fails: unknown tools, malformed inputs and transport faults
//! all come back as a serialized failure the model can read and react to.
use serde_json::{json, Map, Value};
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{ParamType, Tool, ToolParam};
use crate::servicenow::{QueryOptions, RecordStore, RemoteCallResult, DEFAULT_QUERY_LIMIT};

/// Characters of a tool input kept in log lines
pub const MAX_TOOL_INPUT_SUMMARY: usize = 120;
/// Characters of a tool result kept in log lines
pub const MAX_TOOL_RESULT_PREVIEW: usize = 400;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const DEFAULT_UPDATE_SET_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    QueryRecords,
    GetRecord,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    GetTableSchema,
    SearchTables,
    GetUpdateSets,
    GetApplicationScopes,
    GetCurrentUpdateSet,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn definition(self) -> Tool {
        let tool = Tool::new(self.name(), self.description());
        match self {
            ToolKind::QueryRecords => tool
                .required(
                    "table",
                    ParamType::String,
                    "Table API name, e.g. 'incident', 'sys_script' or 'sys_dictionary'",
                )
                .optional(
                    "query",
                    ParamType::String,
                    None,
                    "Encoded query string. Leave empty to match every record.",
                )
                .optional(
                    "fields",
                    ParamType::Array,
                    None,
                    "Fields to return. Omit for all fields, which can be large.",
                )
                .optional(
                    "limit",
                    ParamType::Integer,
                    Some(json!(DEFAULT_QUERY_LIMIT)),
                    "Maximum records to return (default 10, max 1000)",
                )
                .optional(
                    "offset",
                    ParamType::Integer,
                    Some(json!(0)),
                    "Records to skip, for pagination",
                )
                .optional(
                    "display_value",
                    ParamType::Boolean,
                    Some(json!(false)),
                    "Return display values instead of sys_ids for reference fields",
                )
                .optional(
                    "order_by",
                    ParamType::String,
                    None,
                    "Field to sort the results by",
                )
                .optional(
                    "order_descending",
                    ParamType::Boolean,
                    Some(json!(false)),
                    "Sort descending instead of ascending",
                ),
            ToolKind::GetRecord => tool
                .required("table", ParamType::String, "Table API name")
                .required("sys_id", ParamType::String, "The sys_id of the record")
                .optional(
                    "fields",
                    ParamType::Array,
                    None,
                    "Fields to return (omit for all)",
                )
                .optional(
                    "display_value",
                    ParamType::Boolean,
                    Some(json!(false)),
                    "Return display values for reference fields",
                ),
            ToolKind::CreateRecord => tool
                .required("table", ParamType::String, "Table API name")
                .required(
                    "data",
                    ParamType::Object,
                    "Field values for the new record as key-value pairs",
                )
                .optional(
                    "input_display_value",
                    ParamType::Boolean,
                    Some(json!(false)),
                    "Send display values for reference fields (e.g. type names instead of sys_ids). \
                     Useful for internal_type in sys_dictionary.",
                ),
            ToolKind::UpdateRecord => tool
                .required("table", ParamType::String, "Table API name")
                .required(
                    "sys_id",
                    ParamType::String,
                    "The sys_id of the record to update",
                )
                .required(
                    "data",
                    ParamType::Object,
                    "Only the field values to change",
                )
                .optional(
                    "input_display_value",
                    ParamType::Boolean,
                    Some(json!(false)),
                    "Send display values for reference fields",
                ),
            ToolKind::DeleteRecord => tool
                .required("table", ParamType::String, "Table API name")
                .required(
                    "sys_id",
                    ParamType::String,
                    "The sys_id of the record to delete",
                ),
            ToolKind::GetTableSchema => tool.required(
                "table",
                ParamType::String,
                "Table API name, e.g. 'incident'",
            ),
            ToolKind::SearchTables => tool
                .required(
                    "search_term",
                    ParamType::String,
                    "Term to look for in table names and labels",
                )
                .optional(
                    "limit",
                    ParamType::Integer,
                    Some(json!(DEFAULT_SEARCH_LIMIT)),
                    "Maximum results (default 20)",
                ),
            ToolKind::GetUpdateSets => tool.optional(
                "limit",
                ParamType::Integer,
                Some(json!(DEFAULT_UPDATE_SET_LIMIT)),
                "Maximum results",
            ),
            ToolKind::GetApplicationScopes | ToolKind::GetCurrentUpdateSet => tool,
        }
    }

    fn description(self) -> &'static str {
        match self {
            ToolKind::QueryRecords => {
                "Query records from any ServiceNow table using encoded query syntax. \
                 Use this to read existing data, find sys_ids, understand the current configuration \
                 and check whether something already exists before creating it.\n\n\
                 Encoded query examples:\n\
                 \x20 'active=true'\n\
                 \x20 'collection=incident^active=true'\n\
                 \x20 'nameLIKEcustom^ORlabelLIKEcustom'\n\
                 \x20 'name=incident.u_priority'"
            }
            ToolKind::GetRecord => "Retrieve a single record from a ServiceNow table by its sys_id.",
            ToolKind::CreateRecord => {
                "Create a new record in a ServiceNow table. \
                 Always query first to verify the record does not already exist. \
                 Returns the created record including its sys_id.\n\n\
                 Common tables:\n\
                 \x20 sys_dictionary    - custom field\n\
                 \x20 sys_script        - business rule\n\
                 \x20 sys_script_client - client script\n\
                 \x20 sys_ui_policy     - UI policy\n\
                 \x20 sys_ui_element    - field on a form view\n\
                 \x20 sys_choice        - choice list value\n\
                 \x20 sys_ui_section    - form section"
            }
            ToolKind::UpdateRecord => "Update an existing record in a ServiceNow table by sys_id.",
            ToolKind::DeleteRecord => {
                "Delete a record from a ServiceNow table. \
                 Prefer deactivating (active=false) over deleting, and only delete when explicitly asked."
            }
            ToolKind::GetTableSchema => {
                "Get the field definitions of a ServiceNow table from sys_dictionary: \
                 names, types, labels and properties. \
                 Use this to understand a table before adding fields or writing scripts."
            }
            ToolKind::SearchTables => {
                "Search ServiceNow tables by name or label. Useful for finding the right table name."
            }
            ToolKind::GetUpdateSets => {
                "List the 'in progress' update sets of the instance, \
                 so the developer knows where changes may be captured."
            }
            ToolKind::GetApplicationScopes => "List the active application scopes of the instance.",
            ToolKind::GetCurrentUpdateSet => {
                "Show the update set currently selected for the connected user. \
                 Every write made in this session is captured there."
            }
        }
    }
}

/// The tool definitions sent on every model call
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<Tool>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: ToolKind::iter().map(ToolKind::definition).collect(),
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Run one tool request and render its outcome as pretty JSON
    pub async fn dispatch(&self, store: &dyn RecordStore, name: &str, input: &Value) -> String {
        let result = match self.resolve(name) {
            Ok((kind, tool)) => match execute(store, kind, tool, input).await {
                Ok(result) => result,
                Err(e) => e.into(),
            },
            Err(e) => e.into(),
        };
        result.to_json_string()
    }

    fn resolve(&self, name: &str) -> AgentResult<(ToolKind, &Tool)> {
        let kind =
            ToolKind::from_str(name).map_err(|_| AgentError::ToolNotFound(name.to_string()))?;
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        Ok((kind, tool))
    }
}

async fn execute(
    store: &dyn RecordStore,
    kind: ToolKind,
    tool: &Tool,
    input: &Value,
) -> AgentResult<RemoteCallResult> {
    let args = ToolInput::new(tool, input)?;

    let result = match kind {
        ToolKind::QueryRecords => {
            let mut options = QueryOptions::new(args.optional_string("query")?.unwrap_or_default())
                .fields(args.strings("fields")?)
                .limit(args.integer("limit")?)
                .offset(args.integer("offset")?)
                .display_value(args.boolean("display_value")?)
                .descending(args.boolean("order_descending")?);
            if let Some(field) = args.optional_string("order_by")?.filter(|f| !f.is_empty()) {
                options = options.order_by(field);
            }
            store.query(&args.string("table")?, &options).await
        }
        ToolKind::GetRecord => {
            store
                .get(
                    &args.string("table")?,
                    &args.string("sys_id")?,
                    &args.strings("fields")?,
                    args.boolean("display_value")?,
                )
                .await
        }
        ToolKind::CreateRecord => {
            store
                .create(
                    &args.string("table")?,
                    &args.object("data")?,
                    args.boolean("input_display_value")?,
                )
                .await
        }
        ToolKind::UpdateRecord => {
            store
                .update(
                    &args.string("table")?,
                    &args.string("sys_id")?,
                    &args.object("data")?,
                    args.boolean("input_display_value")?,
                )
                .await
        }
        ToolKind::DeleteRecord => {
            store
                .delete(&args.string("table")?, &args.string("sys_id")?)
                .await
        }
        ToolKind::GetTableSchema => store.describe_schema(&args.string("table")?).await,
        ToolKind::SearchTables => {
            store
                .search_tables(&args.string("search_term")?, args.integer("limit")?)
                .await
        }
        ToolKind::GetUpdateSets => store.in_progress_update_sets(args.integer("limit")?).await,
        ToolKind::GetApplicationScopes => store.application_scopes().await,
        ToolKind::GetCurrentUpdateSet => store.current_update_set().await,
    };

    result.map_err(|e| AgentError::ExecutionError(e.to_string()))
}

/// Typed access to a tool input, falling back to declared defaults
struct ToolInput<'a> {
    tool: &'a Tool,
    values: &'a Map<String, Value>,
}

impl<'a> ToolInput<'a> {
    fn new(tool: &'a Tool, input: &'a Value) -> AgentResult<Self> {
        let values = input.as_object().ok_or_else(|| {
            AgentError::InvalidParameters(format!("input for {} must be a JSON object", tool.name))
        })?;
        Ok(Self { tool, values })
    }

    fn param(&self, name: &str) -> AgentResult<&'a ToolParam> {
        self.tool
            .param(name)
            .ok_or_else(|| AgentError::Internal(format!("{} has no parameter {}", self.tool.name, name)))
    }

    /// Supplied value, else the declared default; null counts as absent
    fn value(&self, name: &str) -> AgentResult<Option<&'a Value>> {
        let param = self.param(name)?;
        match self.values.get(name).filter(|v| !v.is_null()) {
            Some(value) => Ok(Some(value)),
            None if param.required => Err(AgentError::InvalidParameters(format!(
                "missing required parameter '{}'",
                name
            ))),
            None => Ok(param.default.as_ref()),
        }
    }

    fn mistyped(name: &str, expected: &str) -> AgentError {
        AgentError::InvalidParameters(format!("'{}' must be {}", name, expected))
    }

    fn optional_string(&self, name: &str) -> AgentResult<Option<String>> {
        match self.value(name)? {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Self::mistyped(name, "a string")),
        }
    }

    fn string(&self, name: &str) -> AgentResult<String> {
        self.optional_string(name)?
            .ok_or_else(|| AgentError::InvalidParameters(format!("missing parameter '{}'", name)))
    }

    fn integer(&self, name: &str) -> AgentResult<u32> {
        let value = self
            .value(name)?
            .ok_or_else(|| AgentError::InvalidParameters(format!("missing parameter '{}'", name)))?;
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| Self::mistyped(name, "a non-negative integer"))
    }

    fn boolean(&self, name: &str) -> AgentResult<bool> {
        match self.value(name)? {
            None => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(Self::mistyped(name, "a boolean")),
        }
    }

    fn strings(&self, name: &str) -> AgentResult<Vec<String>> {
        match self.value(name)? {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(String::from)
                        .ok_or_else(|| Self::mistyped(name, "an array of strings"))
                })
                .collect(),
            Some(_) => Err(Self::mistyped(name, "an array of strings")),
        }
    }

    fn object(&self, name: &str) -> AgentResult<Value> {
        match self.value(name)? {
            Some(value @ Value::Object(_)) => Ok(value.clone()),
            _ => Err(Self::mistyped(name, "an object")),
        }
    }
}

/// Cut `text` to at most `max` characters, marking the cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn summarize_input(input: &Value) -> String {
    truncate_chars(&input.to_string(), MAX_TOOL_INPUT_SUMMARY)
}

pub fn preview_result(output: &str) -> String {
    truncate_chars(output, MAX_TOOL_RESULT_PREVIEW)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::servicenow::mock::{MockStore, RecordedCall};

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).unwrap()
    }

    #[test]
    fn test_catalog_covers_every_kind() {
        let catalog = ToolCatalog::new();
        let names: Vec<_> = catalog.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "query_records",
                "get_record",
                "create_record",
                "update_record",
                "delete_record",
                "get_table_schema",
                "search_tables",
                "get_update_sets",
                "get_application_scopes",
                "get_current_update_set",
            ]
        );

        let query = catalog.get("query_records").unwrap();
        assert_eq!(query.input_schema()["required"], json!(["table"]));
        assert_eq!(query.input_schema()["properties"]["limit"]["default"], json!(10));
        assert_eq!(ToolKind::from_str("search_tables").unwrap(), ToolKind::SearchTables);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let store = MockStore::new();
        let output = ToolCatalog::new()
            .dispatch(&store, "drop_database", &json!({}))
            .await;

        let result = parse(&output);
        assert_eq!(result["success"], json!(false));
        assert!(result["error"].as_str().unwrap().contains("drop_database"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_query_defaults() {
        let store = MockStore::new();
        ToolCatalog::new()
            .dispatch(&store, "query_records", &json!({"table": "incident"}))
            .await;

        assert_eq!(
            store.calls(),
            vec![RecordedCall::Query {
                table: "incident".to_string(),
                options: QueryOptions::default(),
            }]
        );
    }

    #[tokio::test]
    async fn test_query_with_every_option() {
        let store = MockStore::new();
        ToolCatalog::new()
            .dispatch(
                &store,
                "query_records",
                &json!({
                    "table": "sys_script",
                    "query": "collection=incident",
                    "fields": ["name", "when"],
                    "limit": 5000,
                    "offset": 20,
                    "display_value": true,
                    "order_by": "name",
                    "order_descending": true
                }),
            )
            .await;

        let expected = QueryOptions::new("collection=incident")
            .fields(["name", "when"])
            .limit(5000)
            .offset(20)
            .display_value(true)
            .order_by("name")
            .descending(true);
        assert_eq!(
            store.calls(),
            vec![RecordedCall::Query {
                table: "sys_script".to_string(),
                options: expected,
            }]
        );
    }

    #[tokio::test]
    async fn test_invalid_parameters_become_failures() {
        let store = MockStore::new();
        let catalog = ToolCatalog::new();

        let missing = parse(&catalog.dispatch(&store, "get_record", &json!({"table": "incident"})).await);
        assert_eq!(missing["success"], json!(false));
        assert!(missing["error"].as_str().unwrap().contains("sys_id"));
        assert!(missing.get("status_code").is_none());

        let mistyped = parse(
            &catalog
                .dispatch(&store, "query_records", &json!({"table": "incident", "limit": "ten"}))
                .await,
        );
        assert!(mistyped["error"].as_str().unwrap().contains("limit"));

        let not_object = parse(
            &catalog
                .dispatch(&store, "create_record", &json!({"table": "incident", "data": "x"}))
                .await,
        );
        assert_eq!(not_object["success"], json!(false));

        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_write_tools() {
        let store = MockStore::new()
            .respond(RemoteCallResult::success(json!({"sys_id": "abc"})))
            .respond(RemoteCallResult::http_failure(
                403,
                "Operation Failed",
                Some("ACL".to_string()),
            ));
        let catalog = ToolCatalog::new();

        let created = parse(
            &catalog
                .dispatch(
                    &store,
                    "create_record",
                    &json!({"table": "sys_choice", "data": {"label": "Low"}, "input_display_value": true}),
                )
                .await,
        );
        assert_eq!(created, json!({"success": true, "data": {"sys_id": "abc"}}));

        let updated = parse(
            &catalog
                .dispatch(
                    &store,
                    "update_record",
                    &json!({"table": "sys_choice", "sys_id": "abc", "data": {"label": "High"}}),
                )
                .await,
        );
        assert_eq!(updated["status_code"], json!(403));
        assert_eq!(updated["detail"], json!("ACL"));

        catalog
            .dispatch(&store, "delete_record", &json!({"table": "sys_choice", "sys_id": "abc"}))
            .await;

        let calls = store.calls();
        assert_eq!(
            calls[0],
            RecordedCall::Create {
                table: "sys_choice".to_string(),
                data: json!({"label": "Low"}),
                input_display_value: true,
            }
        );
        assert!(matches!(&calls[1], RecordedCall::Update { input_display_value: false, .. }));
        assert_eq!(
            calls[2],
            RecordedCall::Delete {
                table: "sys_choice".to_string(),
                sys_id: "abc".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_helper_tools_use_their_tables() {
        let store = MockStore::new();
        let catalog = ToolCatalog::new();

        catalog.dispatch(&store, "get_table_schema", &json!({"table": "incident"})).await;
        catalog.dispatch(&store, "search_tables", &json!({"search_term": "task"})).await;
        catalog.dispatch(&store, "get_update_sets", &json!({})).await;
        catalog.dispatch(&store, "get_application_scopes", &json!({})).await;

        let calls = store.calls();
        let tables: Vec<_> = calls.iter().map(RecordedCall::table).collect();
        assert_eq!(tables, vec!["sys_dictionary", "sys_db_object", "sys_update_set", "sys_scope"]);

        match &calls[1] {
            RecordedCall::Query { options, .. } => assert_eq!(options.limit, 20),
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("ééééé", 2), "éé...");

        let long = json!({"data": "x".repeat(500)});
        assert_eq!(summarize_input(&long).chars().count(), MAX_TOOL_INPUT_SUMMARY + 3);
        assert_eq!(preview_result(&"y".repeat(1000)).chars().count(), MAX_TOOL_RESULT_PREVIEW + 3);
    }
}
