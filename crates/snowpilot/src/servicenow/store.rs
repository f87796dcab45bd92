use async_trait::async_trait;
use serde_json::Value;

use super::query::QueryOptions;
use super::result::RemoteCallResult;
use crate::errors::SnowResult;

/// Columns returned when describing a table
pub const SCHEMA_FIELDS: [&str; 10] = [
    "element",
    "column_label",
    "internal_type",
    "max_length",
    "mandatory",
    "read_only",
    "reference",
    "default_value",
    "comments",
    "active",
];

/// Maximum number of field definitions returned when describing a table
pub const SCHEMA_LIMIT: u32 = 500;

/// A record store reachable through the ServiceNow Table API.
///
/// The five CRUD operations are required; the metadata lookups are queries
/// against well known system tables and are provided on top of them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The user the session is authenticated as
    fn username(&self) -> &str;

    async fn query(&self, table: &str, options: &QueryOptions) -> SnowResult<RemoteCallResult>;

    async fn get(
        &self,
        table: &str,
        sys_id: &str,
        fields: &[String],
        display_value: bool,
    ) -> SnowResult<RemoteCallResult>;

    async fn create(
        &self,
        table: &str,
        data: &Value,
        input_display_value: bool,
    ) -> SnowResult<RemoteCallResult>;

    async fn update(
        &self,
        table: &str,
        sys_id: &str,
        data: &Value,
        input_display_value: bool,
    ) -> SnowResult<RemoteCallResult>;

    async fn delete(&self, table: &str, sys_id: &str) -> SnowResult<RemoteCallResult>;

    /// Active, named field definitions of a table from `sys_dictionary`
    async fn describe_schema(&self, table: &str) -> SnowResult<RemoteCallResult> {
        let options = QueryOptions::new(format!("name={}^active=true^elementISNOTEMPTY", table))
            .fields(SCHEMA_FIELDS)
            .limit(SCHEMA_LIMIT)
            .display_value(true);
        self.query("sys_dictionary", &options).await
    }

    /// Tables whose name or label contains `term`
    async fn search_tables(&self, term: &str, limit: u32) -> SnowResult<RemoteCallResult> {
        let options = QueryOptions::new(format!(
            "nameLIKE{term}^ORlabelLIKE{term}^super_classISNOTEMPTY"
        ))
        .fields(["name", "label", "super_class", "sys_scope", "is_extendable"])
        .limit(limit)
        .display_value(true);
        self.query("sys_db_object", &options).await
    }

    async fn in_progress_update_sets(&self, limit: u32) -> SnowResult<RemoteCallResult> {
        let options = QueryOptions::new("state=in progress")
            .fields([
                "name",
                "description",
                "state",
                "sys_created_by",
                "sys_created_on",
            ])
            .limit(limit)
            .display_value(true)
            .order_by("name");
        self.query("sys_update_set", &options).await
    }

    async fn application_scopes(&self) -> SnowResult<RemoteCallResult> {
        let options = QueryOptions::new("active=true")
            .fields(["name", "scope", "version", "active"])
            .limit(100)
            .display_value(true);
        self.query("sys_scope", &options).await
    }

    /// The update set that captures this session's writes.
    ///
    /// Read from the user's `sys_update_set` preference. A user without the
    /// preference has not picked one, which is reported as a failure.
    async fn current_update_set(&self) -> SnowResult<RemoteCallResult> {
        let username = self.username().to_string();
        let options = QueryOptions::new(format!(
            "name=sys_update_set^user.user_name={}",
            username
        ))
        .fields(["value"])
        .limit(1);
        let preference = self.query("sys_user_preference", &options).await?;
        if !preference.is_success() {
            return Ok(preference);
        }

        let sys_id = preference
            .records()
            .first()
            .and_then(|row| row.get("value"))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .map(String::from);

        match sys_id {
            Some(sys_id) => {
                let fields = ["sys_id", "name", "state", "application"].map(String::from);
                self.get("sys_update_set", &sys_id, &fields, true).await
            }
            None => Ok(RemoteCallResult::failure(format!(
                "No current update set is recorded for user '{}'; changes are captured in the Default update set",
                username
            ))),
        }
    }

    /// The authenticated user's `sys_user` record, used as a connection check
    async fn whoami(&self) -> SnowResult<RemoteCallResult> {
        let options = QueryOptions::new(format!("user_name={}", self.username()))
            .fields(["user_name", "name", "email"])
            .limit(1);
        self.query("sys_user", &options).await
    }
}
