/// Rows returned when the caller does not ask for a specific count
pub const DEFAULT_QUERY_LIMIT: u32 = 10;

/// Upper bound on `sysparm_limit`; larger requests are clamped
pub const MAX_QUERY_LIMIT: u32 = 1000;

/// Options for a Table API list request.
///
/// The encoded query is opaque: it is forwarded to the instance verbatim,
/// only the sort directive is appended to it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub query: String,
    pub fields: Vec<String>,
    pub limit: u32,
    pub offset: u32,
    pub display_value: bool,
    pub order_by: Option<String>,
    pub order_descending: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            query: String::new(),
            fields: Vec::new(),
            limit: DEFAULT_QUERY_LIMIT,
            offset: 0,
            display_value: false,
            order_by: None,
            order_descending: false,
        }
    }
}

impl QueryOptions {
    pub fn new<S: Into<String>>(query: S) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn display_value(mut self, display_value: bool) -> Self {
        self.display_value = display_value;
        self
    }

    pub fn order_by<S: Into<String>>(mut self, field: S) -> Self {
        self.order_by = Some(field.into());
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.order_descending = descending;
        self
    }

    /// The limit actually sent to the instance
    pub fn effective_limit(&self) -> u32 {
        self.limit.min(MAX_QUERY_LIMIT)
    }

    /// The filter with the sort directive appended, if there is anything to send
    pub fn encoded_query(&self) -> Option<String> {
        let directive = self
            .order_by
            .as_deref()
            .filter(|field| !field.is_empty())
            .map(|field| {
                if self.order_descending {
                    format!("ORDERBYDESC{}", field)
                } else {
                    format!("ORDERBY{}", field)
                }
            });

        match (self.query.is_empty(), directive) {
            (true, None) => None,
            (true, Some(directive)) => Some(directive),
            (false, None) => Some(self.query.clone()),
            (false, Some(directive)) => Some(format!("{}^{}", self.query, directive)),
        }
    }

    /// Query string parameters for `GET /api/now/table/{table}`
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sysparm_limit", self.effective_limit().to_string()),
            ("sysparm_offset", self.offset.to_string()),
        ];
        if let Some(query) = self.encoded_query() {
            params.push(("sysparm_query", query));
        }
        if !self.fields.is_empty() {
            params.push(("sysparm_fields", self.fields.join(",")));
        }
        if self.display_value {
            params.push(("sysparm_display_value", "true".to_string()));
        }
        params
    }
}
