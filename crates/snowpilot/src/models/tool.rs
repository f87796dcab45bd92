use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    Object,
    /// An array of strings
    Array,
}

/// One entry of a tool's input shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParam {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    /// Value used when the model omits the parameter
    pub default: Option<Value>,
    pub description: String,
}

/// A tool that can be used by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does, written for the model
    pub description: String,
    /// Parameters that the tool accepts, in declaration order
    pub params: Vec<ToolParam>,
}

impl Tool {
    /// Create a new tool with the given name and description and no parameters
    pub fn new<N, D>(name: N, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Declare a parameter the model must always provide
    pub fn required<N, D>(mut self, name: N, param_type: ParamType, description: D) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        self.params.push(ToolParam {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: description.into(),
        });
        self
    }

    /// Declare an optional parameter, with the value used when it is omitted
    pub fn optional<N, D>(
        mut self,
        name: N,
        param_type: ParamType,
        default: Option<Value>,
        description: D,
    ) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        self.params.push(ToolParam {
            name: name.into(),
            param_type,
            required: false,
            default,
            description: description.into(),
        });
        self
    }

    pub fn param(&self, name: &str) -> Option<&ToolParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Render the input shape as a JSON Schema object
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            let mut property = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if param.param_type == ParamType::Array {
                property["items"] = json!({"type": "string"});
            }
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            properties.insert(param.name.clone(), property);
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The input for the execution, normally a JSON object
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new ToolCall with the given name and arguments
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}
