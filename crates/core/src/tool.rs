//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what let the agent ground its answers in the repository:
//! search the retrieval index, read files, run a linter, and so on.
//!
//! Every tool declares a [`ToolSpec`]: a name, a routing description shown to
//! the model, and an ordered list of typed parameters. The dispatcher validates
//! model-produced arguments against that spec before the tool ever runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use crate::error::ToolError;

/// The declared type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    /// JSON-Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    /// Accept `value` as this kind, coercing only where nothing is lost.
    ///
    /// Models frequently emit `"5"` for an integer or `"true"` for a boolean,
    /// so string-encoded scalars are parsed. Everything else must match.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ParamKind::String, Value::String(_)) => Some(value.clone()),

            (ParamKind::Integer, Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    Some(value.clone())
                } else {
                    let f = n.as_f64()?;
                    (f.fract() == 0.0 && f.is_finite()).then(|| Value::from(f as i64))
                }
            }
            (ParamKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (ParamKind::Number, Value::Number(_)) => Some(value.clone()),
            (ParamKind::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),

            (ParamKind::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ParamKind::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },

            _ => None,
        }
    }
}

/// One named, typed parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// An optional parameter filled with `default` when the model omits it.
    pub fn optional(
        name: impl Into<String>,
        kind: ParamKind,
        description: impl Into<String>,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: false,
            default: Some(default.into()),
        }
    }
}

/// The declared identity and argument schema of a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

/// A tool definition in JSON-Schema form, for display and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Builder-style parameter declaration. Order of calls is the declared order.
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// JSON Schema describing this tool's parameters.
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.params {
            let mut prop = serde_json::json!({
                "type": p.kind.as_str(),
                "description": p.description,
            });
            if let Some(default) = &p.default {
                prop["default"] = default.clone();
            }
            properties.insert(p.name.clone(), prop);
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters_schema(),
        }
    }

    /// Validate a raw argument payload against the declared parameters.
    ///
    /// - the payload must be a JSON object (`null` is read as `{}`)
    /// - a missing or `null` required parameter is an error
    /// - optional parameters take their default when absent
    /// - values are coerced per [`ParamKind::coerce`]; a mismatch is an error
    /// - undeclared keys are dropped
    pub fn validate(&self, raw: &Value) -> Result<ToolArgs, ToolError> {
        let empty = Map::new();
        let supplied = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ToolError::invalid_arguments(format!(
                    "arguments for '{}' must be a JSON object, got {}",
                    self.name,
                    json_type(other)
                )));
            }
        };

        let mut resolved = Map::new();
        for p in &self.params {
            match supplied.get(&p.name) {
                None | Some(Value::Null) => {
                    if let Some(default) = &p.default {
                        resolved.insert(p.name.clone(), default.clone());
                    } else if p.required {
                        return Err(ToolError::invalid_arguments(format!(
                            "missing required argument '{}' ({})",
                            p.name,
                            p.kind.as_str()
                        )));
                    }
                }
                Some(value) => {
                    let coerced = p.kind.coerce(value).ok_or_else(|| {
                        ToolError::invalid_arguments(format!(
                            "argument '{}' expected {}, got {}",
                            p.name,
                            p.kind.as_str(),
                            json_type(value)
                        ))
                    })?;
                    resolved.insert(p.name.clone(), coerced);
                }
            }
        }

        for key in supplied.keys() {
            if !self.params.iter().any(|p| &p.name == key) {
                debug!(tool = %self.name, argument = %key, "Dropping undeclared argument");
            }
        }

        Ok(ToolArgs(resolved))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validated arguments handed to [`Tool::execute`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolArgs(pub Map<String, Value>);

impl ToolArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A string argument. Validation guarantees presence for required params.
    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.0
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_arguments(format!("missing '{name}' argument")))
    }

    pub fn int(&self, name: &str) -> Result<i64, ToolError> {
        self.0
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::invalid_arguments(format!("missing '{name}' argument")))
    }

}

/// The successful result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The text handed back to the model.
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            data: None,
        }
    }
}

/// The core Tool trait.
///
/// Each tool (codebase_qa, read_file, run_linter, etc.) implements this trait.
/// Tools are registered in the [`ToolRegistry`] and invoked by the dispatcher
/// with arguments already validated against [`Tool::spec`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The declared name, description, and parameters of this tool.
    fn spec(&self) -> ToolSpec;

    /// Execute the tool with validated arguments.
    async fn execute(&self, args: ToolArgs) -> std::result::Result<ToolOutput, ToolError>;
}

struct RegisteredTool {
    spec: ToolSpec,
    tool: Arc<dyn Tool>,
}

/// A registry of available tools.
///
/// Keeps registration order so the tool catalog shown to the model is the
/// same on every decision. Specs are snapshotted at registration.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own spec.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let spec = tool.spec();
        self.register_as(tool, spec)
    }

    /// Register a tool with a caller-supplied spec (e.g. a configured
    /// description override). Fails if the name is already taken.
    pub fn register_as(&mut self, tool: Arc<dyn Tool>, spec: ToolSpec) -> Result<(), ToolError> {
        if self.by_name.contains_key(&spec.name) {
            return Err(ToolError::Duplicate { name: spec.name });
        }
        self.by_name.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { spec, tool });
        Ok(())
    }

    /// Get a tool and its registered spec by name.
    pub fn get(&self, name: &str) -> Result<(&ToolSpec, &Arc<dyn Tool>), ToolError> {
        let idx = self
            .by_name
            .get(name)
            .ok_or_else(|| ToolError::NotFound { name: name.to_string() })?;
        let entry = &self.tools[*idx];
        Ok((&entry.spec, &entry.tool))
    }

    /// All specs in registration order.
    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec.clone()).collect()
    }

    /// Get all tool definitions in JSON-Schema form.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.spec.to_definition()).collect()
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.spec.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
