//! The callable shape handed to an agent

use async_trait::async_trait;
use mcp_core::Result;
use mcp_core::schema::{ParameterSpec, parameters};
use serde_json::Value;

/// A named, described, schema-typed callable
///
/// Implementations wrap whatever actually does the work (a remote MCP tool,
/// a local function). The agent only sees the name, description and input
/// schema, and gets text back.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Run the tool with arguments shaped by [`Tool::input_schema`]
    ///
    /// Returns the tool's text. Failures of the tool itself come back inside
    /// the text, prefixed with `"Error: "`, so the agent can read them; `Err`
    /// means the call never reached the tool or its answer was lost.
    async fn execute(&self, params: Value) -> Result<String>;

    /// Unique within a [`ToolRegistry`](crate::ToolRegistry)
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the argument object
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "numbers": { "type": "array", "items": { "type": "number" } }
    ///     },
    ///     "required": ["numbers"]
    /// });
    /// assert_eq!(schema["required"][0], "numbers");
    /// ```
    fn input_schema(&self) -> Value;

    /// Declared parameters, read from [`Tool::input_schema`]
    fn parameters(&self) -> Vec<ParameterSpec> {
        parameters(&self.input_schema())
    }
}
