//! MCPTool wrapper that implements the Tool trait

use async_trait::async_trait;
use mcp_core::ToolDescriptor;
use mcp_tools::Tool;
use serde_json::Value;
use tracing::debug;

use crate::client::ArcMCPClient;

/// A remote tool exposed as a local [`Tool`]
///
/// Execution forwards to `tools/call` on the session the tool was listed
/// from. The tool's text answer is returned as-is, including `"Error: "`
/// answers; only session and transport failures become `Err`.
pub struct MCPTool {
    server_name: String,
    definition: ToolDescriptor,
    session: ArcMCPClient,
}

impl MCPTool {
    pub fn new(
        server_name: impl Into<String>,
        definition: ToolDescriptor,
        session: ArcMCPClient,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            definition,
            session,
        }
    }

    /// Get the server name this tool belongs to
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn definition(&self) -> &ToolDescriptor {
        &self.definition
    }
}

#[async_trait]
impl Tool for MCPTool {
    async fn execute(&self, params: Value) -> mcp_core::Result<String> {
        let result = self
            .session
            .call_tool(&self.definition.name, params)
            .await?;

        if result.is_error() {
            debug!(
                "Tool '{}' on '{}' reported an error",
                self.definition.name, self.server_name
            );
        }

        Ok(result.first_text().unwrap_or_default().to_string())
    }

    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        self.definition
            .description
            .as_deref()
            .unwrap_or("No description available")
    }

    fn input_schema(&self) -> Value {
        self.definition.input_schema.clone()
    }
}
