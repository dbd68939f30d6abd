//! Tool registry and invoker
//!
//! Tools are registered as a descriptor (name, description, input schema) and
//! a handler. Dispatch is a lookup by name, so adding a tool never touches the
//! dispatch code.

use async_trait::async_trait;
use mcp_core::schema::coerce_arguments;
use mcp_core::{CallToolResult, ToolDescriptor};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{RegistryError, ToolError};

/// Executes one tool
///
/// Handlers receive arguments that already satisfy the tool's input schema.
/// They must be stateless or internally synchronized: calls run concurrently.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, ToolError>;
}

/// Outcome of a tool call: success text or error text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Success(String),
    Failure(String),
}

impl ToolOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Success(text) | Self::Failure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl From<Result<String, ToolError>> for ToolOutcome {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(text) => Self::Success(text),
            Err(e) => Self::Failure(format!("Error: {e}")),
        }
    }
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Success(text) => CallToolResult::success(text),
            ToolOutcome::Failure(text) => CallToolResult::error(text),
        }
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Ordered set of tools exposed by a server
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its descriptor's name
    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name));
        }
        if descriptor.input_schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err(RegistryError::InvalidSchema(descriptor.name));
        }

        debug!("Registered tool '{}'", descriptor.name);
        self.index.insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            descriptor,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Descriptors in registration order
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i].descriptor)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up, validate and run a tool
    ///
    /// Every failure is folded into [`ToolOutcome::Failure`], including a
    /// handler that panics.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolOutcome {
        let outcome: ToolOutcome = self.invoke(name, arguments).await.into();
        if let ToolOutcome::Failure(text) = &outcome {
            warn!("Tool call '{}' failed: {}", name, text);
        }
        outcome
    }

    async fn invoke(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let tool = self
            .index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let arguments = coerce_arguments(&tool.descriptor.input_schema, &arguments).map_err(|e| {
            ToolError::InvalidArguments {
                tool: name.to_string(),
                reason: e.to_string(),
            }
        })?;

        let handler = Arc::clone(&tool.handler);
        tokio::spawn(async move { handler.call(arguments).await })
            .await
            .map_err(|e| ToolError::Execution {
                tool: name.to_string(),
                reason: if e.is_panic() {
                    "tool panicked".to_string()
                } else {
                    e.to_string()
                },
            })?
    }
}
