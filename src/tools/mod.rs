mod registry;
mod schema;
mod types;

pub use registry::ToolRegistry;
pub use schema::{Arguments, InputSchema, ParamSpec, ParamType};
pub use types::{ToolCallRequest, ToolCallResult, ToolContent, ToolDescriptor};

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;

/// A cohesive group of tools belonging to one domain.
///
/// Every tool name in [`list_tools`](Self::list_tools) must start with
/// `<domain>_` and must be accepted by [`handle`](Self::handle).
#[async_trait]
pub trait ToolModule: Send + Sync {
    /// Domain token, also the tool-name prefix (without the underscore)
    fn domain(&self) -> &str;

    /// The fixed catalog, in declaration order
    fn list_tools(&self) -> &[ToolDescriptor];

    /// Execute one tool with already-validated arguments.
    ///
    /// Fails with [`ToolError::UnknownTool`] for names this module does not declare.
    async fn handle(&self, name: &str, args: Arguments) -> Result<Value, ToolError>;

    /// Per-module override of the registry's call timeout
    fn call_timeout(&self) -> Option<Duration> {
        None
    }

    /// Look up a declared tool by exact name
    fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.list_tools().iter().find(|d| d.name == name)
    }

    /// Validate raw arguments against the tool's schema, then handle the call
    async fn invoke(&self, name: &str, raw: &Value) -> Result<Value, ToolError> {
        let descriptor = self
            .descriptor(name)
            .ok_or_else(|| ToolError::unknown(name))?;
        let args = descriptor.input_schema.validate(raw)?;
        self.handle(name, args).await
    }
}
