//! Tool registry for MCP tools.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::models::PassageRequest;
use crate::pipeline::{CitationFinder, ClientInfo};

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Tool name (e.g., "find_citations")
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON Schema for input parameters
    pub input_schema: serde_json::Value,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// Registry for all MCP tools
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create a registry exposing the finder's tools
    pub fn from_finder(finder: Arc<CitationFinder>) -> Self {
        let mut registry = Self {
            tools: HashMap::new(),
        };

        registry.register(Tool {
            name: "find_citations".to_string(),
            description: "Find peer-reviewed PubMed Central articles that support a passage of text \
                and return Harvard-style citations with the supporting quote from each article."
                .to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Passage to find citations for (5 to 300 words)"
                    }
                },
                "required": ["text"]
            }),
            handler: Arc::new(FindCitationsHandler { finder }),
        });

        registry
    }

    /// Register a tool
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get all tools
    pub fn all(&self) -> Vec<&Tool> {
        self.tools.values().collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Execute a tool by name
    pub async fn execute(&self, name: &str, args: Value) -> Result<Value, String> {
        let tool = self
            .get(name)
            .ok_or_else(|| format!("Tool '{}' not found", name))?;

        tool.handler.execute(args).await
    }
}

#[derive(Debug)]
struct FindCitationsHandler {
    finder: Arc<CitationFinder>,
}

#[async_trait::async_trait]
impl ToolHandler for FindCitationsHandler {
    async fn execute(&self, args: Value) -> Result<Value, String> {
        let request: PassageRequest =
            serde_json::from_value(args).map_err(|_| "Missing required field: text")?;

        let response = self
            .finder
            .find_citations_for_passage(&request.text, ClientInfo::local("mcp"))
            .await
            .map_err(|e| e.detail())?;

        serde_json::to_value(response).map_err(|e| e.to_string())
    }
}
