use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

pub const SSE_PATH: &str = "/sse";
pub const STREAMABLE_HTTP_PATH: &str = "/mcp";

/// Client connection details for a deployed server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    service_name: String,
    base_url: String,
    description: Option<String>,
}

impl ClientConfig {
    pub fn new(service_name: impl Into<String>, base_url: &str) -> Self {
        Self {
            service_name: service_name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn server_entry(&self, mut entry: serde_json::Map<String, Value>) -> Value {
        if let Some(description) = &self.description {
            entry.insert("description".to_string(), json!(description));
        }
        let mut servers = serde_json::Map::new();
        servers.insert(self.service_name.clone(), Value::Object(entry));
        json!({ "mcpServers": servers })
    }

    pub fn sse(&self) -> Value {
        let mut entry = serde_json::Map::new();
        entry.insert("type".to_string(), json!("sse"));
        entry.insert("url".to_string(), json!([format!("{}{}", self.base_url, SSE_PATH)]));
        self.server_entry(entry)
    }

    pub fn streamable_http(&self) -> Value {
        let mut entry = serde_json::Map::new();
        entry.insert("transportType".to_string(), json!("http"));
        entry.insert(
            "url".to_string(),
            json!([format!("{}{}", self.base_url, STREAMABLE_HTTP_PATH)]),
        );
        self.server_entry(entry)
    }

    /// Markdown setup guide with both client configurations
    pub fn setup_instructions(&self) -> Result<String> {
        let sse = serde_json::to_string_pretty(&self.sse())?;
        let http = serde_json::to_string_pretty(&self.streamable_http())?;
        let url = &self.base_url;

        Ok(format!(
            "# MCP Server Setup Instructions\n\n\
             Your MCP server '{name}' has been deployed successfully!\n\n\
             ALB URL: {url}\n\n\
             ## Configuration\n\n\
             **MCP Clients supports HTTP SSE (e.g. Claude Code):**\n\n\
             ```json\n{sse}\n```\n\n\
             **MCP Clients supports Streamable HTTP (e.g. Cline):**\n\n\
             ```json\n{http}\n```\n\n\
             ## Testing the Connection\n\n\
             ```bash\nnpx @modelcontextprotocol/inspector --cli {url}/mcp --method tools/list\n```\n\n\
             ## Troubleshooting\n\n\
             If the connection fails, check that the endpoint responds:\n\n\
             ```bash\ncurl -v {url}/mcp\n```\n",
            name = self.service_name,
        ))
    }

    pub fn save_instructions(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.setup_instructions()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
