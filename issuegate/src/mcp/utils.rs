//! Utility functions for MCP operations

use serde_json::Value;
use std::sync::Arc;

/// Generate a JSON schema for a type that implements JsonSchema
pub fn generate_tool_schema<T>() -> Arc<serde_json::Map<String, Value>>
where
    T: schemars::JsonSchema,
{
    serde_json::to_value(schemars::schema_for!(T))
        .ok()
        .and_then(|v| v.as_object().map(|obj| Arc::new(obj.clone())))
        .unwrap_or_else(|| Arc::new(serde_json::Map::new()))
}

/// Schema for `T` as a plain JSON value, for [`super::McpTool::schema`]
pub fn tool_schema<T>() -> Value
where
    T: schemars::JsonSchema,
{
    Value::Object((*generate_tool_schema::<T>()).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::SearchIssuesRequest;

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = tool_schema::<SearchIssuesRequest>();
        assert_eq!(schema["type"], "object");
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "jql"));
        assert!(schema["properties"]["max_results"].is_object());
    }
}
