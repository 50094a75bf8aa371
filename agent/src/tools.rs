//! Demo tools for the starter agent.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use tandem_contract::{ToolError, ToolResult, TypedTool};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchArgs {
    /// The query to use in your search.
    pub query: String,
}

/// Web-search stand-in. Returns a canned forecast for any query.
pub struct SearchTool;

#[async_trait]
impl TypedTool for SearchTool {
    type Args = SearchArgs;

    fn tool_id(&self) -> &str {
        "search"
    }

    fn name(&self) -> &str {
        "Search"
    }

    fn description(&self) -> &str {
        "Use to surf the web, fetch current information, check the weather, \
         and retrieve other information."
    }

    async fn execute(&self, args: SearchArgs) -> Result<ToolResult, ToolError> {
        tracing::debug!(query = %args.query, "search tool invoked");
        Ok(ToolResult::success(
            "search",
            json!({ "result": "Cold, with a low of 3℃" }),
        ))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// The city to get weather for.
    pub city: String,
}

/// Simulated weather lookup. Deterministic per city so conversations replay.
pub struct GetWeatherTool;

#[async_trait]
impl TypedTool for GetWeatherTool {
    type Args = WeatherArgs;

    fn tool_id(&self) -> &str {
        "get_weather"
    }

    fn name(&self) -> &str {
        "Get Weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location"
    }

    fn validate(&self, args: &WeatherArgs) -> Result<(), String> {
        if args.city.trim().is_empty() {
            return Err("city must not be empty".to_string());
        }
        Ok(())
    }

    async fn execute(&self, args: WeatherArgs) -> Result<ToolResult, ToolError> {
        const CONDITIONS: [&str; 4] = ["Sunny", "Cloudy", "Rainy", "Partly Cloudy"];
        let seed: u32 = args.city.bytes().map(u32::from).sum();
        let condition = CONDITIONS[(seed as usize) % CONDITIONS.len()];
        let temperature = 50 + seed % 30;
        let humidity = 30 + seed % 50;

        Ok(ToolResult::success(
            "get_weather",
            json!({
                "city": args.city,
                "condition": condition,
                "temperature": temperature,
                "humidity": humidity,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tandem_contract::Tool;

    #[tokio::test]
    async fn search_returns_canned_forecast() {
        let result = Tool::execute(&SearchTool, json!({"query": "weather in sf"}))
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.data["result"], "Cold, with a low of 3℃");
    }

    #[tokio::test]
    async fn weather_is_deterministic_per_city() {
        let first = Tool::execute(&GetWeatherTool, json!({"city": "Oslo"}))
            .await
            .unwrap();
        let second = Tool::execute(&GetWeatherTool, json!({"city": "Oslo"}))
            .await
            .unwrap();
        assert_eq!(first.data, second.data);
        assert_eq!(first.data["city"], "Oslo");
        assert!(first.data["temperature"].is_number());
    }

    #[tokio::test]
    async fn weather_rejects_empty_city() {
        let err = Tool::execute(&GetWeatherTool, json!({"city": "  "}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("city"));
    }

    #[test]
    fn descriptors_carry_generated_schemas() {
        let desc = Tool::descriptor(&SearchTool);
        assert_eq!(desc.id, "search");
        let required = desc.parameters["required"].as_array().unwrap();
        assert!(required.iter().any(|v: &Value| v == "query"));

        let desc = Tool::descriptor(&GetWeatherTool);
        assert_eq!(desc.id, "get_weather");
        assert!(desc.parameters["properties"]["city"].is_object());
    }
}
