//! `get_weather`: demo tool with a fixed reading.

use super::ToolSpec;

pub const TOOL_GET_WEATHER: &str = "get_weather";

/// Always 70 degrees. Pure: the same location always gives the same sentence.
pub fn get_weather(location: &str) -> String {
    format!("The weather for {} is 70 degrees.", location)
}

pub(super) fn spec() -> ToolSpec {
    ToolSpec {
        name: TOOL_GET_WEATHER.to_string(),
        description: Some("Get the weather for a given location.".to_string()),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "location": { "type": "string" }
            },
            "required": ["location"]
        }),
    }
}
