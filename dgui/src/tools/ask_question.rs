//! `ask_question`: asks the user for structured input through a form.
//!
//! The model supplies a react-jsonschema-form (RJSF) schema and a UI schema, both as
//! serialized JSON strings. The tool wraps them in a [`FormRequest`] envelope which the
//! tool node raises as an interrupt; the caller renders the form and resumes the run with
//! the submitted data, which becomes the tool result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ToolSpec;

pub const TOOL_ASK_QUESTION: &str = "ask_question";

/// Discriminator of the form envelope.
pub const FORM_REQUEST_TYPE: &str = "dgui_form";
pub const FORM_TITLE: &str = "Additional Information Required";
pub const FORM_DESCRIPTION: &str =
    "Please fill out the following form to provide the necessary information.";

const DESCRIPTION: &str = "Asks the user for structured information by generating a form.

Use this tool when you need to gather one or more pieces of information from the user \
to proceed. The `question` parameter must be a serialized JSON string that conforms to \
the react-jsonschema-form (RJSF) schema; you are responsible for generating that schema \
from the information you need to collect.

Examples:
1. \"I need to schedule a meeting with the marketing team about the Q3 launch.\" -> \
form with Meeting Title, Attendees (array of emails), Date/Time and Agenda (textarea).
2. \"I'm looking for a used car, maybe a Honda or Toyota, under $15,000.\" -> search \
form with Make (multi-select), Model and Max Price (number).
3. \"My shipping address is wrong, I moved recently.\" -> form with Street, City, State \
and Zip Code.
4. \"I'm getting too many alerts.\" -> form with Email Alerts (boolean), Push \
Notifications (boolean) and Daily Digest Time (time).
5. \"Book a flight for me next week.\" -> form with Departure City, Destination City, \
Departure Date, Return Date and Preferred Airline.
6. \"Plan a weekend getaway for me.\" -> form with Destination, Budget, Activities \
(multi-select) and Accommodation Type (dropdown).
7. \"Set up my profile.\" -> form with Full Name, Profile Picture (file upload), Bio \
(textarea) and Social Media Links (array of URLs).
8. \"What is the area of a rectangle?\" -> form with Length (number) and Width (number).
9. \"How much does it cost?\" -> check from the conversation what \"it\" refers to and \
ask for confirmation, or offer a radio choice when several items match.";

/// Envelope surfaced to the caller when the agent needs the user to fill a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    /// RJSF schema; the raw string when the model's text was not valid JSON.
    pub schema: Value,
    #[serde(rename = "uiSchema")]
    pub ui_schema: Value,
}

impl FormRequest {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "type": self.kind,
            "title": self.title,
            "description": self.description,
            "schema": self.schema,
            "uiSchema": self.ui_schema,
        })
    }

    /// Reads an interrupt payload back as a form request; `None` for other payloads.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("type").and_then(Value::as_str) != Some(FORM_REQUEST_TYPE) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// Builds the form envelope for a question. Never fails: schemas are not validated.
pub fn ask_question(question: &str, ui_schema: &str) -> FormRequest {
    tracing::debug!(
        question = %question,
        ui_schema = %ui_schema,
        "ask_question: requesting form input"
    );
    FormRequest {
        kind: FORM_REQUEST_TYPE.to_string(),
        title: FORM_TITLE.to_string(),
        description: FORM_DESCRIPTION.to_string(),
        schema: embed_json(question),
        ui_schema: embed_json(ui_schema),
    }
}

/// Parsed JSON when `raw` parses, otherwise `raw` as a JSON string.
pub fn embed_json(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Text stored as the tool result for a resume value: strings unquoted, anything else
/// serialized as JSON.
pub fn resume_value_to_content(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(super) fn spec() -> ToolSpec {
    ToolSpec {
        name: TOOL_ASK_QUESTION.to_string(),
        description: Some(DESCRIPTION.to_string()),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": concat!(
                        "A serialized JSON string representing a form schema ",
                        "that adheres to react-jsonschema-form."
                    )
                },
                "uiSchema": {
                    "type": "string",
                    "description":
                        "A serialized JSON string representing the UI schema for the form."
                }
            },
            "required": ["question", "uiSchema"]
        }),
    }
}
