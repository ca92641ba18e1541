//! Raw backend message shape and conversion into typed messages

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Message, MessageContent, Role};

/// A message as exchanged with the backend.
///
/// Content blocks stay un-typed until [`convert_api_message`] parses them,
/// and the display flags do not exist on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}

impl From<&Message> for ApiMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            role: message.role.as_str().to_string(),
            created: message.created,
            content: message
                .content
                .iter()
                .filter_map(|c| serde_json::to_value(c).ok())
                .collect(),
        }
    }
}

/// Convert a raw backend message into a typed message with explicit flags.
///
/// Fails on an unknown role or on any content block that does not parse.
pub fn convert_api_message(raw: ApiMessage, display: bool, send_to_llm: bool) -> Result<Message> {
    let role = Role::parse(&raw.role)
        .ok_or_else(|| Error::Conversion(format!("unknown role: {}", raw.role)))?;

    let content = raw
        .content
        .into_iter()
        .enumerate()
        .map(|(idx, block)| {
            serde_json::from_value::<MessageContent>(block).map_err(|e| {
                Error::Conversion(format!("content block {} is malformed: {}", idx, e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Message {
        id: raw.id,
        role,
        created: raw.created,
        content,
        display,
        send_to_llm,
    })
}
