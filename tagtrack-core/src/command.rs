//! Serialized channel commands
//!
//! A dispatch travels through the queue as one line of text in the channel's
//! command syntax:
//!
//! ```text
//! <functionName>('<eventType>', <jsonObject>, <callbackReference>)
//! ```
//!
//! The queue snapshot joins commands with `\n`, so a command never contains a
//! raw newline. JSON string escaping covers the payload, the event type is
//! escaped here, and line breaks in the configured function name or callback
//! are folded into spaces.

use crate::config::ChannelConfig;
use crate::error::Result;
use crate::types::Variables;

/// Renders payloads into channel commands.
#[derive(Debug, Clone)]
pub struct CommandFormat {
    function_name: String,
    callback: String,
}

impl CommandFormat {
    pub fn new(function_name: impl Into<String>, callback: impl Into<String>) -> Self {
        Self {
            function_name: single_line(&function_name.into()),
            callback: single_line(&callback.into()),
        }
    }

    pub fn from_config(config: &ChannelConfig) -> Self {
        Self::new(&config.function_name, &config.callback)
    }

    /// Render one command for `event_type` carrying `payload`
    pub fn render(&self, event_type: &str, payload: &Variables) -> Result<String> {
        let json = serde_json::to_string(payload)?;
        Ok(format!(
            "{}('{}', {}, {})",
            self.function_name,
            escape_single_quoted(event_type),
            json,
            self.callback
        ))
    }
}

impl Default for CommandFormat {
    fn default() -> Self {
        Self::from_config(&ChannelConfig::default())
    }
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Escape text for a single-quoted script string literal
fn escape_single_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
