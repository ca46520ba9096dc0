//! The decoded AI command and the client context that travels with it.
//!
//! On the wire (the JSON embedded in a QR code) a command looks like:
//!
//! ```json
//! {
//!   "cmd": "location-assistant",
//!   "prm": { "intent": "coffee nearby" },
//!   "context": {
//!     "location": { "latitude": 52.52, "longitude": 13.40 },
//!     "device": { "platform": "iPhone" },
//!     "timestamp": "2024-05-01T09:30:00Z",
//!     "locale": "de-DE"
//!   }
//! }
//! ```
//!
//! The long key names (`command`, `parameters`, `clientContext`) are accepted
//! as aliases. Decoding is lenient about everything except the command name:
//! a wrongly-typed `prm` or `context` is ignored, a missing `cmd` is not.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// A structured command recovered from a transport payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCommand {
    /// Command name, e.g. `contextual-search`. Never empty.
    #[serde(rename = "cmd")]
    pub command: String,

    /// Free-form command parameters.
    #[serde(rename = "prm", skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,

    /// Optional information the scanning device attached.
    #[serde(rename = "context", skip_serializing_if = "ClientContext::is_empty")]
    pub client_context: ClientContext,
}

impl DecodedCommand {
    /// Create a command with no parameters and an empty context.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            parameters: Map::new(),
            client_context: ClientContext::default(),
        }
    }

    /// Builder: set a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Builder: replace the client context.
    pub fn with_context(mut self, context: ClientContext) -> Self {
        self.client_context = context;
        self
    }

    /// Build a command from a parsed JSON record.
    ///
    /// Returns `DecodeFailure` when the record is not an object and
    /// `MissingCommand` when `cmd` is absent, empty or not a string.
    pub fn from_record(record: Value) -> Result<Self, PayloadError> {
        let Value::Object(mut record) = record else {
            return Err(PayloadError::DecodeFailure(
                "payload is not a JSON object".into(),
            ));
        };

        let command = match take_either(&mut record, "cmd", "command") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(PayloadError::MissingCommand),
        };

        let parameters = match take_either(&mut record, "prm", "parameters") {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => Map::new(),
            Some(other) => {
                tracing::debug!(kind = value_kind(&other), "Ignoring non-object command parameters");
                Map::new()
            }
        };

        let client_context = take_either(&mut record, "context", "clientContext")
            .map(|v| ClientContext::from_value(&v))
            .unwrap_or_default();

        Ok(Self {
            command,
            parameters,
            client_context,
        })
    }

    /// Parse a command from JSON text.
    pub fn from_json(text: &str) -> Result<Self, PayloadError> {
        let record: Value = serde_json::from_str(text)
            .map_err(|e| PayloadError::DecodeFailure(format!("invalid JSON: {e}")))?;
        Self::from_record(record)
    }

    /// Read a defaulted parameter as prompt text.
    ///
    /// For parameters the templates fall back on with `||`: anything falsy
    /// (`null`, `false`, `0`, `""`) counts as absent so the default applies.
    pub fn param(&self, key: &str) -> Option<String> {
        self.parameters
            .get(key)
            .filter(|v| is_truthy(v))
            .map(prompt_text)
    }

    /// The raw value of a parameter. Only a missing key or JSON `null` is
    /// absent; `0`, `false` and `""` are values.
    pub fn param_value(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key).filter(|v| !v.is_null())
    }

    /// [`param_value`](Self::param_value) rendered as prompt text.
    pub fn param_text(&self, key: &str) -> Option<String> {
        self.param_value(key).map(prompt_text)
    }
}

/// JavaScript truthiness, which the QR generator's payloads are written
/// against. Arrays and objects are always truthy, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a JSON value for interpolation into a prompt.
///
/// Scalars print as JavaScript would print them (`3`, not `3.0`; `false`;
/// strings unquoted). Arrays and objects print as compact JSON.
pub fn prompt_text(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| f.to_string()).unwrap_or_default()
            }
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Context the scanning client attached to the request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl ClientContext {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.device.is_none()
            && self.timestamp.is_none()
            && self.locale.is_none()
    }

    /// Read a context record, dropping fields that are absent or mistyped.
    pub fn from_value(value: &Value) -> Self {
        let Some(record) = value.as_object() else {
            if !value.is_null() {
                tracing::debug!(kind = value_kind(value), "Ignoring non-object client context");
            }
            return Self::default();
        };

        Self {
            location: record.get("location").and_then(Location::from_value),
            device: record.get("device").filter(|d| is_truthy(d)).cloned(),
            timestamp: truthy_text(record.get("timestamp")),
            locale: truthy_text(record.get("locale")),
        }
    }
}

/// Where the client is, or why it could not tell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Location {
    Coordinates { latitude: f64, longitude: f64 },
    Unavailable { error: String },
}

impl Location {
    /// A location object with neither a coordinate pair nor an error is
    /// treated as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        let record = value.as_object()?;
        let latitude = record.get("latitude").and_then(coordinate);
        let longitude = record.get("longitude").and_then(coordinate);
        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            return Some(Self::Coordinates {
                latitude,
                longitude,
            });
        }
        truthy_text(record.get("error")).map(|error| Self::Unavailable { error })
    }
}

fn take_either(record: &mut Map<String, Value>, short: &str, long: &str) -> Option<Value> {
    record.remove(short).or_else(|| record.remove(long))
}

fn truthy_text(value: Option<&Value>) -> Option<String> {
    value.filter(|v| is_truthy(v)).map(prompt_text)
}

/// A coordinate may arrive as a number or a numeric string.
fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
