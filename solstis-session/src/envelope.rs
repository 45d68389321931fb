//! Message envelope
//!
//! Every message on the wire has the shape
//!
//! ```text
//! {"message": {"transmission_id": [<int>], "op": "<command>", "parameters": {...}}}
//! ```
//!
//! `parameters` is optional. Replies use `op = "<command>_reply"`.

use crate::error::{SolstisError, SolstisResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Op suffix the controller appends to the name of the answered command
pub const REPLY_SUFFIX: &str = "_reply";

/// Op of a reply rejecting a request outright
pub const PARSE_FAIL_OP: &str = "parse_fail";

/// Op of an unsolicited TeraScan telemetry push
pub const AUTOMATIC_OUTPUT_OP: &str = "automatic_output";

#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    message: WireMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transmission_id: Option<TransmissionId>,
    op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parameters: Option<Map<String, Value>>,
}

/// The controller wraps IDs in a one-element array; bare integers are accepted
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum TransmissionId {
    List(Vec<u32>),
    Bare(u32),
}

impl TransmissionId {
    fn first(&self) -> Option<u32> {
        match self {
            TransmissionId::List(ids) => ids.first().copied(),
            TransmissionId::Bare(id) => Some(*id),
        }
    }
}

/// A decoded protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub transmission_id: Option<u32>,
    pub op: String,
    pub parameters: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope for an outbound request
    ///
    /// `parameters` must be a JSON object or `None`.
    pub fn request(op: &str, parameters: Option<Value>, transmission_id: u32) -> SolstisResult<Self> {
        let parameters = match parameters {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(SolstisError::Validation(format!(
                    "Parameters of '{}' must be a JSON object, got {}",
                    op, other
                )));
            }
        };
        Ok(Self {
            transmission_id: Some(transmission_id),
            op: op.to_string(),
            parameters,
        })
    }

    /// Encode to the compact wire form
    pub fn encode(&self) -> SolstisResult<Vec<u8>> {
        let wire = WireEnvelope {
            message: WireMessage {
                transmission_id: self.transmission_id.map(|id| TransmissionId::List(vec![id])),
                op: self.op.clone(),
                parameters: if self.parameters.is_empty() {
                    None
                } else {
                    Some(self.parameters.clone())
                },
            },
        };
        serde_json::to_vec(&wire)
            .map_err(|e| SolstisError::InvalidData(format!("Failed to encode '{}': {}", self.op, e)))
    }

    /// Decode from an extracted JSON document
    pub fn decode(document: Value) -> SolstisResult<Self> {
        let wire: WireEnvelope = serde_json::from_value(document)
            .map_err(|e| SolstisError::Framing(format!("Message envelope is malformed: {}", e)))?;
        Ok(Self {
            transmission_id: wire.message.transmission_id.as_ref().and_then(TransmissionId::first),
            op: wire.message.op,
            parameters: wire.message.parameters.unwrap_or_default(),
        })
    }

    /// Reply op the controller uses to answer `op`
    pub fn reply_op(op: &str) -> String {
        format!("{}{}", op, REPLY_SUFFIX)
    }

    /// Check whether this is an unsolicited telemetry push
    pub fn is_unsolicited(&self) -> bool {
        self.op == AUTOMATIC_OUTPUT_OP
    }

    /// Check whether the controller rejected the request
    pub fn is_parse_fail(&self) -> bool {
        self.op == PARSE_FAIL_OP
    }

    /// Look up a reply parameter
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Look up a reply parameter that must be present
    pub fn require(&self, name: &str) -> SolstisResult<&Value> {
        self.parameter(name).ok_or_else(|| {
            SolstisError::InvalidData(format!("'{}' message has no '{}' parameter", self.op, name))
        })
    }

    /// Read a numeric parameter, unwrapping the controller's one-element arrays
    pub fn number(&self, name: &str) -> SolstisResult<f64> {
        let value = self.require(name)?;
        first_scalar(value).and_then(Value::as_f64).ok_or_else(|| {
            SolstisError::InvalidData(format!(
                "'{}' parameter '{}' is not numeric: {}",
                self.op, name, value
            ))
        })
    }

    /// Read a text parameter, unwrapping one-element arrays
    pub fn text(&self, name: &str) -> SolstisResult<&str> {
        let value = self.require(name)?;
        first_scalar(value).and_then(Value::as_str).ok_or_else(|| {
            SolstisError::InvalidData(format!(
                "'{}' parameter '{}' is not text: {}",
                self.op, name, value
            ))
        })
    }
}

/// Unwrap a one-element array, or return a scalar unchanged
pub fn first_scalar(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.first(),
        other => Some(other),
    }
}
