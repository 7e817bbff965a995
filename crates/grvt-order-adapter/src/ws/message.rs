/*
[INPUT]:  Raw stream text frames and subscription keys
[OUTPUT]: JSON-RPC subscribe/unsubscribe frames and parsed inbound frames
[POS]:    WebSocket layer - message framing and validation
[UPDATE]: When adding new frame types or changing the wire format
*/

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::http::{GrvtError, Result};

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcMethod {
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamParams {
    pub stream: String,
    pub selectors: Vec<String>,
}

/// Outbound control frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub method: RpcMethod,
    pub params: StreamParams,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: RpcMethod, stream: &str, selectors: &[String], id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params: StreamParams {
                stream: stream.to_string(),
                selectors: selectors.to_vec(),
            },
            id,
        }
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One data message on a subscribed stream
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeedFrame {
    pub stream: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default, deserialize_with = "deserialize_sequence")]
    pub sequence_number: Option<u64>,
    pub feed: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Successful response to a control frame
    Ack { id: u64, result: Value },
    /// Rejected control frame
    RpcError { id: Option<u64>, error: RpcErrorBody },
    Feed(FeedFrame),
}

/// Parse a text frame; anything unrecognised is a `Protocol` error
pub fn parse_frame(text: &str) -> Result<InboundFrame> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| GrvtError::Protocol(format!("frame is not JSON: {err}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| GrvtError::Protocol("frame is not a JSON object".to_string()))?;

    let id = object.get("id").and_then(Value::as_u64);

    if let Some(error) = object.get("error") {
        let error = serde_json::from_value(error.clone())
            .map_err(|err| GrvtError::Protocol(format!("malformed error frame: {err}")))?;
        return Ok(InboundFrame::RpcError { id, error });
    }

    if let Some(result) = object.get("result") {
        let id = id.ok_or_else(|| GrvtError::Protocol("response frame without id".to_string()))?;
        return Ok(InboundFrame::Ack {
            id,
            result: result.clone(),
        });
    }

    if object.contains_key("feed") {
        let frame = serde_json::from_value(value)
            .map_err(|err| GrvtError::Protocol(format!("malformed feed frame: {err}")))?;
        return Ok(InboundFrame::Feed(frame));
    }

    Err(GrvtError::Protocol(format!(
        "unrecognised frame: {}",
        truncate_for_log(text, 256)
    )))
}

fn deserialize_sequence<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("sequence_number out of range")),
        Some(Value::String(raw)) => raw.parse().map(Some).map_err(serde::de::Error::custom),
        Some(_) => Err(serde::de::Error::custom("invalid sequence_number")),
    }
}

pub(crate) fn truncate_for_log(value: &str, max_len: usize) -> String {
    if value.len() <= max_len {
        return value.to_string();
    }
    let mut end = max_len;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::with_capacity(end + 3);
    out.push_str(&value[..end]);
    out.push_str("...");
    out
}
