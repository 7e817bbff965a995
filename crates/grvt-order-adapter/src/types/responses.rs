/*
[INPUT]:  Exchange response schemas
[OUTPUT]: Deserializable response envelopes and instrument listings
[POS]:    Data layer - response types for API communication
[UPDATE]: When response format changes
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{"result": ...}` envelope shared by the full-format endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope<T> {
    pub result: T,
}

/// One row of the instrument listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub instrument: String,
    pub instrument_hash: String,
    pub base_decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<String>,
}

pub type InstrumentsResponse = ResultEnvelope<Vec<InstrumentInfo>>;

/// Order echo returned by create/cancel; kept loose since only ids are consumed
pub type OrderResponse = ResultEnvelope<Value>;

/// Error body returned alongside non-2xx statuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<i64>,
}
