/*
[INPUT]:  Exchange request schemas
[OUTPUT]: Serializable request bodies for REST and login calls
[POS]:    Data layer - request types for API communication
[UPDATE]: When request parameters change
*/

use serde::{Deserialize, Serialize};

/// Body of the instrument listing query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllInstrumentsRequest {
    pub is_active: bool,
}

impl Default for AllInstrumentsRequest {
    fn default() -> Self {
        Self { is_active: true }
    }
}

/// Body of the API-key session login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyLoginRequest {
    pub api_key: String,
}

/// Cancel by exchange order id or by client order id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub sub_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
}
