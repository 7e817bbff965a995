/*
[INPUT]:  Signed orders and cancel requests with an account session
[OUTPUT]: Order-entry responses
[POS]:    HTTP layer - trading endpoints (session cookie, never retried)
[UPDATE]: When adding trading endpoints or changing order flow
*/

use serde_json::Value;
use tracing::info;

use crate::http::client::PreparedRequest;
use crate::http::dispatcher::{ApiCall, BlockingDispatcher, RequestDispatcher};
use crate::http::{GrvtError, Result};
use crate::types::{CancelOrderRequest, OrderResponse, SignedOrder};

impl RequestDispatcher {
    /// Submit a signed order
    ///
    /// POST {trade_data}/full/v1/create_order
    /// Requires: session cookie. A transport failure is returned as-is, the
    /// order may or may not have reached the exchange.
    pub async fn create_order(&self, account: &str, signed: &SignedOrder) -> Result<Value> {
        if !signed.complete_order_payload.order.signature.is_signed() {
            return Err(GrvtError::InvalidOrder(
                "order payload carries no signature".to_string(),
            ));
        }

        let request = PreparedRequest::post(
            self.endpoints().create_order_url(),
            &signed.complete_order_payload,
        )?;
        let response: OrderResponse = self
            .send(ApiCall::new("create_order", request).authenticated(account))
            .await?;

        info!(
            account,
            signer = %signed.signer,
            nonce = signed.complete_order_payload.order.signature.nonce,
            "order submitted"
        );
        Ok(response.result)
    }

    /// Cancel an order
    ///
    /// POST {trade_data}/full/v1/cancel_order
    pub async fn cancel_order(&self, account: &str, cancel: &CancelOrderRequest) -> Result<Value> {
        if cancel.order_id.is_none() && cancel.client_order_id.is_none() {
            return Err(GrvtError::InvalidOrder(
                "cancel needs an order_id or a client_order_id".to_string(),
            ));
        }

        let request = PreparedRequest::post(self.endpoints().cancel_order_url(), cancel)?;
        let response: OrderResponse = self
            .send(ApiCall::new("cancel_order", request).authenticated(account))
            .await?;

        info!(account, sub_account_id = %cancel.sub_account_id, "order cancelled");
        Ok(response.result)
    }
}

impl BlockingDispatcher {
    pub fn create_order(&self, account: &str, signed: &SignedOrder) -> Result<Value> {
        self.block_on(self.inner().create_order(account, signed))?
    }

    pub fn cancel_order(&self, account: &str, cancel: &CancelOrderRequest) -> Result<Value> {
        self.block_on(self.inner().cancel_order(account, cancel))?
    }
}
