/*
[INPUT]:  Order, signing key, instrument catalog, chain id
[OUTPUT]: SignedOrder with signature components and the submission payload
[POS]:    Signing layer - single entry point composing builder and signer
[UPDATE]: When signing output format changes
*/

use std::sync::Arc;

use tracing::info;

use crate::catalog::InstrumentCatalog;
use crate::http::Result;
use crate::signing::signer::{Signer, SigningKey};
use crate::signing::typed_data::{TypedDataBuilder, TypedDataPayload};
use crate::types::{Order, Signature, SignedOrder};

/// Builds, signs and augments orders for one chain
#[derive(Debug, Clone)]
pub struct OrderSigningEngine {
    catalog: Arc<InstrumentCatalog>,
    chain_id: u64,
    builder: TypedDataBuilder,
}

impl OrderSigningEngine {
    pub fn new(catalog: Arc<InstrumentCatalog>, chain_id: u64) -> Self {
        Self::with_builder(catalog, chain_id, TypedDataBuilder::default())
    }

    pub fn with_builder(
        catalog: Arc<InstrumentCatalog>,
        chain_id: u64,
        builder: TypedDataBuilder,
    ) -> Self {
        Self {
            catalog,
            chain_id,
            builder,
        }
    }

    pub fn catalog(&self) -> &InstrumentCatalog {
        &self.catalog
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn typed_data(&self, order: &Order) -> Result<TypedDataPayload> {
        self.builder.build(order, &self.catalog, self.chain_id)
    }

    /// Sign `order` and return it with `r`, `s`, `v` and `signer` filled in
    pub fn sign_order(&self, order: &Order, key: &SigningKey) -> Result<SignedOrder> {
        let payload = self.typed_data(order)?;
        let signature = Signer::sign(&payload, key)?;

        info!(
            signer = %signature.signer,
            sub_account_id = %order.sub_account_id,
            nonce = signature.nonce,
            chain_id = self.chain_id,
            "order signed"
        );

        let signed = apply_signature(order.clone(), &signature);
        Ok(SignedOrder {
            signer: signature.signer,
            r: signature.r,
            s: signature.s,
            v: signature.v,
            payload_to_sign: payload.to_json(),
            complete_order_payload: signed.into_envelope(),
        })
    }
}

/// Copy signature components into the order's signature block
pub fn apply_signature(mut order: Order, signature: &Signature) -> Order {
    order.signature.r = Some(signature.r.clone());
    order.signature.s = Some(signature.s.clone());
    order.signature.v = Some(signature.v);
    order.signature.signer = Some(signature.signer.clone());
    order.signature.expiration = signature.expiration;
    order.signature.nonce = signature.nonce;
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::GrvtError;
    use serde_json::json;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn engine() -> OrderSigningEngine {
        let catalog = InstrumentCatalog::from_json(
            r#"{"BTC_USDT_Perp": {"instrument_hash": "0x030501", "base_decimals": 9},
                "ETH_USDT_Perp": {"instrument_hash": "0x030401", "base_decimals": 9}}"#,
        )
        .unwrap();
        OrderSigningEngine::new(Arc::new(catalog), 325)
    }

    fn order() -> Order {
        Order::from_value(json!({
            "order": {
                "sub_account_id": "42",
                "is_market": false,
                "time_in_force": "GOOD_TILL_TIME",
                "post_only": false,
                "reduce_only": false,
                "legs": [{
                    "instrument": "BTC_USDT_Perp",
                    "size": "1.5",
                    "limit_price": "115038.01",
                    "is_buying_asset": true
                }],
                "signature": {"expiration": "1697788800000000000", "nonce": 1234567890},
                "metadata": {"client_order_id": "23042"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_complete_payload_carries_signature() {
        let key = SigningKey::from_hex(TEST_KEY).unwrap();
        let signed = engine().sign_order(&order(), &key).unwrap();
        let payload = serde_json::to_value(&signed.complete_order_payload).unwrap();
        let signature = &payload["order"]["signature"];

        assert_eq!(signature["r"], json!(signed.r));
        assert_eq!(signature["s"], json!(signed.s));
        assert_eq!(signature["v"], json!(28));
        assert_eq!(signature["signer"], json!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert_eq!(signature["expiration"], json!("1697788800000000000"));
        assert_eq!(signature["nonce"], json!(1234567890));
        assert_eq!(payload["order"]["metadata"]["client_order_id"], json!("23042"));
        assert_eq!(signed.payload_to_sign["primaryType"], json!("Order"));
    }

    #[test]
    fn test_single_field_changes_alter_signature() {
        let key = SigningKey::from_hex(TEST_KEY).unwrap();
        let engine = engine();
        let baseline = engine.sign_order(&order(), &key).unwrap();

        let mut variants = Vec::new();
        let mut size = order();
        size.legs[0].size = "1.6".parse().unwrap();
        variants.push(size);
        let mut price = order();
        price.legs[0].limit_price = Some("115038.02".parse().unwrap());
        variants.push(price);
        let mut side = order();
        side.legs[0].is_buying_asset = false;
        variants.push(side);
        let mut instrument = order();
        instrument.legs[0].instrument = "ETH_USDT_Perp".to_string();
        variants.push(instrument);
        let mut nonce = order();
        nonce.signature.nonce += 1;
        variants.push(nonce);

        for variant in variants {
            let signed = engine.sign_order(&variant, &key).unwrap();
            assert_ne!((signed.r, signed.s), (baseline.r.clone(), baseline.s.clone()));
        }
    }

    #[test]
    fn test_validation_precedes_signing() {
        let key = SigningKey::from_hex(TEST_KEY).unwrap();
        let mut bad = order();
        bad.legs[0].instrument = "UNKNOWN".to_string();
        let err = engine().sign_order(&bad, &key).unwrap_err();
        assert!(matches!(err, GrvtError::UnknownInstrument { .. }));
    }
}
