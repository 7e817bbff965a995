/*
[INPUT]:  Order payload schema and serde requirements
[OUTPUT]: Typed order, leg, signature and signing-result structs
[POS]:    Data layer - type definitions for order construction and submission
[UPDATE]: When the order payload schema changes
*/

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::enums::TimeInForce;
use crate::http::{GrvtError, Result};

/// An order as submitted to the order-entry endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub sub_account_id: String,
    #[serde(default)]
    pub is_market: bool,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub post_only: bool,
    #[serde(default)]
    pub reduce_only: bool,
    pub legs: Vec<OrderLeg>,
    pub signature: OrderSignature,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
    /// Fields not interpreted by the signer, passed through on submission
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLeg {
    pub instrument: String,
    #[serde(
        deserialize_with = "serde_helpers::deserialize_decimal",
        serialize_with = "serde_helpers::serialize_decimal"
    )]
    pub size: Decimal,
    #[serde(
        default,
        deserialize_with = "serde_helpers::deserialize_decimal_opt",
        serialize_with = "serde_helpers::serialize_decimal_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub limit_price: Option<Decimal>,
    pub is_buying_asset: bool,
}

/// Order signature block; `r`, `s`, `v` and `signer` are filled by signing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v: Option<u8>,
    /// Expiration in unix nanoseconds
    #[serde(
        deserialize_with = "serde_helpers::deserialize_i64",
        serialize_with = "serde_helpers::serialize_i64"
    )]
    pub expiration: i64,
    pub nonce: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
}

impl OrderSignature {
    pub fn unsigned(expiration: i64, nonce: u32) -> Self {
        Self {
            expiration,
            nonce,
            ..Self::default()
        }
    }

    pub fn is_signed(&self) -> bool {
        self.r.is_some() && self.s.is_some() && self.v.is_some() && self.signer.is_some()
    }
}

/// `{"order": {...}}` wrapper used by the create-order endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEnvelope {
    pub order: Order,
}

impl Order {
    /// Parse an order from JSON, accepting both the wrapped and the bare form.
    ///
    /// Malformed payloads (including unsupported time-in-force values) are
    /// reported as `InvalidOrder`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| GrvtError::InvalidOrder(format!("malformed order JSON: {err}")))?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> Result<Self> {
        if let Some(inner) = value.get_mut("order").map(Value::take) {
            value = inner;
        }
        serde_json::from_value(value)
            .map_err(|err| GrvtError::InvalidOrder(format!("malformed order: {err}")))
    }

    pub fn into_envelope(self) -> OrderEnvelope {
        OrderEnvelope { order: self }
    }
}

/// Signature components produced for a single signing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// 0x-prefixed 32-byte hex
    pub r: String,
    /// 0x-prefixed 32-byte hex
    pub s: String,
    /// Recovery value, 27 or 28
    pub v: u8,
    /// Checksummed address recovered from the signature
    pub signer: String,
    pub expiration: i64,
    pub nonce: u32,
}

/// Full result of signing an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedOrder {
    pub signer: String,
    pub r: String,
    pub s: String,
    pub v: u8,
    /// Domain, types, primary type and message exactly as hashed
    pub payload_to_sign: Value,
    pub complete_order_payload: OrderEnvelope,
}

mod serde_helpers {
    use super::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use std::str::FromStr;

    fn decimal_from_value<E: serde::de::Error>(value: &Value) -> Result<Decimal, E> {
        if let Some(raw) = value.as_str() {
            return Decimal::from_str(raw.trim()).map_err(E::custom);
        }
        if value.is_number() {
            return Decimal::from_str(&value.to_string()).map_err(E::custom);
        }
        Err(E::custom("invalid decimal value"))
    }

    pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        decimal_from_value(&value)
    }

    pub fn deserialize_decimal_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(None);
        }
        if value.as_str().is_some_and(|raw| raw.trim().is_empty()) {
            return Ok(None);
        }
        decimal_from_value(&value).map(Some)
    }

    pub fn serialize_decimal<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn serialize_decimal_opt<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => serializer.serialize_str(&value.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
            Value::Number(number) => number
                .as_i64()
                .ok_or_else(|| serde::de::Error::custom("integer out of range")),
            _ => Err(serde::de::Error::custom("invalid integer value")),
        }
    }

    pub fn serialize_i64<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_order_json() -> Value {
        json!({
            "order": {
                "sub_account_id": "42",
                "is_market": false,
                "time_in_force": "GOOD_TILL_TIME",
                "legs": [{
                    "instrument": "BTC_USDT_Perp",
                    "size": "1.5",
                    "limit_price": "115038.01",
                    "is_buying_asset": true
                }],
                "signature": {
                    "expiration": "1697788800000000000",
                    "nonce": 1234567890
                },
                "metadata": { "client_order_id": "23042" }
            }
        })
    }

    #[test]
    fn test_parse_wrapped_and_bare_orders() {
        let wrapped = Order::from_value(sample_order_json()).unwrap();
        let bare = Order::from_value(sample_order_json()["order"].clone()).unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(wrapped.sub_account_id, "42");
        assert_eq!(wrapped.signature.expiration, 1_697_788_800_000_000_000);
        assert_eq!(wrapped.legs[0].size.to_string(), "1.5");
        assert_eq!(wrapped.legs[0].limit_price.unwrap().to_string(), "115038.01");
    }

    #[test]
    fn test_defaults_when_flags_are_omitted() {
        let order = Order::from_value(json!({
            "sub_account_id": "7",
            "legs": [{"instrument": "ETH_USDT_Perp", "size": "2", "is_buying_asset": false}],
            "signature": {"expiration": 1700000000000000000i64, "nonce": 1}
        }))
        .unwrap();

        assert_eq!(order.time_in_force, TimeInForce::GoodTillTime);
        assert!(!order.is_market && !order.post_only && !order.reduce_only);
        assert!(order.metadata.is_empty());
        assert!(order.legs[0].limit_price.is_none());
        assert!(!order.signature.is_signed());
    }

    #[test]
    fn test_unsupported_time_in_force_is_invalid_order() {
        let mut raw = sample_order_json();
        raw["order"]["time_in_force"] = json!("GOOD_TILL_CANCEL");
        let err = Order::from_value(raw).unwrap_err();
        assert!(matches!(err, GrvtError::InvalidOrder(_)));
    }

    #[test]
    fn test_serialization_keeps_wire_format() {
        let order = Order::from_value(sample_order_json()).unwrap();
        let value = serde_json::to_value(order.into_envelope()).unwrap();

        assert_eq!(value["order"]["signature"]["expiration"], json!("1697788800000000000"));
        assert_eq!(value["order"]["legs"][0]["size"], json!("1.5"));
        assert_eq!(value["order"]["metadata"]["client_order_id"], json!("23042"));
        assert!(value["order"]["signature"].get("r").is_none());
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let mut raw = sample_order_json();
        raw["order"]["state"] = json!({"status": "PENDING"});
        let order = Order::from_value(raw).unwrap();
        assert_eq!(order.extra["state"]["status"], json!("PENDING"));

        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["state"]["status"], json!("PENDING"));
    }
}
