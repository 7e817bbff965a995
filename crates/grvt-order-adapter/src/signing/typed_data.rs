/*
[INPUT]:  Order, instrument catalog, chain id
[OUTPUT]: EIP-712 typed-data payload (domain + Order struct) ready for hashing
[POS]:    Signing layer - canonical typed-data construction
[UPDATE]: When the on-chain Order schema or domain version changes
*/

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::catalog::InstrumentCatalog;
use crate::http::{GrvtError, Result};
use crate::signing::scaling::{to_fixed_point, PRICE_DECIMALS};
use crate::types::Order;

pub const DOMAIN_NAME: &str = "GRVT Exchange";
pub const DOMAIN_VERSION: &str = "0";

/// Declared field order of the signed structs; the struct hash depends on it
pub const ORDER_SCHEMA: &[(&str, &[(&str, &str)])] = &[
    (
        "Order",
        &[
            ("subAccountID", "uint64"),
            ("isMarket", "bool"),
            ("timeInForce", "uint8"),
            ("postOnly", "bool"),
            ("reduceOnly", "bool"),
            ("legs", "OrderLeg[]"),
            ("nonce", "uint32"),
            ("expiration", "int64"),
        ],
    ),
    (
        "OrderLeg",
        &[
            ("assetID", "uint256"),
            ("contractSize", "uint64"),
            ("limitPrice", "uint64"),
            ("isBuyingContract", "bool"),
        ],
    ),
];

pub mod eip712 {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct OrderLeg {
            uint256 assetID;
            uint64 contractSize;
            uint64 limitPrice;
            bool isBuyingContract;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Order {
            uint64 subAccountID;
            bool isMarket;
            uint8 timeInForce;
            bool postOnly;
            bool reduceOnly;
            OrderLeg[] legs;
            uint32 nonce;
            int64 expiration;
        }
    }
}

/// Domain fields fixed per signing-scheme version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    pub name: &'static str,
    pub version: &'static str,
    /// The v0 scheme binds no verifying contract
    pub verifying_contract: Option<Address>,
}

impl DomainSpec {
    pub const GRVT_V0: DomainSpec = DomainSpec {
        name: DOMAIN_NAME,
        version: DOMAIN_VERSION,
        verifying_contract: None,
    };

    pub fn domain(&self, chain_id: u64) -> Eip712Domain {
        Eip712Domain::new(
            Some(Cow::Borrowed(self.name)),
            Some(Cow::Borrowed(self.version)),
            Some(U256::from(chain_id)),
            self.verifying_contract,
            None,
        )
    }
}

impl Default for DomainSpec {
    fn default() -> Self {
        Self::GRVT_V0
    }
}

/// Domain separator fields plus the typed `Order` message
#[derive(Debug, Clone, PartialEq)]
pub struct TypedDataPayload {
    pub domain: Eip712Domain,
    pub message: eip712::Order,
    /// Hex instrument hashes per leg, for display
    pub asset_hashes: Vec<String>,
}

impl TypedDataPayload {
    pub fn domain_separator(&self) -> B256 {
        self.domain.hash_struct()
    }

    pub fn struct_hash(&self) -> B256 {
        self.message.eip712_hash_struct()
    }

    /// `keccak256(0x19 0x01 || domainSeparator || structHash)`
    pub fn signing_hash(&self) -> B256 {
        let mut buf = [0u8; 66];
        buf[0] = 0x19;
        buf[1] = 0x01;
        buf[2..34].copy_from_slice(self.domain_separator().as_slice());
        buf[34..66].copy_from_slice(self.struct_hash().as_slice());
        keccak256(buf)
    }

    /// JSON rendering of what is signed: domain, types, primaryType, message
    pub fn to_json(&self) -> Value {
        let mut domain = Map::new();
        if let Some(name) = &self.domain.name {
            domain.insert("name".into(), json!(name));
        }
        if let Some(version) = &self.domain.version {
            domain.insert("version".into(), json!(version));
        }
        if let Some(chain_id) = self.domain.chain_id {
            domain.insert("chainId".into(), json!(chain_id.to::<u64>()));
        }
        if let Some(contract) = self.domain.verifying_contract {
            domain.insert("verifyingContract".into(), json!(contract.to_checksum(None)));
        }

        let mut types = Map::new();
        for (name, fields) in ORDER_SCHEMA {
            let fields: Vec<Value> = fields
                .iter()
                .map(|(field, ty)| json!({"name": field, "type": ty}))
                .collect();
            types.insert((*name).to_string(), Value::Array(fields));
        }

        let legs: Vec<Value> = self
            .message
            .legs
            .iter()
            .zip(&self.asset_hashes)
            .map(|(leg, hash)| {
                json!({
                    "assetID": hash,
                    "contractSize": leg.contractSize,
                    "limitPrice": leg.limitPrice,
                    "isBuyingContract": leg.isBuyingContract,
                })
            })
            .collect();

        json!({
            "domain": domain,
            "types": types,
            "primaryType": "Order",
            "message": {
                "subAccountID": self.message.subAccountID,
                "isMarket": self.message.isMarket,
                "timeInForce": self.message.timeInForce,
                "postOnly": self.message.postOnly,
                "reduceOnly": self.message.reduceOnly,
                "legs": legs,
                "nonce": self.message.nonce,
                "expiration": self.message.expiration,
            }
        })
    }
}

/// Converts an order into its typed-data payload
#[derive(Debug, Clone, Default)]
pub struct TypedDataBuilder {
    domain: DomainSpec,
}

impl TypedDataBuilder {
    pub fn new(domain: DomainSpec) -> Self {
        Self { domain }
    }

    /// Validate `order` against `catalog` and assemble the payload.
    ///
    /// Every check runs before anything is hashed; the first failure is returned.
    pub fn build(
        &self,
        order: &Order,
        catalog: &InstrumentCatalog,
        chain_id: u64,
    ) -> Result<TypedDataPayload> {
        if order.legs.is_empty() {
            return Err(GrvtError::InvalidOrder("order has no legs".into()));
        }

        let sub_account_id: u64 = order.sub_account_id.trim().parse().map_err(|_| {
            GrvtError::InvalidOrder(format!(
                "sub_account_id '{}' is not a uint64",
                order.sub_account_id
            ))
        })?;

        let mut legs = Vec::with_capacity(order.legs.len());
        let mut asset_hashes = Vec::with_capacity(order.legs.len());
        for leg in &order.legs {
            let instrument = catalog.require(&leg.instrument)?;

            if leg.size <= rust_decimal::Decimal::ZERO {
                return Err(GrvtError::InvalidOrder(format!(
                    "leg {} size must be positive, got {}",
                    leg.instrument, leg.size
                )));
            }
            let contract_size = to_fixed_point(leg.size, instrument.base_decimals, "size")?;

            let limit_price = match leg.limit_price {
                Some(price) if !order.is_market && price <= rust_decimal::Decimal::ZERO => {
                    return Err(GrvtError::InvalidOrder(format!(
                        "leg {} limit_price must be positive, got {price}",
                        leg.instrument
                    )));
                }
                Some(price) => to_fixed_point(price, PRICE_DECIMALS, "limit_price")?,
                None if order.is_market => 0,
                None => {
                    return Err(GrvtError::InvalidOrder(format!(
                        "leg {} needs a limit_price for a limit order",
                        leg.instrument
                    )));
                }
            };

            legs.push(eip712::OrderLeg {
                assetID: instrument.asset_id,
                contractSize: contract_size,
                limitPrice: limit_price,
                isBuyingContract: leg.is_buying_asset,
            });
            asset_hashes.push(instrument.instrument_hash.clone());
        }

        let message = eip712::Order {
            subAccountID: sub_account_id,
            isMarket: order.is_market,
            timeInForce: order.time_in_force.sign_code(),
            postOnly: order.post_only,
            reduceOnly: order.reduce_only,
            legs,
            nonce: order.signature.nonce,
            expiration: order.signature.expiration,
        };

        debug!(
            sub_account_id,
            legs = message.legs.len(),
            chain_id,
            nonce = message.nonce,
            "typed data built"
        );

        Ok(TypedDataPayload {
            domain: self.domain.domain(chain_id),
            message,
            asset_hashes,
        })
    }
}
