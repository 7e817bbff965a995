/*
[INPUT]:  Orders, instrument metadata, signing keys
[OUTPUT]: EIP-712 typed data and deterministic order signatures
[POS]:    Signing layer - order construction and signing
[UPDATE]: When the signing scheme or order schema changes
*/

pub mod engine;
pub mod scaling;
pub mod signer;
pub mod typed_data;

pub use engine::{apply_signature, OrderSigningEngine};
pub use scaling::{to_fixed_point, PRICE_DECIMALS};
pub use signer::{Signer, SigningKey};
pub use typed_data::{DomainSpec, TypedDataBuilder, TypedDataPayload, ORDER_SCHEMA};
