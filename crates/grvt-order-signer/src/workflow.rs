/*
[INPUT]:  Order file, instrument source, signing key and optional account
[OUTPUT]: Signed order report and, when requested, the exchange response
[POS]:    Application layer - the sign and submit steps behind the CLI
[UPDATE]: When the CLI gains a step or the report format changes
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use grvt_order_adapter::{GrvtClient, InstrumentCatalog, Order, SignedOrder, SigningKey};
use serde_json::{Value, json};
use tracing::info;

/// Where instrument metadata comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentSource {
    /// `{symbol: {instrument_hash, base_decimals}}` JSON file
    File(PathBuf),
    /// Live listing, optionally written back to a file
    Fetch { save_to: Option<PathBuf> },
}

pub async fn load_catalog(client: &GrvtClient, source: &InstrumentSource) -> Result<InstrumentCatalog> {
    match source {
        InstrumentSource::File(path) => InstrumentCatalog::load(path)
            .with_context(|| format!("load instruments from {}", path.display())),
        InstrumentSource::Fetch { save_to } => {
            let catalog = client
                .fetch_catalog()
                .await
                .with_context(|| format!("fetch instruments from {}", client.config().env))?;
            if let Some(path) = save_to {
                catalog
                    .save(path)
                    .with_context(|| format!("save instruments to {}", path.display()))?;
            }
            Ok(catalog)
        }
    }
}

pub fn load_order(path: &Path) -> Result<Order> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read order file {}", path.display()))?;
    Order::from_json(&raw).with_context(|| format!("parse order file {}", path.display()))
}

/// Parse a hex key as read from a file or variable; surrounding whitespace is ignored
pub fn parse_signing_key(raw: &str) -> Result<SigningKey> {
    SigningKey::from_hex(raw.trim()).context("parse private key")
}

pub fn sign(
    client: &GrvtClient,
    catalog: InstrumentCatalog,
    order: &Order,
    key: &SigningKey,
) -> Result<SignedOrder> {
    let engine = client.signing_engine(Arc::new(catalog));
    let signed = engine.sign_order(order, key).context("sign order")?;
    info!(signer = %signed.signer, env = %client.config().env, "order ready for submission");
    Ok(signed)
}

/// Report printed on stdout
pub fn report(signed: &SignedOrder) -> Value {
    json!({
        "signer": signed.signer,
        "r": signed.r,
        "s": signed.s,
        "v": signed.v,
        "payload_to_sign": signed.payload_to_sign,
        "complete_order_payload": signed.complete_order_payload,
    })
}

pub async fn submit(client: &GrvtClient, account: &str, signed: &SignedOrder) -> Result<Value> {
    client
        .submit_order(account, signed)
        .await
        .with_context(|| format!("submit order for account {account}"))
}
