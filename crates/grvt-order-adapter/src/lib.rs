/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public GRVT adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod env;
pub mod http;
pub mod signing;
pub mod types;
pub mod ws;

pub use auth::{ApiKeyLogin, Session, SessionConfig, SessionManager, SessionRefresher};

pub use catalog::{InstrumentCatalog, InstrumentMetadata, InstrumentRecord};
pub use client::GrvtClient;
pub use config::ClientConfig;
pub use env::{EnvironmentEndpoints, EnvironmentRegistry};

pub use http::{
    ApiCall,
    BlockingDispatcher,
    GrvtError,
    HttpConfig,
    RequestDispatcher,
    Result,
    RetryConfig,
    RetryPolicy,
};

pub use signing::{OrderSigningEngine, Signer, SigningKey, TypedDataBuilder, TypedDataPayload};

// Re-export all types
pub use types::*;

pub use ws::{
    ConnectionKind,
    EventStream,
    OverflowPolicy,
    StreamConfig,
    StreamEvent,
    StreamMultiplexer,
    SubscriptionState,
};
