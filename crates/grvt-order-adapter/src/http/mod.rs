/*
[INPUT]:  HTTP configuration, environment endpoints and session credentials
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing dispatch behavior
*/

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod market;
pub mod retry;
pub mod trade;

pub use error::{GrvtError, Result};

pub use client::{HttpConfig, PreparedRequest, ReqwestTransport, Transport, TransportResponse};
pub use dispatcher::{ApiCall, BlockingDispatcher, RequestDispatcher};
pub use retry::{RetryConfig, RetryPolicy};
