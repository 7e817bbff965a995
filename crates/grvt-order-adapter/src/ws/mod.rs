/*
[INPUT]:  Stream URLs, stream configuration and subscription requests
[OUTPUT]: Typed stream events with subscriptions kept across reconnects
[POS]:    WebSocket layer - real-time data streams
[UPDATE]: When adding new frame types or changing connection logic
*/

pub mod connection;
pub mod events;
pub mod message;
pub mod multiplexer;
pub mod registry;

pub use connection::{PrivateAuth, StreamConfig};
pub use events::{ConnectionKind, EventStream, OverflowPolicy, StreamEvent};
pub use message::{FeedFrame, InboundFrame, RpcMethod, RpcRequest, parse_frame};
pub use multiplexer::StreamMultiplexer;
pub use registry::{SubscriptionEntry, SubscriptionKey, SubscriptionState};
