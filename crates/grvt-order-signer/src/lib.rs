/*
[INPUT]:  Public API exports for grvt-order-signer crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod workflow;

// Re-export main types for convenience
pub use config::SignerConfig;
pub use workflow::InstrumentSource;
