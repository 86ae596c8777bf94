pub mod client;
pub mod payload;

pub use client::{FallbackChain, FallbackSource, HolderSource, PrimarySource};
pub use payload::{parse_fallback, parse_primary, HoldersPayload};
