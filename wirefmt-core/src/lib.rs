//! wirefmt core library
//!
//! This crate provides the error taxonomy, byte-order policy, write-once codec
//! configuration and bounds-checking primitives shared by the wirefmt codecs.

pub mod config;
pub mod error;
pub mod types;
pub mod wire;

// Re-export commonly used types
pub use config::CodecConfig;
pub use error::{Error, Result};
pub use types::MacAddr;
pub use wire::{align4, align_to, array_at, ensure_len, ByteOrderPolicy};
