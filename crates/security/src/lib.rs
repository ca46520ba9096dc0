//! Security module for QR Nexus: payload encryption and decoding.
//!
//! Provides:
//! - **Codec**: turn a `nexus_ai` transport string into a [`DecodedCommand`],
//!   decrypting with a passphrase-derived AES-256-GCM key when configured and
//!   falling back to plain base64 for payloads that were never encrypted
//! - **Sealing**: the generator side, producing transport strings for QR codes
//! - **Stats**: lock-free counters that make silent fallbacks visible
//!
//! [`DecodedCommand`]: nexus_core::DecodedCommand

pub mod codec;
pub mod stats;

pub use codec::{decode, derive_key, encode_plain, DecodePath, Decoded, PayloadCodec};
pub use stats::{DecodeCounters, DecodeStats};
