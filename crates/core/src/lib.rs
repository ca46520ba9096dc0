//! # QR Nexus Core
//!
//! Domain types, traits, and error definitions for the QR Nexus AI-command
//! proxy. This crate has **zero framework dependencies**; it defines the
//! model that the codec, dispatcher, providers and gateway build against.
//!
//! ## Pipeline
//!
//! ```text
//! transport string ─▶ PayloadCodec ─▶ DecodedCommand ─▶ CommandDispatcher
//!                                                            │
//!                       response text ◀─ Provider ◀─ PromptSpec
//! ```
//!
//! The codec and dispatcher are pure; the only I/O happens behind the
//! [`Provider`] trait.

pub mod command;
pub mod error;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use command::{ClientContext, DecodedCommand, Location};
pub use error::{DispatchError, Error, PayloadError, PayloadErrorKind, ProviderError, Result};
pub use provider::{PromptSpec, Provider};
