//! Transport payload codec.
//!
//! A QR code carries its command as a URL-safe base64 string. When the
//! generator was given a passphrase the bytes are `IV (12) ‖ AES-256-GCM
//! ciphertext ‖ tag (16)`, with the key derived by PBKDF2-HMAC-SHA256 over the
//! passphrase. Otherwise the bytes are the command JSON itself.
//!
//! The transport has no format flag, so decoding is two explicit stages:
//!
//! 1. with a key configured, try to open the blob as a sealed payload;
//! 2. if that is skipped or fails for any reason, read the same blob as
//!    plain JSON.
//!
//! A stage-1 failure is logged and counted as a fallback, never returned.
//! Only when stage 2 fails too does the caller see `DecodeFailure`.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::Aes256Gcm;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use nexus_core::{DecodedCommand, PayloadError};
use pbkdf2::pbkdf2_hmac;
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::stats::{DecodeCounters, DecodeStats};

/// Salt shared with the QR generator.
pub const KDF_SALT: &[u8] = b"ai-qr-nexus-salt";

/// PBKDF2 iteration count shared with the QR generator.
pub const KDF_ROUNDS: u32 = 100_000;

/// AES-GCM IV length in bytes.
pub const IV_LEN: usize = 12;

const TAG_LEN: usize = 16;

/// Standard alphabet, accepting input with or without `=` padding.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Which stage produced a decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePath {
    /// Opened with the configured key.
    Decrypted,
    /// A key is configured but the payload was plain; recovered by stage 2.
    PlainFallback,
    /// No key configured.
    Plain,
}

/// A decoded command and how it was recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub command: DecodedCommand,
    pub path: DecodePath,
}

/// Why the sealed stage could not open a payload.
#[derive(Debug, thiserror::Error)]
enum OpenError {
    #[error("transport is not valid base64")]
    Base64,

    #[error("blob of {0} bytes is too short for IV and tag")]
    TooShort(usize),

    #[error("authentication failed (wrong passphrase or corrupted data)")]
    Authentication,

    #[error("{0}")]
    Record(String),
}

/// Decodes (and seals) transport payloads.
///
/// The key is derived once at construction; the passphrase is process-wide
/// configuration and never changes afterwards.
pub struct PayloadCodec {
    cipher: Option<Aes256Gcm>,
    counters: DecodeCounters,
}

impl std::fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCodec")
            .field("encrypted", &self.cipher.is_some())
            .field("stats", &self.counters.snapshot())
            .finish()
    }
}

impl PayloadCodec {
    /// Create a codec. `None` (or an empty passphrase) selects plain-only
    /// decoding for the codec's lifetime.
    pub fn new(passphrase: Option<&str>) -> Self {
        match passphrase.filter(|p| !p.is_empty()) {
            Some(passphrase) => Self::from_key(derive_key(passphrase)),
            None => Self::plain(),
        }
    }

    /// A codec that never attempts decryption.
    pub fn plain() -> Self {
        Self {
            cipher: None,
            counters: DecodeCounters::new(),
        }
    }

    /// Create a codec from raw key bytes.
    pub fn from_key(key: [u8; 32]) -> Self {
        Self {
            cipher: Some(Aes256Gcm::new(GenericArray::from_slice(&key))),
            counters: DecodeCounters::new(),
        }
    }

    /// Whether a key is configured.
    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Decode a transport string into a validated command.
    pub fn decode(&self, transport: &str) -> Result<Decoded, PayloadError> {
        let result = self.decode_inner(transport);
        match &result {
            Ok(decoded) => match decoded.path {
                DecodePath::Decrypted => self.counters.record_decrypted(),
                DecodePath::Plain => self.counters.record_plain(),
                // counted when the fallback was taken
                DecodePath::PlainFallback => {}
            },
            Err(PayloadError::MissingCommand) => self.counters.record_missing_command(),
            Err(_) => self.counters.record_failure(),
        }
        result
    }

    fn decode_inner(&self, transport: &str) -> Result<Decoded, PayloadError> {
        let normalized = normalize(transport);
        if normalized.is_empty() {
            return Err(PayloadError::DecodeFailure("payload is empty".into()));
        }

        let blob = LENIENT_STANDARD.decode(normalized.as_bytes()).ok();

        let (record, path) = match &self.cipher {
            Some(cipher) => match open_sealed(cipher, blob.as_deref()) {
                Ok(record) => (record, DecodePath::Decrypted),
                Err(reason) => {
                    self.counters.record_fallback();
                    warn!(
                        event = "payload_fallback",
                        reason = %reason,
                        "Decryption failed, interpreting payload as plain base64"
                    );
                    (read_plain(blob.as_deref())?, DecodePath::PlainFallback)
                }
            },
            None => (read_plain(blob.as_deref())?, DecodePath::Plain),
        };

        let command = DecodedCommand::from_record(record)?;
        debug!(command = %command.command, path = ?path, "Payload decoded");
        Ok(Decoded { command, path })
    }

    /// Produce a transport string for `command`.
    ///
    /// With a key this encrypts under a fresh random IV; without one it is
    /// the same as [`encode_plain`].
    pub fn seal(&self, command: &DecodedCommand) -> Result<String, PayloadError> {
        let Some(cipher) = &self.cipher else {
            return encode_plain(command);
        };

        let plaintext =
            serde_json::to_vec(command).map_err(|e| PayloadError::Seal(e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        {
            use rand::Rng;
            rand::rng().fill(&mut iv[..]);
        }

        let ciphertext = cipher
            .encrypt(GenericArray::from_slice(&iv), plaintext.as_slice())
            .map_err(|_| PayloadError::Seal("encryption failed".into()))?;

        let mut blob = Vec::with_capacity(IV_LEN + ciphertext.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    /// Snapshot of this codec's decode counters.
    pub fn stats(&self) -> DecodeStats {
        self.counters.snapshot()
    }
}

/// Decode `transport` with an optional passphrase.
///
/// Derives the key on every call; long-lived callers should build a
/// [`PayloadCodec`] once instead.
pub fn decode(transport: &str, passphrase: Option<&str>) -> Result<DecodedCommand, PayloadError> {
    PayloadCodec::new(passphrase)
        .decode(transport)
        .map(|decoded| decoded.command)
}

/// Encode a command as unencrypted URL-safe base64 JSON.
pub fn encode_plain(command: &DecodedCommand) -> Result<String, PayloadError> {
    let json = serde_json::to_vec(command).map_err(|e| PayloadError::Seal(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Derive the 256-bit payload key from a passphrase.
pub fn derive_key(passphrase: &str) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), KDF_SALT, KDF_ROUNDS, &mut key);
    key
}

/// Map the URL-safe alphabet onto the standard one.
///
/// A literal `+` that reached us through form-decoding arrives as a space,
/// so spaces are kept (and restored) rather than trimmed.
fn normalize(transport: &str) -> String {
    transport
        .trim_matches(|c: char| c.is_whitespace() && c != ' ')
        .chars()
        .map(|c| match c {
            '-' | ' ' => '+',
            '_' => '/',
            other => other,
        })
        .collect()
}

fn open_sealed(cipher: &Aes256Gcm, blob: Option<&[u8]>) -> Result<Value, OpenError> {
    let blob = blob.ok_or(OpenError::Base64)?;
    if blob.len() < IV_LEN + TAG_LEN {
        return Err(OpenError::TooShort(blob.len()));
    }

    let (iv, sealed) = blob.split_at(IV_LEN);
    let plaintext = cipher
        .decrypt(GenericArray::from_slice(iv), sealed)
        .map_err(|_| OpenError::Authentication)?;

    parse_record(&plaintext).map_err(OpenError::Record)
}

fn read_plain(blob: Option<&[u8]>) -> Result<Value, PayloadError> {
    let blob =
        blob.ok_or_else(|| PayloadError::DecodeFailure("payload is not valid base64".into()))?;
    parse_record(blob).map_err(PayloadError::DecodeFailure)
}

fn parse_record(bytes: &[u8]) -> Result<Value, String> {
    let text = std::str::from_utf8(bytes).map_err(|_| "payload is not valid UTF-8".to_string())?;
    let record: Value =
        serde_json::from_str(text).map_err(|e| format!("payload is not valid JSON: {e}"))?;
    if !record.is_object() {
        return Err("payload is not a JSON object".into());
    }
    Ok(record)
}
