//! Decode counters.
//!
//! The codec bumps one counter per decode attempt; the gateway exposes a
//! snapshot on `/health` so a passphrase mismatch (every payload falling
//! back) shows up without reading logs.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, shared by reference between concurrent decodes.
#[derive(Debug, Default)]
pub struct DecodeCounters {
    decrypted: AtomicU64,
    plain: AtomicU64,
    fallbacks: AtomicU64,
    failures: AtomicU64,
    missing_command: AtomicU64,
}

/// A point-in-time copy of [`DecodeCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Payloads opened with the configured key.
    pub decrypted: u64,
    /// Payloads decoded as plain base64 with no passphrase configured.
    pub plain: u64,
    /// Decryption attempts that fell back to plain decoding.
    pub fallbacks: u64,
    /// Payloads neither stage could decode.
    pub failures: u64,
    /// Payloads that decoded but carried no command.
    pub missing_command: u64,
}

impl DecodeCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_decrypted(&self) {
        self.decrypted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_plain(&self) {
        self.plain.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_missing_command(&self) {
        self.missing_command.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DecodeStats {
        DecodeStats {
            decrypted: self.decrypted.load(Ordering::Relaxed),
            plain: self.plain.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            missing_command: self.missing_command.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn snapshot_reflects_records() {
        let counters = DecodeCounters::new();
        counters.record_decrypted();
        counters.record_fallback();
        counters.record_fallback();
        counters.record_failure();

        let stats = counters.snapshot();
        assert_eq!(stats.decrypted, 1);
        assert_eq!(stats.fallbacks, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.plain, 0);
        assert_eq!(stats.missing_command, 0);
    }

    #[test]
    fn counters_are_shared_across_threads() {
        let counters = Arc::new(DecodeCounters::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counters = counters.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        counters.record_plain();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counters.snapshot().plain, 1000);
    }

    #[test]
    fn stats_serialize_for_health_output() {
        let json = serde_json::to_value(DecodeStats::default()).unwrap();
        assert_eq!(json["fallbacks"], 0);
        assert_eq!(json["missing_command"], 0);
    }
}
