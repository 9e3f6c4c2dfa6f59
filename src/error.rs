//! Error types for the fingerprint library
//!
//! None of these ever reach a caller. Digest errors are absorbed by the
//! fallback digester and environment errors degrade to default attribute
//! values, so every public operation, Rust or JS, always yields a digest.
//! The variants exist so the fallback decision is an explicit value that
//! can be logged and tested.

use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, FingerprintError>;

/// Main error type for the fingerprint library
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FingerprintError {
    /// The secure digest primitive cannot be reached at all
    /// (insecure context, no WebCrypto, not running in a browser).
    #[error("Secure digest unavailable: {0}")]
    DigestUnavailable(String),

    /// The secure digest primitive was reachable but rejected the request.
    #[error("Secure digest failed: {0}")]
    DigestFailed(String),

    #[error("Environment query failed: {0}")]
    Environment(String),
}

impl FingerprintError {
    /// Build an error from a thrown JS value, keeping its message if it has one
    pub(crate) fn from_js(kind: fn(String) -> Self, value: &JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| {
                js_sys::Reflect::get(value, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{:?}", value));
        kind(message)
    }
}
