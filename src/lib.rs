//! # Device Fingerprint
//!
//! Stable device/browser identifier for session binding and fraud
//! signals, compiled to WebAssembly.
//!
//! ## Architecture
//!
//! ```text
//! EnvironmentSource (navigator, screen, Intl)
//!   ↓
//! Attribute collector  → AttributeRecord
//!   ↓  + application platform (admin | shell)
//! Canonicalization     → "macos|10.15.7|1440|900|2|America/New_York|en-US|admin"
//!   ↓
//! DigestSelector       → SHA-256 (WebCrypto) or fallback digest
//! ```
//!
//! ## Usage
//!
//! ```javascript
//! import init, { getFingerprint, getHash } from './pkg/device_fingerprint.js';
//! await init();
//! const { attributes, hash, hashPath } = await getFingerprint("shell");
//! const digest = await getHash();          // platform defaults to "admin"
//! ```
//!
//! Nothing in here fails the caller: unknown agents classify as `web`,
//! unknown versions as `unknown`, bad platforms become `admin`, and an
//! unreachable WebCrypto (plain HTTP origins) means the 32 character
//! fallback digest instead of the 64 character SHA-256 one.

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod attributes;
pub mod config;
pub mod environment;
mod error;
pub mod fingerprint;
pub mod hashing;
mod test_support;

pub use attributes::{
    classify_platform, collect_attributes, extract_os_version, AttributeRecord, DevicePlatform,
    EnvironmentSnapshot,
};
pub use config::FingerprintOptions;
pub use environment::{BrowserEnvironment, EnvironmentSource, StaticEnvironment};
pub use error::{FingerprintError, Result};
pub use fingerprint::{
    AppPlatform, FingerprintRecord, FingerprintResult, Fingerprinter, RawFingerprintRecord,
};
pub use hashing::{
    canonicalize, fallback_digest, DigestPath, DigestSelector, Digester, FallbackDigester,
    FingerprintDigest, Sha256Digester, SubtleCryptoDigester,
};

/// Initialize the fingerprint module
///
/// Sets up console logging. Safe to call more than once.
#[wasm_bindgen(start)]
pub fn init() {
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("Device fingerprint module initialized");
    }
}

/// Plain-object serialization (structs with flattened fields would
/// otherwise come out as ES `Map`s).
fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(Into::into)
}

/// Collect the current environment attributes.
#[wasm_bindgen(js_name = collectAttributes)]
pub fn collect_attributes_js() -> std::result::Result<JsValue, JsValue> {
    let record = collect_attributes(&BrowserEnvironment.snapshot());
    to_js(&record)
}

/// Hash a caller-supplied record (attributes plus `platform`).
///
/// Never rejects: missing or wrongly-typed fields take their defaults
/// and anything that is not an object hashes as an all-default record.
#[wasm_bindgen(js_name = generateHash)]
pub async fn generate_hash_js(record: JsValue) -> String {
    let raw = RawFingerprintRecord::from_js(record);
    Fingerprinter::default().generate_hash_raw(raw).await.value
}

/// Collect attributes and hash them.
///
/// Returns `{ attributes, hash, hashPath }`.
#[wasm_bindgen(js_name = getFingerprint)]
pub async fn get_fingerprint_js(platform: Option<String>) -> std::result::Result<JsValue, JsValue> {
    let result = Fingerprinter::default()
        .get_fingerprint(&BrowserEnvironment, platform.as_deref())
        .await;
    to_js(&result)
}

/// Like `getFingerprint` but configured by a `FingerprintOptions` object.
#[wasm_bindgen(js_name = getFingerprintWithOptions)]
pub async fn get_fingerprint_with_options_js(
    options: JsValue,
) -> std::result::Result<JsValue, JsValue> {
    let options = FingerprintOptions::from_js(options);
    let result = Fingerprinter::from_options(&options)
        .get_fingerprint(&BrowserEnvironment, options.platform.as_deref())
        .await;
    to_js(&result)
}

/// Collect attributes and return only the digest.
#[wasm_bindgen(js_name = getHash)]
pub async fn get_hash_js(platform: Option<String>) -> String {
    Fingerprinter::default()
        .get_hash(&BrowserEnvironment, platform.as_deref())
        .await
}
