//! SHA-256 digesters.
//!
//! [`SubtleCryptoDigester`] goes through WebCrypto and is only reachable
//! in secure contexts (HTTPS or localhost); elsewhere `crypto.subtle` is
//! undefined and it reports [`FingerprintError::DigestUnavailable`].
//! [`Sha256Digester`] is the pure-Rust equivalent used off the browser.

use async_trait::async_trait;
use js_sys::{Reflect, Uint8Array};
use sha2::{Digest, Sha256};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::SubtleCrypto;

use super::{DigestPath, Digester};
use crate::error::{FingerprintError, Result};

/// Length of a secure digest in hex characters.
pub const SECURE_DIGEST_LEN: usize = 64;

const WEBCRYPTO_ALGORITHM: &str = "SHA-256";

/// WebCrypto `crypto.subtle.digest("SHA-256", ...)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubtleCryptoDigester;

impl SubtleCryptoDigester {
    /// Look up `crypto.subtle` on the global object (window or worker).
    fn subtle() -> Result<SubtleCrypto> {
        let global: JsValue = js_sys::global().into();
        let crypto = Reflect::get(&global, &JsValue::from_str("crypto"))
            .map_err(|e| FingerprintError::from_js(FingerprintError::DigestUnavailable, &e))?;
        if crypto.is_undefined() || crypto.is_null() {
            return Err(FingerprintError::DigestUnavailable(
                "crypto is not defined".into(),
            ));
        }

        let subtle = Reflect::get(&crypto, &JsValue::from_str("subtle"))
            .map_err(|e| FingerprintError::from_js(FingerprintError::DigestUnavailable, &e))?;
        if subtle.is_undefined() || subtle.is_null() {
            return Err(FingerprintError::DigestUnavailable(
                "crypto.subtle is not defined (insecure context)".into(),
            ));
        }
        Ok(subtle.unchecked_into())
    }
}

#[async_trait(?Send)]
impl Digester for SubtleCryptoDigester {
    fn path(&self) -> DigestPath {
        DigestPath::Secure
    }

    async fn digest(&self, input: &str) -> Result<String> {
        let subtle = Self::subtle()?;
        let data = Uint8Array::from(input.as_bytes());

        let promise = subtle
            .digest_with_str_and_buffer_source(WEBCRYPTO_ALGORITHM, &data)
            .map_err(|e| FingerprintError::from_js(FingerprintError::DigestFailed, &e))?;
        let buffer = JsFuture::from(promise)
            .await
            .map_err(|e| FingerprintError::from_js(FingerprintError::DigestFailed, &e))?;

        let bytes = Uint8Array::new(&buffer).to_vec();
        if bytes.len() * 2 != SECURE_DIGEST_LEN {
            return Err(FingerprintError::DigestFailed(format!(
                "unexpected digest size: {} bytes",
                bytes.len()
            )));
        }
        Ok(hex::encode(bytes))
    }
}

/// SHA-256 via the `sha2` crate. Never unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digester;

impl Sha256Digester {
    pub fn digest_now(&self, input: &str) -> String {
        hex::encode(Sha256::digest(input.as_bytes()))
    }
}

#[async_trait(?Send)]
impl Digester for Sha256Digester {
    fn path(&self) -> DigestPath {
        DigestPath::Secure
    }

    async fn digest(&self, input: &str) -> Result<String> {
        Ok(self.digest_now(input))
    }
}
