//! Per-call fingerprint options.
//!
//! ```javascript
//! await getFingerprintWithOptions({ platform: "shell", secureDigest: false });
//! ```

use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::hashing::{default_secure_digester, DigestSelector};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FingerprintOptions {
    /// Application context; anything but "admin"/"shell" is coerced to "admin".
    pub platform: Option<String>,
    /// Try the secure digest before the fallback. Disable to force the
    /// fallback path.
    pub secure_digest: bool,
}

impl Default for FingerprintOptions {
    fn default() -> Self {
        Self {
            platform: None,
            secure_digest: true,
        }
    }
}

impl FingerprintOptions {
    pub fn with_platform(platform: impl Into<String>) -> Self {
        Self {
            platform: Some(platform.into()),
            ..Self::default()
        }
    }

    /// Decode options handed over from JS. `undefined`, `null` and
    /// undecodable values all mean defaults.
    pub fn from_js(options: JsValue) -> Self {
        if options.is_undefined() || options.is_null() {
            return Self::default();
        }
        serde_wasm_bindgen::from_value(options).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed fingerprint options: {}", e);
            Self::default()
        })
    }

    pub fn selector(&self) -> DigestSelector {
        if self.secure_digest {
            DigestSelector::new(default_secure_digester())
        } else {
            DigestSelector::fallback_only()
        }
    }
}
