//! Fingerprint hashing
//!
//! A record is canonicalized into a `|`-delimited string and reduced to a
//! hex digest. The [`DigestSelector`] prefers a secure (SHA-256) digester
//! and drops to the [`FallbackDigester`] whenever the secure one reports
//! an error. Which path produced a digest travels with it in
//! [`FingerprintDigest::path`].
//!
//! ```text
//! FingerprintRecord ─ canonicalize ─▶ "macos|10.15.7|…|admin"
//!                                        │
//!                          secure ok? ───┼──▶ 64 hex chars (Secure)
//!                          otherwise ────┴──▶ 32 hex chars (Fallback)
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod fallback;
pub mod secure;

pub use fallback::{fallback_digest, FallbackDigester, FALLBACK_DIGEST_LEN};
pub use secure::{Sha256Digester, SubtleCryptoDigester, SECURE_DIGEST_LEN};

use crate::error::Result;
use crate::fingerprint::FingerprintRecord;

/// Field separator of the canonical form. Not escaped: a field containing
/// `|` makes two different records canonicalize identically.
pub const FIELD_DELIMITER: &str = "|";

/// Which digester produced a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestPath {
    Secure,
    Fallback,
}

impl DigestPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestPath::Secure => "secure",
            DigestPath::Fallback => "fallback",
        }
    }
}

impl fmt::Display for DigestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hex digest together with the path that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintDigest {
    pub value: String,
    pub path: DigestPath,
}

impl FingerprintDigest {
    pub fn is_secure(&self) -> bool {
        self.path == DigestPath::Secure
    }
}

impl fmt::Display for FingerprintDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A string-to-hex digest function.
///
/// Implementations signal "cannot run here" with
/// [`FingerprintError::DigestUnavailable`](crate::FingerprintError::DigestUnavailable)
/// and runtime failures with
/// [`FingerprintError::DigestFailed`](crate::FingerprintError::DigestFailed).
#[async_trait(?Send)]
pub trait Digester {
    fn path(&self) -> DigestPath;

    async fn digest(&self, input: &str) -> Result<String>;
}

/// Join the record's fields in fixed order with [`FIELD_DELIMITER`].
///
/// Order: device platform, OS version, screen width, screen height, pixel
/// ratio, timezone, language, application platform.
pub fn canonicalize(record: &FingerprintRecord) -> String {
    let attrs = &record.attributes;
    [
        attrs.device_platform.as_str().to_string(),
        attrs.os_version.clone(),
        attrs.screen_width.to_string(),
        attrs.screen_height.to_string(),
        js_number_string(attrs.pixel_ratio),
        attrs.timezone.clone(),
        attrs.language.clone(),
        record.platform.as_str().to_string(),
    ]
    .join(FIELD_DELIMITER)
}

/// Render a number the way JavaScript's `String(n)` does, so a record
/// canonicalizes identically on either side of the WASM boundary.
///
/// Rust's `Display` agrees for magnitudes in `[1e-6, 1e21)`; outside that
/// range JS switches to exponent form (`1e-7`, `1.5e+21`). Both print the
/// shortest round-tripping digits.
pub fn js_number_string(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }

    let exp = format!("{:e}", n);
    match exp.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => exp,
    }
}

/// The platform's preferred secure digester: WebCrypto in the browser,
/// `sha2` everywhere else.
pub fn default_secure_digester() -> Box<dyn Digester> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(SubtleCryptoDigester)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(Sha256Digester)
    }
}

/// Tries the secure digester, falls back on any error.
pub struct DigestSelector {
    secure: Option<Box<dyn Digester>>,
    fallback: FallbackDigester,
}

impl DigestSelector {
    pub fn new(secure: Box<dyn Digester>) -> Self {
        Self {
            secure: Some(secure),
            fallback: FallbackDigester,
        }
    }

    /// Selector that never attempts a secure digest.
    pub fn fallback_only() -> Self {
        Self {
            secure: None,
            fallback: FallbackDigester,
        }
    }

    pub async fn digest(&self, input: &str) -> FingerprintDigest {
        if let Some(secure) = &self.secure {
            match secure.digest(input).await {
                Ok(value) => {
                    log::debug!("Digest computed via {} path", secure.path());
                    return FingerprintDigest {
                        value,
                        path: secure.path(),
                    };
                }
                Err(e) => {
                    log::warn!("Secure digest failed, using fallback digest: {}", e);
                }
            }
        }

        FingerprintDigest {
            value: self.fallback.digest_now(input),
            path: DigestPath::Fallback,
        }
    }

    pub async fn hash_attributes(&self, record: &FingerprintRecord) -> FingerprintDigest {
        let canonical = canonicalize(record);
        log::debug!("Hashing canonical record ({} bytes)", canonical.len());
        self.digest(&canonical).await
    }
}

impl Default for DigestSelector {
    fn default() -> Self {
        Self::new(default_secure_digester())
    }
}

impl fmt::Debug for DigestSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestSelector")
            .field("secure", &self.secure.as_ref().map(|d| d.path()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{AttributeRecord, DevicePlatform};
    use crate::error::FingerprintError;
    use crate::fingerprint::AppPlatform;
    use crate::test_support::warnings_during;
    use futures::executor::block_on;

    struct UnavailableDigester;

    #[async_trait(?Send)]
    impl Digester for UnavailableDigester {
        fn path(&self) -> DigestPath {
            DigestPath::Secure
        }

        async fn digest(&self, _input: &str) -> Result<String> {
            Err(FingerprintError::DigestUnavailable("insecure context".into()))
        }
    }

    struct ThrowingDigester;

    #[async_trait(?Send)]
    impl Digester for ThrowingDigester {
        fn path(&self) -> DigestPath {
            DigestPath::Secure
        }

        async fn digest(&self, _input: &str) -> Result<String> {
            Err(FingerprintError::DigestFailed("OperationError".into()))
        }
    }

    fn sample_record() -> FingerprintRecord {
        FingerprintRecord {
            attributes: AttributeRecord {
                device_platform: DevicePlatform::Macos,
                os_version: "10.15.7".into(),
                screen_width: 1440,
                screen_height: 900,
                pixel_ratio: 2.0,
                timezone: "America/New_York".into(),
                language: "en-US".into(),
            },
            platform: AppPlatform::Admin,
        }
    }

    const SAMPLE_CANONICAL: &str = "macos|10.15.7|1440|900|2|America/New_York|en-US|admin";

    #[test]
    fn test_canonicalize_example() {
        assert_eq!(canonicalize(&sample_record()), SAMPLE_CANONICAL);
    }

    #[test]
    fn test_canonicalize_fractional_ratio() {
        let mut record = sample_record();
        record.attributes.pixel_ratio = 1.5;
        assert!(canonicalize(&record).contains("|1.5|"));
    }

    #[test]
    fn test_js_number_string() {
        assert_eq!(js_number_string(2.0), "2");
        assert_eq!(js_number_string(1.25), "1.25");
        assert_eq!(js_number_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(js_number_string(0.000001), "0.000001");
        assert_eq!(js_number_string(1e20), "100000000000000000000");
        assert_eq!(js_number_string(0.0), "0");
        assert_eq!(js_number_string(-0.0), "0");

        assert_eq!(js_number_string(1e-7), "1e-7");
        assert_eq!(js_number_string(2.5e-7), "2.5e-7");
        assert_eq!(js_number_string(1e21), "1e+21");
        assert_eq!(js_number_string(1.5e21), "1.5e+21");
        assert_eq!(js_number_string(-1.5e21), "-1.5e+21");

        assert_eq!(js_number_string(f64::NAN), "NaN");
        assert_eq!(js_number_string(f64::INFINITY), "Infinity");
        assert_eq!(js_number_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_canonicalize_tiny_ratio_uses_exponent_form() {
        let mut record = sample_record();
        record.attributes.pixel_ratio = 1e-7;
        assert_eq!(
            canonicalize(&record),
            "macos|10.15.7|1440|900|1e-7|America/New_York|en-US|admin"
        );
    }

    #[test]
    fn test_every_field_changes_output() {
        let base = canonicalize(&sample_record());
        let mutations: [fn(&mut FingerprintRecord); 8] = [
            |r| r.attributes.device_platform = DevicePlatform::Linux,
            |r| r.attributes.os_version = "11.0".into(),
            |r| r.attributes.screen_width = 1441,
            |r| r.attributes.screen_height = 901,
            |r| r.attributes.pixel_ratio = 3.0,
            |r| r.attributes.timezone = "Europe/London".into(),
            |r| r.attributes.language = "en-GB".into(),
            |r| r.platform = AppPlatform::Shell,
        ];

        let selector = DigestSelector::fallback_only();
        let base_digest = block_on(selector.hash_attributes(&sample_record()));
        for mutate in mutations {
            let mut record = sample_record();
            mutate(&mut record);
            assert_ne!(canonicalize(&record), base);
            assert_ne!(block_on(selector.hash_attributes(&record)), base_digest);
        }
    }

    #[test]
    fn test_delimiter_collision_is_not_escaped() {
        let mut a = sample_record();
        a.attributes.timezone = "UTC|en".into();
        a.attributes.language = "US".into();
        let mut b = sample_record();
        b.attributes.timezone = "UTC".into();
        b.attributes.language = "en|US".into();
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }

    #[test]
    fn test_selector_prefers_secure() {
        let selector = DigestSelector::new(Box::new(Sha256Digester));
        let digest = block_on(selector.digest(SAMPLE_CANONICAL));
        assert_eq!(digest.path, DigestPath::Secure);
        assert!(digest.is_secure());
        assert_eq!(
            digest.value,
            "8bcab341524f8fe088456593012724506875978e92395a36e06e696634925bae"
        );
    }

    #[test]
    fn test_selector_falls_back_when_unavailable() {
        let selector = DigestSelector::new(Box::new(UnavailableDigester));
        let digest = block_on(selector.digest(SAMPLE_CANONICAL));
        assert_eq!(digest.path, DigestPath::Fallback);
        assert_eq!(digest.value, "3dd429171a8639af4595579f6643214a");
    }

    #[test]
    fn test_selector_warns_only_on_fallback() {
        let selector = DigestSelector::new(Box::new(UnavailableDigester));
        let (digest, warnings) = warnings_during(|| block_on(selector.digest(SAMPLE_CANONICAL)));
        assert_eq!(digest.path, DigestPath::Fallback);
        assert_eq!(warnings.len(), 1, "{:?}", warnings);
        assert!(warnings[0].contains("insecure context"));

        let selector = DigestSelector::new(Box::new(Sha256Digester));
        let (digest, warnings) = warnings_during(|| block_on(selector.digest(SAMPLE_CANONICAL)));
        assert_eq!(digest.path, DigestPath::Secure);
        assert!(warnings.is_empty(), "{:?}", warnings);

        let (_, warnings) =
            warnings_during(|| block_on(DigestSelector::fallback_only().digest(SAMPLE_CANONICAL)));
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_selector_falls_back_on_error() {
        let selector = DigestSelector::new(Box::new(ThrowingDigester));
        let digest = block_on(selector.hash_attributes(&sample_record()));
        assert_eq!(digest.path, DigestPath::Fallback);
        assert_eq!(digest.value.len(), FALLBACK_DIGEST_LEN);
    }

    #[test]
    fn test_hash_attributes_deterministic() {
        for selector in [DigestSelector::default(), DigestSelector::fallback_only()] {
            let a = block_on(selector.hash_attributes(&sample_record()));
            let b = block_on(selector.hash_attributes(&sample_record()));
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_digest_path_serde() {
        assert_eq!(serde_json::to_value(DigestPath::Fallback).unwrap(), "fallback");
        assert_eq!(DigestPath::Secure.to_string(), "secure");
    }
}
