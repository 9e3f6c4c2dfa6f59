//! Fingerprint orchestration
//!
//! Collect → attach application platform → hash. Every call is a fresh,
//! independent computation; [`Fingerprinter`] holds configuration only.

use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use wasm_bindgen::JsValue;

use crate::attributes::{collect_attributes, AttributeRecord, DevicePlatform};
use crate::config::FingerprintOptions;
use crate::environment::EnvironmentSource;
use crate::hashing::{DigestPath, DigestSelector, FingerprintDigest};

/// The calling application. Distinct from the device platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppPlatform {
    #[default]
    Admin,
    Shell,
}

impl AppPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppPlatform::Admin => "admin",
            AppPlatform::Shell => "shell",
        }
    }

    /// Coerce a caller-supplied value. Anything other than exactly
    /// "admin" or "shell" (including a missing value) becomes `Admin`
    /// with a warning.
    pub fn coerce(value: Option<&str>) -> Self {
        match value {
            Some("admin") => AppPlatform::Admin,
            Some("shell") => AppPlatform::Shell,
            other => {
                log::warn!(
                    "Invalid platform {:?}, defaulting to \"{}\"",
                    other,
                    AppPlatform::Admin
                );
                AppPlatform::Admin
            }
        }
    }
}

impl fmt::Display for AppPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes plus the application platform: the full hash input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintRecord {
    #[serde(flatten)]
    pub attributes: AttributeRecord,
    pub platform: AppPlatform,
}

/// A field of a caller-supplied record: absent, usable, or present with
/// a value of the wrong type.
#[derive(Debug, Clone, PartialEq)]
enum Lenient<T> {
    Missing,
    Valid(T),
    Invalid,
}

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Lenient::Missing
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr<T> {
            Valid(Option<T>),
            Invalid(IgnoredAny),
        }

        Ok(match Repr::<T>::deserialize(deserializer)? {
            Repr::Valid(Some(value)) => Lenient::Valid(value),
            Repr::Valid(None) => Lenient::Missing,
            Repr::Invalid(_) => Lenient::Invalid,
        })
    }
}

impl<T> Lenient<T> {
    fn into_option(self, field: &str) -> Option<T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Missing => None,
            Lenient::Invalid => {
                log::warn!("Ignoring malformed \"{}\" in fingerprint record", field);
                None
            }
        }
    }

    fn or(self, field: &str, default: T) -> T {
        self.into_option(field).unwrap_or(default)
    }
}

/// A record as handed in by a caller, before validation.
///
/// Decoding never fails on field contents: a missing, `null` or
/// wrongly-typed field takes the [`AttributeRecord`] default (the
/// wrongly-typed case with a warning), and the platform goes through
/// [`AppPlatform::coerce`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFingerprintRecord {
    device_platform: Lenient<DevicePlatform>,
    os_version: Lenient<String>,
    screen_width: Lenient<u32>,
    screen_height: Lenient<u32>,
    pixel_ratio: Lenient<f64>,
    timezone: Lenient<String>,
    language: Lenient<String>,
    platform: Lenient<String>,
}

impl RawFingerprintRecord {
    /// Decode a record handed over from JS. `undefined`, `null` and
    /// values that are not objects at all mean an all-default record.
    pub fn from_js(record: JsValue) -> Self {
        if record.is_undefined() || record.is_null() {
            return Self::default();
        }
        Self::or_default(serde_wasm_bindgen::from_value(record))
    }

    fn or_default<E: fmt::Display>(decoded: Result<Self, E>) -> Self {
        decoded.unwrap_or_else(|e| {
            log::warn!("Ignoring malformed fingerprint record: {}", e);
            Self::default()
        })
    }

    /// Resolve every field, substituting defaults for unusable ones.
    /// The platform is returned as given; coercion happens when hashing.
    pub fn into_parts(self) -> (AttributeRecord, Option<String>) {
        let defaults = AttributeRecord::default();
        let attributes = AttributeRecord {
            device_platform: self
                .device_platform
                .or("devicePlatform", defaults.device_platform),
            os_version: self.os_version.or("osVersion", defaults.os_version),
            screen_width: self.screen_width.or("screenWidth", defaults.screen_width),
            screen_height: self.screen_height.or("screenHeight", defaults.screen_height),
            pixel_ratio: self.pixel_ratio.or("pixelRatio", defaults.pixel_ratio),
            timezone: self.timezone.or("timezone", defaults.timezone),
            language: self.language.or("language", defaults.language),
        };
        (attributes, self.platform.into_option("platform"))
    }
}

/// Attributes and their digest, returned by [`Fingerprinter::get_fingerprint`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintResult {
    pub attributes: FingerprintRecord,
    pub hash: String,
    pub hash_path: DigestPath,
}

/// Stateless fingerprint service.
#[derive(Debug, Default)]
pub struct Fingerprinter {
    selector: DigestSelector,
}

impl Fingerprinter {
    pub fn new(selector: DigestSelector) -> Self {
        Self { selector }
    }

    pub fn from_options(options: &FingerprintOptions) -> Self {
        Self::new(options.selector())
    }

    /// Validate the platform and hash the record.
    pub async fn generate_hash(
        &self,
        attributes: AttributeRecord,
        platform: Option<&str>,
    ) -> FingerprintDigest {
        let record = FingerprintRecord {
            attributes,
            platform: AppPlatform::coerce(platform),
        };
        self.selector.hash_attributes(&record).await
    }

    pub async fn generate_hash_raw(&self, raw: RawFingerprintRecord) -> FingerprintDigest {
        let (attributes, platform) = raw.into_parts();
        self.generate_hash(attributes, platform.as_deref()).await
    }

    /// Collect attributes from `env`, attach `platform`, hash.
    pub async fn get_fingerprint<E: EnvironmentSource + ?Sized>(
        &self,
        env: &E,
        platform: Option<&str>,
    ) -> FingerprintResult {
        let record = FingerprintRecord {
            attributes: collect_attributes(&env.snapshot()),
            platform: AppPlatform::coerce(platform),
        };
        let digest = self.selector.hash_attributes(&record).await;
        FingerprintResult {
            attributes: record,
            hash: digest.value,
            hash_path: digest.path,
        }
    }

    pub async fn get_hash<E: EnvironmentSource + ?Sized>(
        &self,
        env: &E,
        platform: Option<&str>,
    ) -> String {
        self.get_fingerprint(env, platform).await.hash
    }
}
