//! Attribute collection
//!
//! Turns raw host signals (user agent, screen geometry, locale) into an
//! [`AttributeRecord`]. Platform and OS detection is heuristic user-agent
//! matching; spoofed or unusual agents will be misclassified and that is
//! accepted.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Sentinel reported when no OS version pattern matches.
pub const UNKNOWN_OS_VERSION: &str = "unknown";

/// Pixel ratio reported when the host gives none (or a useless one).
pub const DEFAULT_PIXEL_RATIO: f64 = 1.0;

/// Operating system family of the end-user device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    Android,
    Ios,
    Macos,
    Windows,
    Linux,
    #[default]
    #[serde(other)]
    Web,
}

impl DevicePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevicePlatform::Android => "android",
            DevicePlatform::Ios => "ios",
            DevicePlatform::Macos => "macos",
            DevicePlatform::Windows => "windows",
            DevicePlatform::Linux => "linux",
            DevicePlatform::Web => "web",
        }
    }
}

impl fmt::Display for DevicePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered platform patterns, matched against the lower-cased user agent.
/// First match wins: an Android agent also says "linux".
const PLATFORM_PATTERNS: &[(&[&str], DevicePlatform)] = &[
    (&["android"], DevicePlatform::Android),
    (&["iphone", "ipad", "ipod"], DevicePlatform::Ios),
    (&["macintosh", "mac os"], DevicePlatform::Macos),
    (&["windows"], DevicePlatform::Windows),
    (&["linux"], DevicePlatform::Linux),
];

/// Ordered OS version patterns, matched against the raw user agent.
/// The generic `OS` pattern precedes `Mac OS X` so iOS agents
/// ("CPU iPhone OS 17_0 like Mac OS X") report the iOS version.
const OS_VERSION_PATTERNS: &[&str] = &[
    r"Android\s([0-9.]+)",
    r"OS\s([0-9_]+)",
    r"Windows NT\s([0-9.]+)",
    r"Mac OS X\s([0-9_]+)",
];

fn os_version_regexes() -> &'static [Regex] {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        OS_VERSION_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Classify the device platform from a user agent string.
pub fn classify_platform(user_agent: &str) -> DevicePlatform {
    let ua = user_agent.to_lowercase();
    PLATFORM_PATTERNS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| ua.contains(needle)))
        .map(|(_, platform)| *platform)
        .unwrap_or(DevicePlatform::Web)
}

/// Extract a dotted OS version from a user agent string.
///
/// Only the first matching pattern is consulted. Underscore-separated
/// versions (`10_15_7`) are normalized to dots.
pub fn extract_os_version(user_agent: &str) -> String {
    os_version_regexes()
        .iter()
        .find_map(|re| re.captures(user_agent))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace('_', "."))
        .unwrap_or_else(|| UNKNOWN_OS_VERSION.to_string())
}

/// Normalize a host-reported pixel ratio. Missing, zero, negative and
/// non-finite ratios all become [`DEFAULT_PIXEL_RATIO`].
pub fn normalize_pixel_ratio(ratio: Option<f64>) -> f64 {
    match ratio {
        Some(r) if r.is_finite() && r > 0.0 => r,
        _ => DEFAULT_PIXEL_RATIO,
    }
}

/// Raw values as handed over by the host environment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvironmentSnapshot {
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub device_pixel_ratio: Option<f64>,
    pub timezone: String,
    pub language: String,
}

/// Environment attributes that feed the fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeRecord {
    pub device_platform: DevicePlatform,
    pub os_version: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub pixel_ratio: f64,
    pub timezone: String,
    pub language: String,
}

impl Default for AttributeRecord {
    fn default() -> Self {
        Self {
            device_platform: DevicePlatform::Web,
            os_version: UNKNOWN_OS_VERSION.to_string(),
            screen_width: 0,
            screen_height: 0,
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            timezone: String::new(),
            language: String::new(),
        }
    }
}

/// Build an [`AttributeRecord`] from a host snapshot. Infallible: every
/// field has a default.
pub fn collect_attributes(snapshot: &EnvironmentSnapshot) -> AttributeRecord {
    AttributeRecord {
        device_platform: classify_platform(&snapshot.user_agent),
        os_version: extract_os_version(&snapshot.user_agent),
        screen_width: snapshot.screen_width,
        screen_height: snapshot.screen_height,
        pixel_ratio: normalize_pixel_ratio(snapshot.device_pixel_ratio),
        timezone: snapshot.timezone.clone(),
        language: snapshot.language.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1_2 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0";

    #[test]
    fn test_classify_real_agents() {
        assert_eq!(classify_platform(CHROME_MAC), DevicePlatform::Macos);
        assert_eq!(classify_platform(CHROME_WINDOWS), DevicePlatform::Windows);
        assert_eq!(classify_platform(SAFARI_IPHONE), DevicePlatform::Ios);
        assert_eq!(classify_platform(CHROME_ANDROID), DevicePlatform::Android);
        assert_eq!(classify_platform(FIREFOX_LINUX), DevicePlatform::Linux);
    }

    #[test]
    fn test_classify_precedence() {
        // Both android and iphone present: android is checked first
        assert_eq!(
            classify_platform("Mozilla/5.0 (iPhone; Android 12)"),
            DevicePlatform::Android
        );
        // iPad agents mention "Mac OS X" too
        assert_eq!(
            classify_platform("Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X)"),
            DevicePlatform::Ios
        );
    }

    #[test]
    fn test_classify_case_insensitive_and_default() {
        assert_eq!(classify_platform("WINDOWS PHONE"), DevicePlatform::Windows);
        assert_eq!(classify_platform(""), DevicePlatform::Web);
        assert_eq!(classify_platform("curl/8.4.0"), DevicePlatform::Web);
    }

    #[test]
    fn test_extract_os_version() {
        assert_eq!(extract_os_version(CHROME_MAC), "10.15.7");
        assert_eq!(extract_os_version(CHROME_WINDOWS), "10.0");
        assert_eq!(extract_os_version(SAFARI_IPHONE), "17.1.2");
        assert_eq!(extract_os_version(CHROME_ANDROID), "13");
        assert_eq!(extract_os_version(FIREFOX_LINUX), UNKNOWN_OS_VERSION);
        assert_eq!(extract_os_version(""), UNKNOWN_OS_VERSION);
    }

    #[test]
    fn test_extract_os_version_first_pattern_wins() {
        // Android pattern beats the Windows NT one even though both match
        assert_eq!(extract_os_version("Android 9.1 Windows NT 6.1"), "9.1");
    }

    #[test]
    fn test_pixel_ratio_defaults() {
        assert_eq!(normalize_pixel_ratio(None), 1.0);
        assert_eq!(normalize_pixel_ratio(Some(0.0)), 1.0);
        assert_eq!(normalize_pixel_ratio(Some(f64::NAN)), 1.0);
        assert_eq!(normalize_pixel_ratio(Some(-2.0)), 1.0);
        assert_eq!(normalize_pixel_ratio(Some(2.625)), 2.625);
    }

    #[test]
    fn test_collect_attributes() {
        let snapshot = EnvironmentSnapshot {
            user_agent: CHROME_MAC.into(),
            screen_width: 1440,
            screen_height: 900,
            device_pixel_ratio: Some(2.0),
            timezone: "America/New_York".into(),
            language: "en-US".into(),
        };
        let record = collect_attributes(&snapshot);
        assert_eq!(record.device_platform, DevicePlatform::Macos);
        assert_eq!(record.os_version, "10.15.7");
        assert_eq!((record.screen_width, record.screen_height), (1440, 900));
        assert_eq!(record.pixel_ratio, 2.0);
        assert_eq!(record.timezone, "America/New_York");
        assert_eq!(record.language, "en-US");
    }

    #[test]
    fn test_collect_empty_snapshot() {
        let record = collect_attributes(&EnvironmentSnapshot::default());
        assert_eq!(record, AttributeRecord::default());
    }

    #[test]
    fn test_record_serde_shape() {
        let json = serde_json::json!({
            "devicePlatform": "beos",
            "screenWidth": 800,
        });
        let record: AttributeRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.device_platform, DevicePlatform::Web);
        assert_eq!(record.screen_width, 800);
        assert_eq!(record.os_version, UNKNOWN_OS_VERSION);

        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["devicePlatform"], "web");
        assert_eq!(out["pixelRatio"], 1.0);
    }
}
