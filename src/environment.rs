//! Host environment access
//!
//! The collector never talks to the browser directly; it consumes an
//! [`EnvironmentSnapshot`] produced by an [`EnvironmentSource`]. In the
//! browser that is [`BrowserEnvironment`], which reads `navigator`,
//! `screen`, `devicePixelRatio` and `Intl` off the global object so it
//! also works inside workers (where `window` does not exist).

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;

use crate::attributes::EnvironmentSnapshot;
use crate::error::{FingerprintError, Result};

/// Timezone reported when `Intl` cannot resolve one.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Language reported when `navigator.language` is missing.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Something that can describe the current host.
pub trait EnvironmentSource {
    fn snapshot(&self) -> EnvironmentSnapshot;
}

/// Fixed, caller-supplied environment values.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    snapshot: EnvironmentSnapshot,
}

impl StaticEnvironment {
    pub fn new(snapshot: EnvironmentSnapshot) -> Self {
        Self { snapshot }
    }
}

impl EnvironmentSource for StaticEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        self.snapshot.clone()
    }
}

/// Reads the live browser environment. Only meaningful on `wasm32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserEnvironment;

impl EnvironmentSource for BrowserEnvironment {
    fn snapshot(&self) -> EnvironmentSnapshot {
        let global: JsValue = js_sys::global().into();

        let navigator = get_property(&global, "navigator").ok();
        let screen = get_property(&global, "screen").ok();

        let user_agent = navigator
            .as_ref()
            .and_then(|nav| string_property(nav, "userAgent"))
            .unwrap_or_default();
        let language = navigator
            .as_ref()
            .and_then(|nav| string_property(nav, "language"))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let screen_width = screen
            .as_ref()
            .and_then(|s| dimension_property(s, "width"))
            .unwrap_or(0);
        let screen_height = screen
            .as_ref()
            .and_then(|s| dimension_property(s, "height"))
            .unwrap_or(0);

        let device_pixel_ratio = Reflect::get(&global, &JsValue::from_str("devicePixelRatio"))
            .ok()
            .and_then(|v| v.as_f64());

        let timezone = resolved_timezone().unwrap_or_else(|e| {
            log::debug!("Timezone lookup failed: {}", e);
            DEFAULT_TIMEZONE.to_string()
        });

        EnvironmentSnapshot {
            user_agent,
            screen_width,
            screen_height,
            device_pixel_ratio,
            timezone,
            language,
        }
    }
}

/// Get a defined property, treating `undefined`/`null` as an error.
fn get_property(obj: &JsValue, name: &str) -> Result<JsValue> {
    let value = Reflect::get(obj, &JsValue::from_str(name))
        .map_err(|e| FingerprintError::from_js(FingerprintError::Environment, &e))?;
    if value.is_undefined() || value.is_null() {
        return Err(FingerprintError::Environment(format!("{} is not defined", name)));
    }
    Ok(value)
}

fn string_property(obj: &JsValue, name: &str) -> Option<String> {
    get_property(obj, name)
        .ok()
        .and_then(|v| v.as_string())
        .filter(|s| !s.is_empty())
}

fn dimension_property(obj: &JsValue, name: &str) -> Option<u32> {
    get_property(obj, name)
        .ok()
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u32)
}

/// `Intl.DateTimeFormat().resolvedOptions().timeZone`
fn resolved_timezone() -> Result<String> {
    let format = js_sys::Intl::DateTimeFormat::new(&Array::new(), &Object::new());
    let options: JsValue = format.resolved_options().into();
    get_property(&options, "timeZone")?
        .as_string()
        .filter(|tz| !tz.is_empty())
        .ok_or_else(|| FingerprintError::Environment("timeZone is not a string".into()))
}
