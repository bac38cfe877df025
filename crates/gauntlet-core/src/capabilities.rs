//! Typed capability descriptors for browser and mobile scenarios
//!
//! Grid nodes advertise their capabilities as loosely-typed JSON. Instead of
//! threading that map through the code and null-checking every access, the
//! descriptor is decoded once into a typed schema and resolved into a
//! per-scenario profile: [`WebProfile`] for browser scenarios,
//! [`MobileProfile`] for device scenarios. Unknown browser or platform names
//! are rejected at resolution time with a descriptive error.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GauntletError, Result};

/// Browsers a web scenario can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Firefox,
    Safari,
    PhantomJs,
}

impl Browser {
    pub const ALL: [Browser; 4] = [
        Browser::Chrome,
        Browser::Firefox,
        Browser::Safari,
        Browser::PhantomJs,
    ];

    /// Name used on the wire in `browserName` capabilities.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Firefox => "firefox",
            Browser::Safari => "safari",
            Browser::PhantomJs => "phantomjs",
        }
    }
}

impl FromStr for Browser {
    type Err = GauntletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "chrome" => Ok(Browser::Chrome),
            "firefox" => Ok(Browser::Firefox),
            "safari" => Ok(Browser::Safari),
            "phantomjs" => Ok(Browser::PhantomJs),
            _ => Err(GauntletError::UnknownBrowser {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Mobile operating systems a device scenario can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MobilePlatform {
    Android,
    Ios,
}

impl MobilePlatform {
    pub fn wire_name(&self) -> &'static str {
        match self {
            MobilePlatform::Android => "android",
            MobilePlatform::Ios => "ios",
        }
    }
}

impl FromStr for MobilePlatform {
    type Err = GauntletError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "android" => Ok(MobilePlatform::Android),
            "ios" => Ok(MobilePlatform::Ios),
            _ => Err(GauntletError::UnknownPlatform {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MobilePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Where a browser session runs. Nodes that do not declare a platform are
/// treated as desktop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DevicePlatform {
    #[default]
    Desktop,
    Android,
    Ios,
}

impl DevicePlatform {
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::to_lowercase).as_deref() {
            Some("android") => DevicePlatform::Android,
            Some("ios") => DevicePlatform::Ios,
            _ => DevicePlatform::Desktop,
        }
    }

    /// Window maximize is never attempted on a mobile platform.
    pub fn is_mobile(&self) -> bool {
        matches!(self, DevicePlatform::Android | DevicePlatform::Ios)
    }
}

/// Grid-node housekeeping keys that must not reach a session request.
pub const SCRUBBED_KEYS: [&str; 3] = ["platform", "maxInstances", "seleniumProtocol"];

/// The capability descriptor advertised by a grid node, decoded from JSON.
///
/// Known fields are typed; whatever else the node advertises lands in
/// `extra` and is forwarded to session requests after scrubbing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    #[serde(rename = "browserName", skip_serializing_if = "Option::is_none")]
    pub browser_name: Option<String>,
    #[serde(rename = "platformName", skip_serializing_if = "Option::is_none")]
    pub platform_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(rename = "deviceName", skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(rename = "automationName", skip_serializing_if = "Option::is_none")]
    pub automation_name: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CapabilityDescriptor {
    /// Decodes a descriptor from the JSON a node advertises. An empty string
    /// means no node is connected and fails immediately; malformed JSON is
    /// reported with the parser's reason.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(GauntletError::MissingCapabilities);
        }
        serde_json::from_str(raw).map_err(|err| GauntletError::InvalidCapabilities {
            reason: err.to_string(),
        })
    }

    /// Resolves the descriptor for a browser scenario.
    pub fn web_profile(&self) -> Result<WebProfile> {
        let name = self
            .browser_name
            .as_deref()
            .ok_or_else(|| GauntletError::InvalidCapabilities {
                reason: "browserName is required for web scenarios".to_string(),
            })?;
        Ok(WebProfile {
            browser: name.parse()?,
            platform: DevicePlatform::from_name(self.platform.as_deref()),
        })
    }

    /// Resolves the descriptor for a mobile scenario. The application binary
    /// comes from the node capabilities, with `app_override` (the APP
    /// environment override) winning when present; resolving neither is a
    /// hard failure before any session is attempted.
    pub fn mobile_profile(&self, app_override: Option<&str>) -> Result<MobileProfile> {
        let name = self
            .platform_name
            .as_deref()
            .ok_or_else(|| GauntletError::InvalidCapabilities {
                reason: "platformName is required for mobile scenarios".to_string(),
            })?;
        let platform: MobilePlatform = name.parse()?;

        let app = app_override
            .map(str::to_string)
            .or_else(|| self.app.clone())
            .ok_or(GauntletError::MissingAppPath)?;

        Ok(MobileProfile {
            platform,
            app,
            device_name: self.device_name.clone(),
            automation_name: self.automation_name.clone(),
        })
    }

    /// Extra node capabilities minus the housekeeping keys.
    pub fn scrubbed_extra(&self) -> BTreeMap<String, serde_json::Value> {
        self.extra
            .iter()
            .filter(|(key, _)| !SCRUBBED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// A validated browser scenario profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebProfile {
    pub browser: Browser,
    pub platform: DevicePlatform,
}

/// A validated mobile scenario profile with a resolved application binary.
#[derive(Debug, Clone, PartialEq)]
pub struct MobileProfile {
    pub platform: MobilePlatform,
    pub app: String,
    pub device_name: Option<String>,
    pub automation_name: Option<String>,
}
