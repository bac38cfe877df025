//! Wire payloads for the WebDriver protocol
//!
//! Pure builders for everything a session sends: new-session capabilities
//! with the per-browser option blocks, the fixed timeout set, and window
//! sizing. Keeping these free of I/O pins the wire behaviour down in unit
//! tests without a grid.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Map, Value};

use gauntlet_core::{Browser, DevicePlatform, GauntletError, MobileProfile, Result, WebProfile};

pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(120);
pub const IMPLICIT_WAIT: Duration = Duration::from_secs(10);
pub const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

pub const WINDOW_WIDTH: u32 = 1440;
pub const WINDOW_HEIGHT: u32 = 900;

/// New-session payload for a browser scenario. Node extras are merged in
/// after the typed fields so housekeeping keys can never shadow them.
pub fn browser_session_payload(
    profile: &WebProfile,
    extra: &BTreeMap<String, Value>,
) -> Value {
    let mut caps = Map::new();
    caps.insert(
        "browserName".to_string(),
        json!(profile.browser.wire_name()),
    );

    match profile.browser {
        Browser::Chrome => {
            // Test runs routinely face sandboxed CI hosts and self-signed
            // certificates.
            caps.insert(
                "goog:chromeOptions".to_string(),
                json!({"args": ["--no-sandbox", "--ignore-certificate-errors"]}),
            );
        }
        Browser::Firefox => {
            caps.insert("moz:firefoxOptions".to_string(), json!({"args": []}));
        }
        Browser::Safari | Browser::PhantomJs => {}
    }

    match profile.platform {
        DevicePlatform::Android => {
            caps.insert("platformName".to_string(), json!("android"));
        }
        DevicePlatform::Ios => {
            caps.insert("platformName".to_string(), json!("ios"));
        }
        DevicePlatform::Desktop => {}
    }

    merge_extra(&mut caps, extra);
    wrap_capabilities(caps)
}

/// New-session payload for a mobile scenario. The resolved app always wins
/// over whatever the node advertised.
pub fn mobile_session_payload(
    profile: &MobileProfile,
    extra: &BTreeMap<String, Value>,
) -> Value {
    let mut caps = Map::new();
    caps.insert(
        "platformName".to_string(),
        json!(profile.platform.wire_name()),
    );
    caps.insert("appium:app".to_string(), json!(profile.app));
    if let Some(device_name) = &profile.device_name {
        caps.insert("appium:deviceName".to_string(), json!(device_name));
    }
    if let Some(automation_name) = &profile.automation_name {
        caps.insert("appium:automationName".to_string(), json!(automation_name));
    }

    merge_extra(&mut caps, extra);
    wrap_capabilities(caps)
}

fn merge_extra(caps: &mut Map<String, Value>, extra: &BTreeMap<String, Value>) {
    for (key, value) in extra {
        caps.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn wrap_capabilities(caps: Map<String, Value>) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": Value::Object(caps),
            "firstMatch": [{}]
        }
    })
}

/// The fixed timeout set applied to every browser session, in milliseconds.
pub fn timeouts_payload() -> Value {
    json!({
        "pageLoad": PAGE_LOAD_TIMEOUT.as_millis() as u64,
        "implicit": IMPLICIT_WAIT.as_millis() as u64,
        "script": SCRIPT_TIMEOUT.as_millis() as u64,
    })
}

pub fn window_rect_payload() -> Value {
    json!({"width": WINDOW_WIDTH, "height": WINDOW_HEIGHT})
}

/// Maximizing a mobile browser can crash it; desktop sessions maximize.
pub fn should_maximize(platform: DevicePlatform) -> bool {
    !platform.is_mobile()
}

/// Pulls the session id out of a W3C new-session response envelope.
pub fn session_id_from(response: &Value) -> Result<String> {
    response["value"]["sessionId"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| GauntletError::WebDriver {
            reason: format!("no session id in response: {response}"),
        })
}
