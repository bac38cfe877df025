//! Environment inputs for scenario setup
//!
//! Three values arrive from outside the process: the grid address, the
//! capability descriptor of the node the scenario will run on, and an
//! optional application-binary override for mobile scenarios. Resolution is
//! split into pure functions over `Option<&str>` so tests never mutate the
//! process environment; the `*_from_env` wrappers read the real variables.

use std::env;

use crate::capabilities::CapabilityDescriptor;
use crate::error::{GauntletError, Result};

/// Address of the Selenium/Appium grid, or `local` for a driver on this host.
pub const GRID_VAR: &str = "SELENIUM_GRID";

/// JSON capability descriptor of the node the scenario runs on.
pub const CAPABILITIES_VAR: &str = "BROWSER_CAPABILITIES";

/// Overrides the `app` capability for mobile scenarios.
pub const APP_OVERRIDE_VAR: &str = "APP";

/// Where driver sessions are created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridTarget {
    /// A driver listening on this host (standalone server on its default
    /// port). Driver binaries themselves are provisioned outside Gauntlet.
    Local,
    /// A remote grid reachable at `host:port`.
    Remote(String),
}

impl GridTarget {
    /// Resolves the grid address. A missing or empty address is a hard,
    /// unretried failure: without a grid there is nothing to run against.
    pub fn resolve(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Err(GauntletError::MissingGrid {
                var: GRID_VAR.to_string(),
            }),
            Some("local") => Ok(GridTarget::Local),
            Some(address) => Ok(GridTarget::Remote(address.to_string())),
        }
    }

    /// Base URL driver commands are issued against.
    pub fn hub_url(&self) -> String {
        match self {
            GridTarget::Local => "http://127.0.0.1:4444".to_string(),
            GridTarget::Remote(address) => format!("http://{address}/wd/hub"),
        }
    }
}

pub fn grid_from_env() -> Result<GridTarget> {
    let raw = env::var(GRID_VAR).ok();
    GridTarget::resolve(raw.as_deref())
}

pub fn capabilities_from_env() -> Result<CapabilityDescriptor> {
    let raw = env::var(CAPABILITIES_VAR).ok();
    match raw.as_deref() {
        None => Err(GauntletError::MissingCapabilities),
        Some(json) => CapabilityDescriptor::from_json(json),
    }
}

pub fn app_override_from_env() -> Option<String> {
    env::var(APP_OVERRIDE_VAR).ok().filter(|v| !v.is_empty())
}
