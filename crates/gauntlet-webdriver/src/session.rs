//! Driver session lifecycle
//!
//! Sessions speak the WebDriver wire protocol directly over HTTP: create,
//! configure, quit. Browser sessions get the fixed timeout set, a cookie
//! wipe and window sizing after creation; mobile sessions are handed over to
//! the scenario as created. Quitting is tolerant — a session that is already
//! gone logs and returns cleanly, and teardown with no open session is a
//! no-op one layer up.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use gauntlet_core::{
    CapabilityDescriptor, DevicePlatform, GauntletError, GridTarget, Result,
};

use crate::protocol;

/// One live driver session on a grid or local driver.
#[derive(Debug)]
pub struct WebDriverSession {
    http: reqwest::Client,
    hub: String,
    session_id: String,
    quit: bool,
}

impl WebDriverSession {
    /// Creates and configures a browser session for a web scenario.
    pub async fn open_browser(
        grid: &GridTarget,
        capabilities: &CapabilityDescriptor,
    ) -> Result<Self> {
        let profile = capabilities.web_profile()?;
        info!(
            "setting up a {} session on {}",
            profile.browser,
            grid.hub_url()
        );

        let payload = protocol::browser_session_payload(&profile, &capabilities.scrubbed_extra());
        let session = Self::create(grid, &payload).await?;

        // Nodes that advertise a device name size their own window.
        let size_window = capabilities.device_name.is_none();
        session.configure(size_window, profile.platform).await?;
        Ok(session)
    }

    /// Creates a mobile session for a device scenario. The app binary must
    /// resolve from the capabilities or the override before any request is
    /// made.
    pub async fn open_mobile(
        grid: &GridTarget,
        capabilities: &CapabilityDescriptor,
        app_override: Option<&str>,
    ) -> Result<Self> {
        let profile = capabilities.mobile_profile(app_override)?;
        info!(
            "setting up a {} session on {} with app {}",
            profile.platform,
            grid.hub_url(),
            profile.app
        );

        let payload = protocol::mobile_session_payload(&profile, &capabilities.scrubbed_extra());
        Self::create(grid, &payload).await
    }

    async fn create(grid: &GridTarget, payload: &Value) -> Result<Self> {
        let http = reqwest::Client::new();
        let hub = grid.hub_url();

        let response = http
            .post(format!("{hub}/session"))
            .json(payload)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GauntletError::WebDriver {
                reason: format!("session creation failed with {status}: {body}"),
            });
        }

        let envelope: Value = response.json().await?;
        let session_id = protocol::session_id_from(&envelope)?;
        debug!("created session {}", session_id);

        Ok(Self {
            http,
            hub,
            session_id,
            quit: false,
        })
    }

    async fn configure(&self, size_window: bool, platform: DevicePlatform) -> Result<()> {
        self.post("timeouts", protocol::timeouts_payload()).await?;
        self.delete("cookie").await?;
        if size_window {
            self.post("window/rect", protocol::window_rect_payload())
                .await?;
        }
        if protocol::should_maximize(platform) {
            self.post("window/maximize", json!({})).await?;
        }
        Ok(())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// Ends the session. Errors are logged rather than raised: teardown runs
    /// after every scenario and an already-dead session must not fail a
    /// scenario that otherwise passed. Quitting twice is a no-op.
    pub async fn quit(&mut self) {
        if self.quit {
            return;
        }
        self.quit = true;
        debug!("shutting down session {}", self.session_id);

        let url = format!("{}/session/{}", self.hub, self.session_id);
        match self.http.delete(&url).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => warn!(
                "session {} quit returned {}",
                self.session_id,
                response.status()
            ),
            Err(err) => warn!("session {} quit failed: {}", self.session_id, err),
        }
    }

    async fn post(&self, command: &str, payload: Value) -> Result<()> {
        let url = format!("{}/session/{}/{}", self.hub, self.session_id, command);
        let response = self.http.post(&url).json(&payload).send().await?;
        self.expect_success(command, response).await
    }

    async fn delete(&self, command: &str) -> Result<()> {
        let url = format!("{}/session/{}/{}", self.hub, self.session_id, command);
        let response = self.http.delete(&url).send().await?;
        self.expect_success(command, response).await
    }

    async fn expect_success(&self, command: &str, response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(GauntletError::WebDriver {
            reason: format!("'{command}' failed with {status}: {body}"),
        })
    }
}
