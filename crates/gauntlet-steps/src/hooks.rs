//! Tag-driven scenario lifecycle
//!
//! Before a scenario body runs, its tags decide which clients exist:
//! `@rest` builds the REST client, `@web` starts a browser session and
//! `@mobile` a device session, both resolved from the environment. Missing
//! grid or capabilities fail the scenario immediately; nothing is retried.
//! After every scenario, whatever was opened is released, tolerating
//! "nothing was opened" as a no-op.

use cucumber::gherkin::Scenario;
use cucumber::World as _;
use futures::FutureExt as _;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gauntlet_core::config;
use gauntlet_rest::RestClient;
use gauntlet_webdriver::WebDriverSession;

use crate::world::{GauntletWorld, SoapState};

pub const REST_TAG: &str = "rest";
pub const WEB_TAG: &str = "web";
pub const MOBILE_TAG: &str = "mobile";

pub fn has_tag(scenario: &Scenario, tag: &str) -> bool {
    scenario.tags.iter().any(|candidate| candidate == tag)
}

/// Builds the clients the scenario's tags ask for. Configuration failures
/// panic, which fails the scenario before its first step runs.
pub async fn scenario_setup(scenario: &Scenario, world: &mut GauntletWorld) {
    if has_tag(scenario, REST_TAG) {
        debug!("starting a REST client for '{}'", scenario.name);
        let client = RestClient::new().unwrap_or_else(|err| panic!("{err}"));
        world.rest = Some(client);
    }

    if has_tag(scenario, WEB_TAG) {
        let grid = config::grid_from_env().unwrap_or_else(|err| panic!("{err}"));
        let capabilities = config::capabilities_from_env().unwrap_or_else(|err| panic!("{err}"));
        let session = WebDriverSession::open_browser(&grid, &capabilities)
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        world.driver = Some(session);
    }

    if has_tag(scenario, MOBILE_TAG) {
        let grid = config::grid_from_env().unwrap_or_else(|err| panic!("{err}"));
        let capabilities = config::capabilities_from_env().unwrap_or_else(|err| panic!("{err}"));
        let app_override = config::app_override_from_env();
        let session =
            WebDriverSession::open_mobile(&grid, &capabilities, app_override.as_deref())
                .await
                .unwrap_or_else(|err| panic!("{err}"));
        world.driver = Some(session);
    }
}

/// Releases whatever the scenario opened: the driver is quit, the clients
/// dropped, and every externally-registered resource (SSH and SQL handles
/// from other step libraries) disposed best-effort.
pub async fn scenario_teardown(world: &mut GauntletWorld) {
    if let Some(mut driver) = world.driver.take() {
        driver.quit().await;
    }
    world.rest = None;
    world.soap = SoapState::default();
    world.last_poll = None;
    world.ctx.release_all().await;
}

/// Initializes tracing for a harness binary. `RUST_LOG` selects the level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}

/// Runs the feature files with the lifecycle hooks wired in.
pub async fn run(features: &str) {
    GauntletWorld::cucumber()
        .before(|_feature, _rule, scenario, world| scenario_setup(scenario, world).boxed_local())
        .after(|_feature, _rule, _scenario, _event, world| {
            async move {
                if let Some(world) = world {
                    scenario_teardown(world).await;
                }
            }
            .boxed_local()
        })
        .run_and_exit(features)
        .await;
}
