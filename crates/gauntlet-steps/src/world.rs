//! The cucumber world owned by each scenario

use std::sync::Arc;

use cucumber::World;

use gauntlet_core::retry::RetryReport;
use gauntlet_core::ScenarioContext;
use gauntlet_rest::{RestClient, RestResponse};
use gauntlet_soap::{SoapClient, WsdlDocument};
use gauntlet_webdriver::WebDriverSession;

/// SOAP state accumulated by SOAP steps: the client with its WSDL cache, the
/// WSDL the scenario connected to, and the last response XML.
#[derive(Debug, Default)]
pub struct SoapState {
    pub client: Option<SoapClient>,
    pub wsdl: Option<Arc<WsdlDocument>>,
    pub last_response: Option<String>,
}

/// Everything one scenario owns while it runs. Constructed fresh for every
/// scenario; the lifecycle hooks populate and release the clients, so at
/// most one driver and one REST client exist per scenario.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct GauntletWorld {
    pub ctx: ScenarioContext,
    pub rest: Option<RestClient>,
    pub driver: Option<WebDriverSession>,
    pub soap: SoapState,
    pub last_poll: Option<RetryReport>,
}

impl GauntletWorld {
    pub fn new() -> Self {
        Self {
            ctx: ScenarioContext::new(),
            rest: None,
            driver: None,
            soap: SoapState::default(),
            last_poll: None,
        }
    }

    /// The scenario's REST client. Fails the scenario with the reason when
    /// the feature forgot its `@rest` tag.
    pub fn rest(&mut self) -> &mut RestClient {
        self.rest
            .as_mut()
            .expect("no REST client initialized; did you forget the @rest tag on your feature?")
    }

    /// The last REST response, failing the scenario when nothing was sent.
    pub fn response(&self) -> &RestResponse {
        self.rest
            .as_ref()
            .expect("no REST client initialized; did you forget the @rest tag on your feature?")
            .last_response()
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// The connected SOAP client and WSDL, failing the scenario when no
    /// connect step ran.
    pub fn soap_connection(&self) -> (&SoapClient, &Arc<WsdlDocument>) {
        let client = self
            .soap
            .client
            .as_ref()
            .expect("no SOAP connection; connect to a webservice first");
        let wsdl = self
            .soap
            .wsdl
            .as_ref()
            .expect("no WSDL parsed; connect to a webservice first");
        (client, wsdl)
    }

    pub fn soap_response(&self) -> &str {
        self.soap
            .last_response
            .as_deref()
            .expect("no webservice response; execute an operation first")
    }
}

impl Default for GauntletWorld {
    fn default() -> Self {
        Self::new()
    }
}
