//! SOAP dispatch
//!
//! Message-mode dispatch: the caller supplies the whole envelope as a string
//! and the client posts it to the port address with the SOAP action resolved
//! from the WSDL. The action is set explicitly on the transport header —
//! some .NET-based services ignore the envelope-derived action and reject
//! requests without it.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use gauntlet_core::{GauntletError, Result};

use crate::wsdl::{find_fault, transform_request, WsdlDocument};

/// SOAP client with a per-address WSDL cache.
#[derive(Debug, Default)]
pub struct SoapClient {
    http: reqwest::Client,
    cache: DashMap<String, Arc<WsdlDocument>>,
}

impl SoapClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: DashMap::new(),
        }
    }

    /// Fetches and parses the WSDL at `address`, once: later calls for the
    /// same address return the cached document.
    pub async fn load_wsdl(&self, address: &str) -> Result<Arc<WsdlDocument>> {
        if let Some(cached) = self.cache.get(address) {
            debug!("using cached WSDL for {}", address);
            return Ok(cached.clone());
        }

        info!("fetching WSDL from {}", address);
        let xml = self
            .http
            .get(address)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let parsed = Arc::new(WsdlDocument::parse(&xml, address)?);
        self.cache.insert(address.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// The cached WSDL for an address, if one was loaded.
    pub fn cached(&self, address: &str) -> Option<Arc<WsdlDocument>> {
        self.cache.get(address).map(|entry| entry.clone())
    }

    /// Executes `operation` with the given envelope. A fault response is
    /// returned as its fault XML; anything else comes back verbatim. The
    /// pass/fail decision belongs to a later assertion step either way.
    pub async fn invoke(
        &self,
        wsdl: &WsdlDocument,
        operation: &str,
        request: &str,
    ) -> Result<String> {
        let action = wsdl
            .soap_action(operation)
            .ok_or_else(|| GauntletError::Wsdl {
                reason: format!(
                    "operation '{}' is not declared by {}",
                    operation,
                    wsdl.address()
                ),
            })?;

        debug!("invoking '{}' with action {}", operation, action);
        let response = self
            .http
            .post(wsdl.endpoint())
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{action}\""))
            .body(request.to_string())
            .send()
            .await?;
        // Faults arrive as HTTP 500; the body is still the answer.
        let body = response.text().await?;

        match find_fault(&body)? {
            Some(fault) => {
                warn!("'{}' returned a fault", operation);
                Ok(fault)
            }
            None => Ok(body),
        }
    }

    /// Substitutes placeholder elements in the envelope, then invokes.
    pub async fn invoke_with_params(
        &self,
        wsdl: &WsdlDocument,
        operation: &str,
        request: &str,
        variables: &BTreeMap<String, String>,
    ) -> Result<String> {
        let transformed = transform_request(request, variables)?;
        self.invoke(wsdl, operation, &transformed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_operations_are_rejected_before_dispatch() {
        let wsdl = WsdlDocument::parse(
            r#"<definitions targetNamespace="urn:t">
                 <binding name="B">
                   <operation name="Known"><operation soapAction="urn:t/Known"/></operation>
                 </binding>
                 <service name="S"><port name="P" binding="tns:B"/></service>
               </definitions>"#,
            "http://svc/?wsdl",
        )
        .unwrap();

        let client = SoapClient::new();
        let err = tokio_test::block_on(client.invoke(&wsdl, "Unknown", "<x/>")).unwrap_err();
        assert!(err.to_string().contains("operation 'Unknown'"));
    }
}
