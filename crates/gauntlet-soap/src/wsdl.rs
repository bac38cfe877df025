//! WSDL parsing and XML helpers
//!
//! A WSDL is reduced to what dispatch needs: the target namespace, the first
//! service with its first port, the port's address, and the operation-name to
//! SOAP-action map collected from the bindings behind that port. Namespace
//! prefixes vary between WSDL generators, so elements are matched by local
//! name.

use std::collections::{BTreeMap, BTreeSet};

use quick_xml::events::{BytesEnd, BytesText, Event};
use quick_xml::{Reader, Writer};
use roxmltree::{Document, Node};

use gauntlet_core::{GauntletError, Result};

/// The parts of a WSDL needed to dispatch operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlDocument {
    address: String,
    target_namespace: String,
    service_name: String,
    port_name: String,
    endpoint: String,
    actions: BTreeMap<String, String>,
}

impl WsdlDocument {
    /// Parses a WSDL fetched from `address`.
    pub fn parse(xml: &str, address: &str) -> Result<Self> {
        let document = Document::parse(xml).map_err(|err| GauntletError::Wsdl {
            reason: err.to_string(),
        })?;
        let root = document.root_element();
        let target_namespace = root
            .attribute("targetNamespace")
            .unwrap_or_default()
            .to_string();

        let service = child_element(&root, "service").ok_or_else(|| GauntletError::Wsdl {
            reason: format!("no service declared in {address}"),
        })?;
        let service_name = required_attribute(&service, "name", address)?;

        let port = child_element(&service, "port").ok_or_else(|| GauntletError::Wsdl {
            reason: format!("service '{service_name}' declares no port"),
        })?;
        let port_name = required_attribute(&port, "name", address)?;
        let binding_name = local_name(&required_attribute(&port, "binding", address)?).to_string();

        // Dispatch goes to the port's declared address; a WSDL without one is
        // served from the endpoint itself, so fall back to the WSDL address
        // minus its query.
        let endpoint = child_element(&port, "address")
            .and_then(|node| node.attribute("location"))
            .map(str::to_string)
            .unwrap_or_else(|| {
                address
                    .split_once('?')
                    .map(|(base, _)| base.to_string())
                    .unwrap_or_else(|| address.to_string())
            });

        let mut actions = BTreeMap::new();
        for binding in root
            .children()
            .filter(|node| node.is_element() && node.tag_name().name() == "binding")
            .filter(|node| node.attribute("name") == Some(binding_name.as_str()))
        {
            for operation in binding
                .children()
                .filter(|node| node.is_element() && node.tag_name().name() == "operation")
            {
                let soap_action = child_element(&operation, "operation")
                    .and_then(|node| node.attribute("soapAction"));
                if let (Some(name), Some(action)) = (operation.attribute("name"), soap_action) {
                    actions.insert(name.to_string(), action.to_string());
                }
            }
        }

        if actions.is_empty() {
            return Err(GauntletError::Wsdl {
                reason: format!("binding '{binding_name}' declares no SOAP operations"),
            });
        }

        Ok(Self {
            address: address.to_string(),
            target_namespace,
            service_name,
            port_name,
            endpoint,
            actions,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The SOAP action for an operation name, when the binding declares one.
    pub fn soap_action(&self, operation: &str) -> Option<&str> {
        self.actions.get(operation).map(String::as_str)
    }

    /// All operations of the first service, name to SOAP action.
    pub fn actions(&self) -> &BTreeMap<String, String> {
        &self.actions
    }
}

fn child_element<'a>(node: &Node<'a, 'a>, name: &str) -> Option<Node<'a, 'a>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == name)
}

fn required_attribute(node: &Node<'_, '_>, name: &str, address: &str) -> Result<String> {
    node.attribute(name)
        .map(str::to_string)
        .ok_or_else(|| GauntletError::Wsdl {
            reason: format!(
                "{} element without '{name}' attribute in {address}",
                node.tag_name().name()
            ),
        })
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

/// Replaces the text content of the first element matching each variable
/// name. Elements with child elements are left alone; placeholders are leaf
/// elements.
pub fn transform_request(xml: &str, variables: &BTreeMap<String, String>) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(std::io::Cursor::new(Vec::new()));
    let mut replaced: BTreeSet<String> = BTreeSet::new();
    let mut active: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(|err| GauntletError::Xml {
            reason: err.to_string(),
        })?;
        match event {
            Event::Eof => break,
            Event::Start(start) => {
                let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                active = if variables.contains_key(&local) && !replaced.contains(&local) {
                    Some(local)
                } else {
                    None
                };
                write_event(&mut writer, Event::Start(start))?;
            }
            Event::Text(text) => match active.take() {
                Some(key) => {
                    let value = variables.get(&key).map(String::as_str).unwrap_or_default();
                    write_event(&mut writer, Event::Text(BytesText::new(value)))?;
                    replaced.insert(key);
                }
                None => write_event(&mut writer, Event::Text(text))?,
            },
            Event::End(end) => {
                // An empty placeholder element gets its value injected here.
                if let Some(key) = active.take() {
                    let value = variables.get(&key).map(String::as_str).unwrap_or_default();
                    write_event(&mut writer, Event::Text(BytesText::new(value)))?;
                    replaced.insert(key);
                }
                write_event(&mut writer, Event::End(end))?;
            }
            Event::Empty(empty) => {
                let local = String::from_utf8_lossy(empty.local_name().as_ref()).into_owned();
                if variables.contains_key(&local) && !replaced.contains(&local) {
                    let name = String::from_utf8_lossy(empty.name().as_ref()).into_owned();
                    let value = variables.get(&local).map(String::as_str).unwrap_or_default();
                    write_event(&mut writer, Event::Start(empty.clone()))?;
                    write_event(&mut writer, Event::Text(BytesText::new(value)))?;
                    write_event(&mut writer, Event::End(BytesEnd::new(name)))?;
                    replaced.insert(local);
                } else {
                    write_event(&mut writer, Event::Empty(empty))?;
                }
                active = None;
            }
            other => write_event(&mut writer, other)?,
        }
    }

    String::from_utf8(writer.into_inner().into_inner()).map_err(|err| GauntletError::Xml {
        reason: err.to_string(),
    })
}

fn write_event(writer: &mut Writer<std::io::Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| GauntletError::Xml {
            reason: err.to_string(),
        })
}

/// The fault subtree of a SOAP response, verbatim, when the body carries one.
pub fn find_fault(xml: &str) -> Result<Option<String>> {
    let document = Document::parse(xml).map_err(|err| GauntletError::Xml {
        reason: err.to_string(),
    })?;
    Ok(document
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "Fault")
        .map(|node| xml[node.range()].to_string()))
}

/// Text content of the first element with the given local name, `None` when
/// the document has no such element.
pub fn read_element(xml: &str, name: &str) -> Result<Option<String>> {
    let document = Document::parse(xml).map_err(|err| GauntletError::Xml {
        reason: err.to_string(),
    })?;
    Ok(document
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == name)
        .and_then(|node| node.text())
        .map(str::to_string))
}
