//! # Gauntlet SOAP
//!
//! Minimal SOAP support for scenarios that exercise legacy web services: a
//! WSDL is parsed once per address and cached, operation names resolve to
//! their SOAP actions, and raw XML envelopes are dispatched in message mode
//! with the action set explicitly on the transport. Faults come back as data,
//! so a scenario can assert on the fault content like on any other response.

pub mod client;
pub mod wsdl;

pub use client::SoapClient;
pub use wsdl::{find_fault, read_element, transform_request, WsdlDocument};
