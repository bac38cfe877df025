//! # Gauntlet REST
//!
//! The REST half of the Gauntlet step library: request state accumulated
//! across steps ([`RestClient`]), table-driven response conditions, JSONPath
//! extraction into the scenario variable store, request-body sourcing with
//! structured modifications, and the poll-until-the-body-matches loop.
//!
//! All state lives on the client owned by the scenario; asserting before a
//! request was sent, or sending before a base URI was configured, fails with
//! a descriptive error rather than a panic.

pub mod assertions;
pub mod client;
pub mod conditions;
pub mod extract;
pub mod payload;
pub mod polling;

pub use client::{BaseUri, HttpVerb, RestClient, RestResponse};
pub use conditions::Condition;
pub use extract::PathQuery;
pub use payload::{BodyFormat, Modification};
pub use polling::{matches_or_contains, poll, BodyExpectation};
