//! Error types shared across the Gauntlet crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GauntletError>;

#[derive(Error, Debug)]
pub enum GauntletError {
    #[error("Selenium grid not available: set {var} to 'local' or 'host:port'")]
    MissingGrid { var: String },

    #[error("no capability descriptor available for this node")]
    MissingCapabilities,

    #[error("invalid capability descriptor: {reason}")]
    InvalidCapabilities { reason: String },

    #[error("unknown browser: {name}")]
    UnknownBrowser { name: String },

    #[error("unknown platform: {name}")]
    UnknownPlatform { name: String },

    #[error("no app specified (the absolute local path or remote http URL of an .apk or .ipa file); declare it in the node capabilities or set APP=/path/to/file")]
    MissingAppPath,

    #[error("no base URI configured; declare the host to send requests to first")]
    MissingBaseUri,

    #[error("unsupported HTTP verb: {name}")]
    UnsupportedVerb { name: String },

    #[error("unsupported body format '{name}'; use 'json' or 'string'")]
    UnsupportedBodyFormat { name: String },

    #[error("unsupported modification '{name}'; use ADD, UPDATE or DELETE")]
    UnsupportedModification { name: String },

    #[error("unsupported condition '{name}'")]
    UnsupportedCondition { name: String },

    #[error("invalid path expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("invalid schema: {reason}")]
    InvalidSchema { reason: String },

    #[error("response body does not match the schema: {violations}")]
    SchemaMismatch { violations: String },

    #[error("no response available; send a request before asserting on it")]
    MissingResponse,

    #[error("{subject}: expected {condition} '{expected}', got {actual}")]
    AssertionFailed {
        subject: String,
        condition: String,
        expected: String,
        actual: String,
    },

    #[error("empty result for expression '{expression}'")]
    EmptyExtraction { expression: String },

    #[error("path '{path}' not found")]
    PathNotFound { path: String },

    #[error("condition not met after {attempts} attempts over {elapsed_secs}s: {last_failure}")]
    PollTimeout {
        attempts: u32,
        elapsed_secs: u64,
        last_failure: String,
    },

    #[error("wsdl error: {reason}")]
    Wsdl { reason: String },

    #[error("xml error: {reason}")]
    Xml { reason: String },

    #[error("webdriver error: {reason}")]
    WebDriver { reason: String },

    #[error("teardown of {label} failed: {reason}")]
    Teardown { label: String, reason: String },

    #[error("HTTP transport error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}
