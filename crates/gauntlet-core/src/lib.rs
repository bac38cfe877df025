//! # Gauntlet Core
//!
//! Shared foundations for the Gauntlet behaviour-driven test step library:
//! the per-scenario execution context and variable store, typed capability
//! descriptors for browser and mobile scenarios, environment resolution for
//! grid and node configuration, and the deadline-driven retry policy used by
//! polling steps.
//!
//! Every scenario owns exactly one [`ScenarioContext`], allocated when the
//! scenario starts and released when it ends. Steps never share state through
//! globals; whatever a step saves for a later step goes through the context's
//! [`VariableStore`].

pub mod capabilities;
pub mod config;
pub mod context;
pub mod error;
pub mod retry;

pub use capabilities::{
    Browser, CapabilityDescriptor, DevicePlatform, MobilePlatform, MobileProfile, WebProfile,
};
pub use config::GridTarget;
pub use context::{Disposable, ScenarioContext, ScenarioId, VariableStore};
pub use error::{GauntletError, Result};
pub use retry::{PollStatus, Poller, RetryPolicy, RetryReport, Tick};

/// Current Gauntlet version for compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Gauntlet build information for harness banners and debugging
pub const BUILD_INFO: &str = concat!(
    "Gauntlet ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);
