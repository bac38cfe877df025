//! # Gauntlet WebDriver
//!
//! Driver lifecycle for browser and mobile scenarios: a session is created on
//! a grid (or a locally running driver) before the scenario body runs and
//! quit afterwards. Only the lifecycle lives here — element lookups, clicks
//! and the rest of the automation vocabulary belong to the driver on the
//! other side of the wire protocol.

pub mod protocol;
pub mod session;

pub use session::WebDriverSession;
