//! # Gauntlet Steps
//!
//! The Gherkin surface of Gauntlet: a cucumber [`GauntletWorld`] owning the
//! scenario's context and clients, tag-driven lifecycle hooks that set those
//! clients up before the scenario body and tear them down afterwards, and
//! the step definitions feature files are written against.
//!
//! A harness binary wires everything together with [`hooks::run`]:
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() {
//!     gauntlet_steps::hooks::init_tracing();
//!     gauntlet_steps::hooks::run("tests/features").await;
//! }
//! ```

pub mod hooks;
pub mod rest_steps;
pub mod soap_steps;
pub mod world;

pub use world::{GauntletWorld, SoapState};
