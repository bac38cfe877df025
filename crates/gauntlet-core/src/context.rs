//! Per-scenario execution context and variable store
//!
//! The context replaces the thread-keyed property map found in older BDD
//! harnesses: instead of a global store indexed by worker thread, every
//! scenario owns one `ScenarioContext` for its whole lifetime. Values saved by
//! a step are visible to later steps of the same scenario and to nothing else.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

pub type ScenarioId = Uuid;

/// Named string values saved by steps for later steps of the same scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    values: BTreeMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves a value, overwriting any previous value under the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        debug!("saving variable '{}'", name);
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Replaces every `${NAME}` occurrence with the saved value of `NAME`.
    /// References to unknown variables are left untouched so the resulting
    /// text still shows what failed to resolve.
    pub fn interpolate(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 2..];
            match tail.find('}') {
                Some(end) => {
                    let name = &tail[..end];
                    match self.get(name) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("${");
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// A resource opened by some step library (an SSH session, a SQL connection)
/// that must be closed when the scenario ends, whether or not the scenario
/// passed.
#[async_trait]
pub trait Disposable: std::fmt::Debug + Send {
    /// Short name used in teardown logs.
    fn label(&self) -> &str;

    /// Releases the resource. Called at most once.
    async fn dispose(&mut self) -> Result<()>;
}

/// State owned by exactly one executing scenario.
///
/// Allocated by the before-scenario hook, mutated by steps, released by the
/// after-scenario hook. There is no sharing between scenarios even under
/// parallel execution: each scenario gets a fresh context with a fresh id.
#[derive(Debug)]
pub struct ScenarioContext {
    id: ScenarioId,
    pub vars: VariableStore,
    resources: Vec<Box<dyn Disposable>>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            vars: VariableStore::new(),
            resources: Vec::new(),
        }
    }

    pub fn id(&self) -> ScenarioId {
        self.id
    }

    /// Registers an externally-opened resource for teardown at scenario end.
    pub fn register(&mut self, resource: Box<dyn Disposable>) {
        debug!("registering resource '{}' for teardown", resource.label());
        self.resources.push(resource);
    }

    pub fn open_resources(&self) -> usize {
        self.resources.len()
    }

    /// Disposes every registered resource. Teardown is best-effort: a
    /// resource that fails to close is logged and the remaining resources are
    /// still released. Releasing a context with no resources is a no-op.
    pub async fn release_all(&mut self) {
        for mut resource in self.resources.drain(..) {
            match resource.dispose().await {
                Ok(()) => debug!("released '{}'", resource.label()),
                Err(err) => warn!("failed to release '{}': {}", resource.label(), err),
            }
        }
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GauntletError;

    #[derive(Debug)]
    struct FlakyHandle {
        fail: bool,
    }

    #[async_trait]
    impl Disposable for FlakyHandle {
        fn label(&self) -> &str {
            "flaky-handle"
        }

        async fn dispose(&mut self) -> Result<()> {
            if self.fail {
                return Err(GauntletError::Teardown {
                    label: "flaky-handle".to_string(),
                    reason: "connection already gone".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn saved_values_are_recalled_and_overwritten() {
        let mut vars = VariableStore::new();
        vars.set("USERNAME", "alice");
        assert_eq!(vars.get("USERNAME"), Some("alice"));

        vars.set("USERNAME", "bob");
        assert_eq!(vars.get("USERNAME"), Some("bob"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn interpolation_replaces_known_names_only() {
        let mut vars = VariableStore::new();
        vars.set("HOST", "localhost:8080");

        assert_eq!(
            vars.interpolate("http://${HOST}/users/${ID}"),
            "http://localhost:8080/users/${ID}"
        );
        assert_eq!(vars.interpolate("no placeholders"), "no placeholders");
        assert_eq!(vars.interpolate("dangling ${HOST"), "dangling ${HOST");
    }

    #[test]
    fn contexts_are_isolated() {
        let mut first = ScenarioContext::new();
        let second = ScenarioContext::new();
        first.vars.set("TOKEN", "abc");

        assert_ne!(first.id(), second.id());
        assert!(second.vars.get("TOKEN").is_none());
    }

    #[tokio::test]
    async fn release_all_tolerates_failing_resources() {
        let mut ctx = ScenarioContext::new();
        ctx.register(Box::new(FlakyHandle { fail: true }));
        ctx.register(Box::new(FlakyHandle { fail: false }));
        assert_eq!(ctx.open_resources(), 2);

        ctx.release_all().await;
        assert_eq!(ctx.open_resources(), 0);

        // A second release finds nothing to do.
        ctx.release_all().await;
    }
}
