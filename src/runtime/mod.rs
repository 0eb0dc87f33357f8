//! App runtime seam: loaders, programs, and the execution context.
//!
//! The render loop never knows what an app *is* — it drives whatever a
//! loader produced through the `AppProgram` trait. The built-in manifest
//! runtime lives in [`manifest`]; other runtimes plug in at the same seam.

pub mod manifest;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::render::RenderTree;

/// Configuration handed to an app execution: string keys to string values.
/// Replaced wholesale on every update, never merged.
pub type AppConfig = BTreeMap<String, String>;

// ============================================================================
// Execution context
// ============================================================================

/// Process-wide services available to app executions.
///
/// Passed explicitly into every execution so multiple render loops can
/// coexist in one process (and in one test binary) without shared globals.
#[derive(Default)]
pub struct RuntimeContext {
    pub cache: KvCache,
}

impl RuntimeContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Small shared key-value store apps can use to carry state between
/// executions.
#[derive(Default)]
pub struct KvCache {
    inner: DashMap<String, Vec<u8>>,
}

impl KvCache {
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    pub fn set(&self, key: impl Into<String>, value: Vec<u8>) {
        self.inner.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Configuration schema document advertised to viewers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

/// One configurable field of an app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Schema {
    /// Serialize to a JSON document string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| Self::empty_json())
    }

    /// The document returned before any app has advertised a schema.
    pub fn empty_json() -> String {
        r#"{"version":"","fields":[]}"#.to_string()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// App source failed to load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read app source: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid app source: {0}")]
    Parse(String),
}

/// An app execution failed.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ExecError(pub String);

/// A named schema handler was missing or failed.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no handler named `{0}`")]
    NotFound(String),

    #[error("handler `{name}` failed: {message}")]
    Failed { name: String, message: String },

    #[error("app is not loaded")]
    NotReady,
}

// ============================================================================
// Traits
// ============================================================================

/// A running form of app source: renders frames and answers named schema
/// handler calls.
#[async_trait]
pub trait AppProgram: Send + Sync {
    /// Execute with the given configuration, producing a render tree.
    async fn run(&self, ctx: &RuntimeContext, config: &AppConfig) -> Result<RenderTree, ExecError>;

    /// Invoke a named schema handler, e.g. for option lookups in the
    /// configuration UI. The default rejects every name.
    async fn call_handler(
        &self,
        ctx: &RuntimeContext,
        name: &str,
        param: &str,
    ) -> Result<String, HandlerError> {
        let _ = (ctx, param);
        Err(HandlerError::NotFound(name.to_string()))
    }
}

/// A loaded executable unit: the program plus its schema snapshot.
/// Replaced wholesale on reload, never mutated in place.
pub struct LoadedApp {
    pub program: Box<dyn AppProgram>,
    pub schema: Option<Schema>,
}

impl std::fmt::Debug for LoadedApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedApp")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl LoadedApp {
    /// Schema as a JSON document string, if the app advertises one.
    pub fn schema_json(&self) -> Option<String> {
        self.schema.as_ref().map(Schema::to_json)
    }
}

/// Turns app source into a [`LoadedApp`]. Implementations decide what
/// "source" means — a manifest file, a script, a directory.
pub trait AppLoader: Send + Sync + 'static {
    fn load(&self, ctx: &RuntimeContext) -> Result<LoadedApp, LoadError>;
}
