// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Analyzer plugin contract and registry.
//!
//! The [`AnalyzerPlugin`] trait is the single interface between the engine
//! and any analyzer.  This crate ships only the contract; reference
//! analyzers live in downstream crates so that a real model can later
//! implement the same interface.
//!
//! # Implementing `AnalyzerPlugin`
//!
//! ```rust
//! use arbiter_core::plugin::AnalyzerPlugin;
//! use arbiter_core::types::{Action, AnalysisRequest, AnalysisResult, Decision};
//!
//! struct AlwaysWait {
//!     types: Vec<String>,
//! }
//!
//! #[async_trait::async_trait]
//! impl AnalyzerPlugin for AlwaysWait {
//!     fn name(&self) -> &str { "always-wait" }
//!     fn version(&self) -> &str { "1.0.0" }
//!     fn supported_types(&self) -> &[String] { &self.types }
//!
//!     async fn analyze(&self, _request: &AnalysisRequest) -> AnalysisResult {
//!         let decision = Decision::new(Action::Wait, 50.0, vec!["patience".into()]);
//!         AnalysisResult::success(decision, self.name())
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{EngineError, EngineResult};
use crate::types::{AnalysisRequest, AnalysisResult};

// ---------------------------------------------------------------------------
// Plugin trait
// ---------------------------------------------------------------------------

/// Capability interface every analyzer implements.
///
/// `analyze` must not panic for a well-formed request.  When it cannot
/// analyze, it returns [`AnalysisResult::failure`] with a reason.  The engine
/// enforces deadlines; plugins only need to resolve eventually.
///
/// Implementations MUST be `Send + Sync` so the engine can invoke them from
/// any Tokio task.
#[async_trait]
pub trait AnalyzerPlugin: Send + Sync {
    /// Unique, non-empty plugin name.
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Request types this plugin can serve.  Must not be empty.
    fn supported_types(&self) -> &[String];

    /// Blockchains this plugin understands, or `None` for "any".
    fn supported_blockchains(&self) -> Option<&[String]> {
        None
    }

    /// Cheap pre-check run during candidate selection.
    fn validate(&self, _request: &AnalysisRequest) -> bool {
        true
    }

    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult;
}

/// Whether `plugin` may serve `request`: type supported, blockchain
/// supported (when both sides specify one), and `validate` passes.
pub fn accepts(plugin: &dyn AnalyzerPlugin, request: &AnalysisRequest) -> bool {
    if !plugin
        .supported_types()
        .iter()
        .any(|supported| supported == &request.request_type)
    {
        return false;
    }

    if let (Some(chains), Some(blockchain)) =
        (plugin.supported_blockchains(), request.context.blockchain.as_deref())
    {
        if !chains.iter().any(|chain| chain.eq_ignore_ascii_case(blockchain)) {
            return false;
        }
    }

    plugin.validate(request)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A plugin and the name it was registered under.
#[derive(Clone)]
pub struct RegisteredPlugin {
    pub name: String,
    pub plugin: Arc<dyn AnalyzerPlugin>,
}

impl fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("name", &self.name)
            .field("version", &self.plugin.version())
            .field("supported_types", &self.plugin.supported_types())
            .finish()
    }
}

/// Ordered, name-keyed plugin registry.  Iteration order is registration
/// order.
///
/// # Examples
///
/// ```rust
/// use arbiter_core::plugin::PluginRegistry;
///
/// let mut registry = PluginRegistry::new();
/// assert!(registry.is_empty());
/// assert!(!registry.unregister("missing"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<RegisteredPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under `name`.
    ///
    /// # Errors
    ///
    /// * [`EngineError::InvalidPlugin`] - empty registry name, or the plugin
    ///   reports an empty name, version, or supported-type list.
    /// * [`EngineError::DuplicatePlugin`] - `name` is already taken.
    ///
    /// The registry is unchanged on error.
    pub fn register(&mut self, name: &str, plugin: Arc<dyn AnalyzerPlugin>) -> EngineResult<()> {
        let invalid = |reason: &str| EngineError::InvalidPlugin {
            name: name.to_owned(),
            reason: reason.to_owned(),
        };

        if name.trim().is_empty() {
            return Err(invalid("registry name must not be empty"));
        }
        if plugin.name().trim().is_empty() {
            return Err(invalid("plugin name must not be empty"));
        }
        if plugin.version().trim().is_empty() {
            return Err(invalid("plugin version must not be empty"));
        }
        if plugin.supported_types().is_empty() {
            return Err(invalid("plugin must support at least one request type"));
        }
        if self.contains(name) {
            return Err(EngineError::DuplicatePlugin { name: name.to_owned() });
        }

        self.plugins.push(RegisteredPlugin { name: name.to_owned(), plugin });
        Ok(())
    }

    /// Remove the plugin registered under `name`.  Returns whether one was
    /// removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.plugins.len();
        self.plugins.retain(|registered| registered.name != name);
        self.plugins.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|registered| registered.name == name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AnalyzerPlugin>> {
        self.plugins
            .iter()
            .find(|registered| registered.name == name)
            .map(|registered| Arc::clone(&registered.plugin))
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|registered| registered.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Cheap copy of the current entries, so selection can run without
    /// holding the registry lock.
    pub fn snapshot(&self) -> Vec<RegisteredPlugin> {
        self.plugins.clone()
    }
}

/// Filter `plugins` down to those that accept `request`, keeping order.
pub fn select_candidates(
    plugins: Vec<RegisteredPlugin>,
    request: &AnalysisRequest,
) -> Vec<RegisteredPlugin> {
    plugins
        .into_iter()
        .filter(|registered| accepts(registered.plugin.as_ref(), request))
        .collect()
}
