//! Engine configuration
//!
//! Built in code with the `with_*` builders, or loaded from TOML:
//!
//! ```toml
//! [engine]
//! dev_mode = true
//! marker_seed = 42
//! sanitize = false
//!
//! [render]
//! is_connected = true
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Options for the template engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Run the authoring checks that cost an extra pass: bindings inside
    /// `<template>` and duplicate attribute bindings
    pub dev_mode: bool,

    /// Seed for the marker token; `None` draws one per renderer
    pub marker_seed: Option<u64>,

    /// Refuse text and node bindings inside `<script>`/`<style>` and route
    /// writes through the installed sanitizer
    pub sanitize: bool,

    /// Defaults applied to every `render` call
    pub render: RenderOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dev_mode: true,
            marker_seed: None,
            sanitize: false,
            render: RenderOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the development-mode checks
    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Use a fixed marker seed, making compiled markup deterministic
    pub fn with_marker_seed(mut self, seed: u64) -> Self {
        self.marker_seed = Some(seed);
        self
    }

    /// Enable sanitizer semantics
    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// Set the default render options
    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(engine) = parsed.engine {
            if let Some(dev_mode) = engine.dev_mode {
                config.dev_mode = dev_mode;
            }
            config.marker_seed = engine.marker_seed.or(config.marker_seed);
            if let Some(sanitize) = engine.sanitize {
                config.sanitize = sanitize;
            }
        }
        if let Some(render) = parsed.render {
            if let Some(is_connected) = render.is_connected {
                config.render.is_connected = is_connected;
            }
        }
        Ok(config)
    }
}

/// Per-call render options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Render before this child of the container instead of appending
    pub render_before: Option<crate::host::NodeId>,
    /// Initial connection state of a new root part
    pub is_connected: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            render_before: None,
            is_connected: true,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render_before(mut self, node: crate::host::NodeId) -> Self {
        self.render_before = Some(node);
        self
    }

    pub fn with_connected(mut self, is_connected: bool) -> Self {
        self.is_connected = is_connected;
        self
    }
}

/// TOML structure for deserializing configuration
#[derive(Deserialize)]
struct TomlConfig {
    engine: Option<TomlEngine>,
    render: Option<TomlRender>,
}

#[derive(Deserialize)]
struct TomlEngine {
    dev_mode: Option<bool>,
    marker_seed: Option<u64>,
    sanitize: Option<bool>,
}

#[derive(Deserialize)]
struct TomlRender {
    is_connected: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.dev_mode);
        assert_eq!(config.marker_seed, None);
        assert!(!config.sanitize);
        assert!(config.render.is_connected);
    }

    #[test]
    fn test_builder_pattern() {
        let config = EngineConfig::new()
            .with_dev_mode(false)
            .with_marker_seed(7)
            .with_sanitize(true)
            .with_render_options(RenderOptions::new().with_connected(false));

        assert!(!config.dev_mode);
        assert_eq!(config.marker_seed, Some(7));
        assert!(config.sanitize);
        assert!(!config.render.is_connected);
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml(
            r#"
            [engine]
            marker_seed = 42
            sanitize = true

            [render]
            is_connected = false
            "#,
        )
        .unwrap();
        assert!(config.dev_mode);
        assert_eq!(config.marker_seed, Some(42));
        assert!(config.sanitize);
        assert!(!config.render.is_connected);
    }

    #[test]
    fn test_from_toml_empty_keeps_defaults() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        let err = EngineConfig::from_toml("[engine]\ndev_mode = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
