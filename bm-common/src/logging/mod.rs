// Logging utilities for the Bristlemouth service layer
//
// This module provides:
// - Component-based structured logging
// - Node ID tracking through logger inheritance
// - Service name context for request dispatch tracing
// - A small logging configuration that installs env_logger once

use log::{debug, info, warn, Level, LevelFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Arguments, Display, Formatter};

/// Predefined components for logging categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Service,
    Registry,
    Dispatch,
    Transport,
    Custom(&'static str),
}

impl Component {
    /// Get the string representation of the component
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Service => "Service",
            Component::Registry => "Registry",
            Component::Dispatch => "Dispatch",
            Component::Transport => "Transport",
            Component::Custom(name) => name,
        }
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Lightweight Display helpers to avoid prefix String allocations
struct ComponentPrefixDisplay {
    parent: Option<Component>,
    component: Component,
}

impl Display for ComponentPrefixDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) if parent != Component::Service => {
                write!(f, "{}.{}", parent.as_str(), self.component.as_str())
            }
            _ => write!(f, "{}", self.component.as_str()),
        }
    }
}

struct MaybeServiceDisplay<'a>(Option<&'a str>);

impl Display for MaybeServiceDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.0 {
            write!(f, "|service={name}")
        } else {
            Ok(())
        }
    }
}

/// A helper for creating component-specific loggers with node ID tracking
#[derive(Clone, Debug)]
pub struct Logger {
    /// Component this logger is for
    component: Component,
    /// Node ID of the local node, rendered as hex
    node_id: String,
    /// Parent component for hierarchical logging (if any)
    parent_component: Option<Component>,
    /// Service name for dispatch tracing
    service: Option<String>,
}

impl Logger {
    /// Create a new root logger for a specific component and node ID
    pub fn new_root(component: Component, node_id: u64) -> Self {
        Self {
            component,
            node_id: format!("{node_id:016x}"),
            parent_component: None,
            service: None,
        }
    }

    /// Create a child logger with the same node ID but different component
    pub fn with_component(&self, component: Component) -> Self {
        Self {
            component,
            node_id: self.node_id.clone(),
            parent_component: Some(self.component),
            service: self.service.clone(),
        }
    }

    /// Create a logger tagged with a service name.
    /// Non-UTF-8 names are rendered lossily.
    pub fn with_service(&self, name: &[u8]) -> Self {
        Self {
            component: self.component,
            node_id: self.node_id.clone(),
            parent_component: self.parent_component,
            service: Some(String::from_utf8_lossy(name).into_owned()),
        }
    }

    pub fn component(&self) -> Component {
        self.component
    }

    /// Get a reference to the node ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    fn prefix(&self) -> impl Display + '_ {
        struct Prefix<'a>(&'a Logger);
        impl Display for Prefix<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "[{}][{}{}]",
                    self.0.node_id,
                    ComponentPrefixDisplay {
                        parent: self.0.parent_component,
                        component: self.0.component,
                    },
                    MaybeServiceDisplay(self.0.service()),
                )
            }
        }
        Prefix(self)
    }

    /// Whether `level` is enabled for this logger's component target
    pub fn enabled(&self, level: Level) -> bool {
        log::log_enabled!(target: self.component.as_str(), level)
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        if self.enabled(Level::Debug) {
            debug!(target: self.component.as_str(), "{} {}", self.prefix(), message.into());
        }
    }

    /// Log a debug message using fmt::Arguments (avoids allocating message String)
    pub fn debug_args(&self, args: Arguments) {
        if self.enabled(Level::Debug) {
            debug!(target: self.component.as_str(), "{} {}", self.prefix(), args);
        }
    }

    pub fn info_args(&self, args: Arguments) {
        if self.enabled(Level::Info) {
            info!(target: self.component.as_str(), "{} {}", self.prefix(), args);
        }
    }

    pub fn warn_args(&self, args: Arguments) {
        if self.enabled(Level::Warn) {
            warn!(target: self.component.as_str(), "{} {}", self.prefix(), args);
        }
    }
}

/// Log level used by [`LoggingConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Key for per-component level overrides
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKey {
    Service,
    Registry,
    Dispatch,
    Transport,
    Custom(String),
}

impl ComponentKey {
    /// The log target the matching [`Component`] emits under
    pub fn target(&self) -> &str {
        match self {
            ComponentKey::Service => Component::Service.as_str(),
            ComponentKey::Registry => Component::Registry.as_str(),
            ComponentKey::Dispatch => Component::Dispatch.as_str(),
            ComponentKey::Transport => Component::Transport.as_str(),
            ComponentKey::Custom(name) => name,
        }
    }
}

impl From<Component> for ComponentKey {
    fn from(component: Component) -> Self {
        match component {
            Component::Service => ComponentKey::Service,
            Component::Registry => ComponentKey::Registry,
            Component::Dispatch => ComponentKey::Dispatch,
            Component::Transport => ComponentKey::Transport,
            Component::Custom(name) => ComponentKey::Custom(name.to_string()),
        }
    }
}

/// Logging configuration: a default level plus per-component overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub default_level: LogLevel,
    pub component_levels: HashMap<ComponentKey, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self {
            default_level: LogLevel::Info,
            component_levels: HashMap::new(),
        }
    }

    pub fn with_default_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_component_level(mut self, component: ComponentKey, level: LogLevel) -> Self {
        self.component_levels.insert(component, level);
        self
    }

    /// Effective level for a component
    pub fn level_for(&self, component: &ComponentKey) -> LogLevel {
        self.component_levels
            .get(component)
            .copied()
            .unwrap_or(self.default_level)
    }

    /// Install env_logger with this configuration.
    ///
    /// Only the first call in a process installs a logger; later calls are ignored.
    pub fn apply(&self) {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.default_level.into());
        for (component, level) in &self.component_levels {
            builder.filter_module(component.target(), (*level).into());
        }
        let _ = builder.try_init();
    }
}
