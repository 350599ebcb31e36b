use thiserror::Error;

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use crate::globals::GlobalScopeError;

/// Unified result type for the marquee runtime.
pub type Result<T> = std::result::Result<T, ThemeError>;

/// Errors surfaced by the core runtime and the application controller.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("component `{name}` failed: {message}")]
    Component { name: String, message: String },
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("invalid component configuration: {0}")]
    ComponentConfig(String),
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("bootstrap configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("global scope error: {0}")]
    Globals(#[from] GlobalScopeError),
}

impl ThemeError {
    /// Wrap a component failure with the name its owning registry knows it by.
    pub fn component(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Component {
            name: name.into(),
            message: err.to_string(),
        }
    }
}
