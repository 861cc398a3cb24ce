use std::path::PathBuf;

/// Why an element could not be materialised.
///
/// Never returned from a public operation; delivered to the error callback
/// together with the element and reflected by the error class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("element has no deferred source attribute")]
    Missing,

    #[error("image source failed to load: {src}")]
    Invalid { src: String },
}

impl LoadError {
    /// Short reason string handed to error callbacks.
    pub fn reason(&self) -> &'static str {
        match self {
            LoadError::Missing => "missing",
            LoadError::Invalid { .. } => "invalid",
        }
    }
}

/// Failure reading an options file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML options: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON options: {0}")]
    Json(#[from] serde_json::Error),
}

/// A replay scenario that cannot be built or run.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("duplicate element id '{0}'")]
    DuplicateId(String),

    #[error("unknown element id '{0}'")]
    UnknownElement(String),
}
