use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use crate::error::{ConfigError, LoadError};

pub const DEFAULT_SELECTOR: &str = ".b-lazy";
pub const DEFAULT_SRC_ATTRIBUTE: &str = "data-src";
pub const DEFAULT_SEPARATOR: &str = "|";
pub const DEFAULT_OFFSET: f64 = 100.0;
pub const DEFAULT_SUCCESS_CLASS: &str = "b-loaded";
pub const DEFAULT_ERROR_CLASS: &str = "b-error";
pub const DEFAULT_VALIDATE_DELAY_MS: u64 = 25;
pub const DEFAULT_SAVE_VIEWPORT_OFFSET_DELAY_MS: u64 = 50;

/// Screen-width dependent override of the deferred source attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Applies when the screen is at most this wide.
    pub width: f64,
    /// Attribute to read sources from.
    pub src: String,
}

/// Loader options. Immutable once handed to a [`crate::LazyLoader`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub selector: String,

    /// Default deferred-source attribute.
    pub src: String,

    /// Splits `standard|high-density` source pairs.
    pub separator: String,

    /// Margin in pixels added around the visible area.
    pub offset: f64,

    /// Load elements even when they render with zero size.
    pub load_invisible: bool,

    pub success_class: String,
    pub error_class: String,

    /// Selector for extra scroll containers. Resolved once at construction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub breakpoints: Vec<Breakpoint>,

    pub validate_delay_ms: u64,
    pub save_viewport_offset_delay_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            selector: DEFAULT_SELECTOR.to_string(),
            src: DEFAULT_SRC_ATTRIBUTE.to_string(),
            separator: DEFAULT_SEPARATOR.to_string(),
            offset: DEFAULT_OFFSET,
            load_invisible: false,
            success_class: DEFAULT_SUCCESS_CLASS.to_string(),
            error_class: DEFAULT_ERROR_CLASS.to_string(),
            container: None,
            breakpoints: Vec::new(),
            validate_delay_ms: DEFAULT_VALIDATE_DELAY_MS,
            save_viewport_offset_delay_ms: DEFAULT_SAVE_VIEWPORT_OFFSET_DELAY_MS,
        }
    }
}

impl Options {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let options: Options = serde_yaml::from_str(content)?;
        Ok(options.normalized())
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let options: Options = serde_json::from_str(content)?;
        Ok(options.normalized())
    }

    /// Load options from a `.json` or YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded options from {path:?}");
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Replace blank or out-of-range values with their defaults.
    ///
    /// The selector is left alone: an empty selector matches nothing.
    pub fn normalized(mut self) -> Self {
        fn or_default(value: &mut String, default: &str) {
            if value.trim().is_empty() {
                *value = default.to_string();
            }
        }

        or_default(&mut self.src, DEFAULT_SRC_ATTRIBUTE);
        or_default(&mut self.separator, DEFAULT_SEPARATOR);
        or_default(&mut self.success_class, DEFAULT_SUCCESS_CLASS);
        or_default(&mut self.error_class, DEFAULT_ERROR_CLASS);

        if !self.offset.is_finite() || self.offset < 0.0 {
            warn!(
                "Invalid offset {}, falling back to {}",
                self.offset, DEFAULT_OFFSET
            );
            self.offset = DEFAULT_OFFSET;
        }

        // A zero delay would turn the throttles off
        if self.validate_delay_ms == 0 {
            self.validate_delay_ms = DEFAULT_VALIDATE_DELAY_MS;
        }
        if self.save_viewport_offset_delay_ms == 0 {
            self.save_viewport_offset_delay_ms = DEFAULT_SAVE_VIEWPORT_OFFSET_DELAY_MS;
        }

        if self.container.as_deref().is_some_and(|c| c.trim().is_empty()) {
            self.container = None;
        }

        self.breakpoints.retain(|bp| !bp.src.trim().is_empty());
        self
    }

    pub fn validate_delay(&self) -> Duration {
        Duration::from_millis(self.validate_delay_ms)
    }

    pub fn save_viewport_offset_delay(&self) -> Duration {
        Duration::from_millis(self.save_viewport_offset_delay_ms)
    }

    /// Attribute name to read sources from on a screen `screen_width` wide.
    ///
    /// The first breakpoint whose width is at least the screen width wins.
    pub fn resolve_src_attribute(&self, screen_width: f64) -> &str {
        self.breakpoints
            .iter()
            .find(|bp| bp.width >= screen_width)
            .map(|bp| bp.src.as_str())
            .unwrap_or(&self.src)
    }

    /// Every attribute that may carry a deferred source.
    pub fn all_src_attributes(&self) -> impl Iterator<Item = &str> {
        self.breakpoints
            .iter()
            .map(|bp| bp.src.as_str())
            .chain(std::iter::once(self.src.as_str()))
    }
}

pub type SuccessCallback<E> = Rc<dyn Fn(&E)>;
pub type ErrorCallback<E> = Rc<dyn Fn(&E, &LoadError)>;

/// Per-element outcome hooks.
///
/// Cloned into every in-flight probe, so they may fire after the loader that
/// started the probe has been destroyed.
pub struct Callbacks<E> {
    pub on_success: Option<SuccessCallback<E>>,
    pub on_error: Option<ErrorCallback<E>>,
}

impl<E> Callbacks<E> {
    pub fn new() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }

    pub fn on_success(mut self, f: impl Fn(&E) + 'static) -> Self {
        self.on_success = Some(Rc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&E, &LoadError) + 'static) -> Self {
        self.on_error = Some(Rc::new(f));
        self
    }

    pub(crate) fn success(&self, element: &E) {
        if let Some(f) = &self.on_success {
            f(element);
        }
    }

    pub(crate) fn error(&self, element: &E, error: &LoadError) {
        if let Some(f) = &self.on_error {
            f(element, error);
        }
    }
}

impl<E> Clone for Callbacks<E> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<E> Default for Callbacks<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Callbacks<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.selector, ".b-lazy");
        assert_eq!(options.src, "data-src");
        assert_eq!(options.separator, "|");
        assert_eq!(options.offset, 100.0);
        assert!(!options.load_invisible);
        assert_eq!(options.success_class, "b-loaded");
        assert_eq!(options.error_class, "b-error");
        assert_eq!(options.validate_delay(), Duration::from_millis(25));
        assert_eq!(options.save_viewport_offset_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
selector: ".lazy"
offset: 250
breakpoints:
  - width: 600
    src: data-src-small
"#;
        let options = Options::from_yaml_str(yaml).unwrap();
        assert_eq!(options.selector, ".lazy");
        assert_eq!(options.offset, 250.0);
        assert_eq!(options.src, "data-src");
        assert_eq!(options.breakpoints.len(), 1);
    }

    #[test]
    fn test_blank_values_normalized() {
        let options = Options {
            src: String::new(),
            separator: " ".to_string(),
            error_class: String::new(),
            offset: -5.0,
            container: Some(String::new()),
            selector: String::new(),
            ..Options::default()
        }
        .normalized();

        assert_eq!(options.src, "data-src");
        assert_eq!(options.separator, "|");
        assert_eq!(options.error_class, "b-error");
        assert_eq!(options.offset, 100.0);
        assert_eq!(options.container, None);
        assert_eq!(options.selector, "");
    }

    #[test]
    fn test_zero_delays_fall_back_but_zero_offset_is_kept() {
        let options = Options {
            offset: 0.0,
            validate_delay_ms: 0,
            save_viewport_offset_delay_ms: 0,
            ..Options::default()
        }
        .normalized();

        assert_eq!(options.offset, 0.0);
        assert_eq!(options.validate_delay(), Duration::from_millis(25));
        assert_eq!(options.save_viewport_offset_delay(), Duration::from_millis(50));
    }

    #[test]
    fn test_breakpoint_resolution_first_match_wins() {
        let options = Options {
            breakpoints: vec![
                Breakpoint {
                    width: 420.0,
                    src: "data-src-tiny".to_string(),
                },
                Breakpoint {
                    width: 600.0,
                    src: "data-src-small".to_string(),
                },
                Breakpoint {
                    width: 1000.0,
                    src: "data-src-medium".to_string(),
                },
            ],
            ..Options::default()
        };

        assert_eq!(options.resolve_src_attribute(480.0), "data-src-small");
        assert_eq!(options.resolve_src_attribute(420.0), "data-src-tiny");
        assert_eq!(options.resolve_src_attribute(1920.0), "data-src");

        let all: Vec<_> = options.all_src_attributes().collect();
        assert_eq!(
            all,
            vec!["data-src-tiny", "data-src-small", "data-src-medium", "data-src"]
        );
    }

    #[test]
    fn test_load_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"success_class": "done", "validate_delay_ms": 10}}"#).unwrap();

        let options = Options::load(file.path()).unwrap();
        assert_eq!(options.success_class, "done");
        assert_eq!(options.validate_delay_ms, 10);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Options::load(Path::new("/nonexistent/lazyview.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
