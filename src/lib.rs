// Export modules for use in tests
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod loader;
pub mod registry;
pub mod scenario;
pub mod simulated;
pub mod throttle;
pub mod validator;
pub mod viewport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export the main entry points
pub use config::{Breakpoint, Callbacks, Options};
pub use error::{ConfigError, LoadError, ScenarioError};
pub use host::{Host, ProbeCallback, ProbeFailure, ProbeResult, Rect, Signal, SignalTarget};
pub use lifecycle::{LazyLoader, LifecycleState};
pub use validator::PassSummary;
