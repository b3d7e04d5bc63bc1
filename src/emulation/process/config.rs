//! Emulation configuration types.
//!
//! Configuration is organized into two structures:
//!
//! - [`EmulationLimits`] - Resource limits (the maximum call depth)
//! - [`TracingConfig`] - Which events are reported through the `log` facade
//!
//! both aggregated by [`EmulationConfig`].
//!
//! # Configuration Presets
//!
//! - [`EmulationConfig::default()`] - Default limits, no tracing
//! - [`EmulationConfig::minimal()`] - Same as the default, spelled out for call sites that want
//!   to state it
//! - [`EmulationConfig::debug()`] - Every tracing category enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use minclr::emulation::{EmulationConfig, EmulationLimits, TracingConfig};
//!
//! let config = EmulationConfig::default()
//!     .with_limits(EmulationLimits::new().with_max_call_depth(64))
//!     .with_tracing(TracingConfig {
//!         trace_calls: true,
//!         ..Default::default()
//!     });
//! assert_eq!(config.limits.max_call_depth, 64);
//! ```

/// Default maximum number of nested method frames.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 25;

/// Emulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmulationConfig {
    /// Resource limits.
    pub limits: EmulationLimits,

    /// Tracing switches.
    pub tracing: TracingConfig,
}

/// Resource limits enforced during execution.
///
/// # Default Values
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_call_depth` | 25 |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmulationLimits {
    /// Maximum number of nested method frames.
    ///
    /// Checked before every frame push; exceeding it fails the whole execution with a
    /// stack-depth error. Host entry frames do not count.
    pub max_call_depth: usize,
}

/// Tracing switches.
///
/// Events are emitted through the `log` facade; the crate never installs a logger, so nothing
/// is printed unless the embedding application configures one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TracingConfig {
    /// Log every executed instruction at `trace` level, with method, offset, mnemonic and
    /// evaluation stack depth.
    ///
    /// Very high overhead.
    pub trace_instructions: bool,

    /// Log frame pushes and unwinds at `debug` level.
    pub trace_calls: bool,

    /// Log heap allocations at `trace` level, including lazily materialized array elements.
    pub trace_heap: bool,
}

impl Default for EmulationLimits {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl TracingConfig {
    /// Enables every category.
    #[must_use]
    pub fn all() -> Self {
        Self {
            trace_instructions: true,
            trace_calls: true,
            trace_heap: true,
        }
    }

    /// Checks if any tracing is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.trace_instructions || self.trace_calls || self.trace_heap
    }
}

/// Preset configurations.
impl EmulationConfig {
    /// Default limits without any tracing.
    #[must_use]
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Default limits with every tracing category enabled.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use minclr::emulation::EmulationConfig;
    ///
    /// let config = EmulationConfig::debug();
    /// assert!(config.tracing.trace_instructions);
    /// ```
    #[must_use]
    pub fn debug() -> Self {
        Self {
            tracing: TracingConfig::all(),
            ..Self::default()
        }
    }

    /// Replaces the limits.
    #[must_use]
    pub fn with_limits(mut self, limits: EmulationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replaces the tracing switches.
    #[must_use]
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }
}

/// Builder methods for [`EmulationLimits`].
impl EmulationLimits {
    /// Creates new limits with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum call stack depth.
    ///
    /// # Arguments
    ///
    /// * `max` - Maximum nested method frames
    ///
    /// # Returns
    ///
    /// Returns `self` for method chaining.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }
}
