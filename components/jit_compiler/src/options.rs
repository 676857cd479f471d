//! Inlining configuration

use core_types::{CompilationError, CompilationResult, ErrorKind};
use serde::{Deserialize, Serialize};

/// Feature flags and limits of the inliner.
///
/// Missing fields take their default when deserializing, so a partial
/// JSON document only overrides what it names.
///
/// # Examples
///
/// ```
/// use jit_compiler::InliningOptions;
///
/// let options = InliningOptions::from_json(r#"{ "maximum_inline_level": 2 }"#).unwrap();
/// assert_eq!(options.maximum_inline_level, 2);
/// assert!(options.inline_with_type_check);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InliningOptions {
    /// Inline monomorphic virtual calls behind a receiver type guard
    pub inline_with_type_check: bool,
    /// Scale the frequency of inlined nodes by the call site's frequency
    pub probability_analysis: bool,
    /// Guard inlined instance calls against a null receiver
    pub receiver_null_check: bool,
    /// Reuse callee graphs across call sites through the graph cache
    pub use_graph_cache: bool,
    /// Deepest nesting level the driver evaluates
    pub maximum_inline_level: u32,
    /// Most inlines the driver performs per compilation
    pub maximum_inline_count: usize,
    /// Heaviest candidate the driver applies, `None` for no bound
    pub maximum_inline_weight: Option<f64>,
}

impl Default for InliningOptions {
    fn default() -> Self {
        Self {
            inline_with_type_check: true,
            probability_analysis: true,
            receiver_null_check: true,
            use_graph_cache: true,
            maximum_inline_level: 30,
            maximum_inline_count: 100,
            maximum_inline_weight: None,
        }
    }
}

impl InliningOptions {
    /// Few, shallow inlines without speculation on receiver types
    pub fn conservative() -> Self {
        Self {
            inline_with_type_check: false,
            maximum_inline_level: 3,
            maximum_inline_count: 20,
            maximum_inline_weight: Some(100.0),
            ..Self::default()
        }
    }

    /// Deep inlining with generous limits
    pub fn aggressive() -> Self {
        Self {
            maximum_inline_level: 64,
            maximum_inline_count: 1000,
            maximum_inline_weight: None,
            ..Self::default()
        }
    }

    /// Parse options from JSON and validate them
    pub fn from_json(json: &str) -> CompilationResult<Self> {
        let options: Self = serde_json::from_str(json).map_err(|e| {
            CompilationError::new(ErrorKind::InvalidOptions, format!("invalid options: {e}"))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Reject limits that cannot be honored
    pub fn validate(&self) -> CompilationResult<()> {
        if let Some(weight) = self.maximum_inline_weight {
            if weight.is_nan() || weight < 0.0 {
                return Err(CompilationError::new(
                    ErrorKind::InvalidOptions,
                    format!("maximum_inline_weight must be a non-negative number, got {weight}"),
                ));
            }
        }
        Ok(())
    }
}
