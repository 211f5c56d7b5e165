//! Common error infrastructure for emblem-core.
//!
//! Domain-specific errors (e.g., `BoardError`, `CombatError`) are defined
//! in their respective modules alongside the operations they validate.
//! This module provides the shared severity classification used to decide
//! how a failure is handled at the call site.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: temporary conditions that may succeed with a different
///   input (tile occupied, target out of range)
/// - **Validation**: invalid input that should be rejected without retry
/// - **Internal**: unexpected state inconsistency; indicates a bug
/// - **Fatal**: corrupted state, cannot continue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all emblem-core errors.
///
/// Use `#[derive(thiserror::Error)]` for the Display/Error impl and
/// classify severity based on recoverability, not impact.
pub trait EngineError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Static string identifier for the error variant, for logs and metrics.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
