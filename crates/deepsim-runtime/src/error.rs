//! Error types for the deepsim runtime

use thiserror::Error;

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, DeepError>;

/// Errors that can occur while assembling or inspecting a network
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeepError {
    /// Variable name not known to either the base or the deep neuron model
    #[error("Unknown neuron variable: {name}")]
    UnknownVariable {
        /// Name that failed to resolve
        name: String,
    },

    /// Flat unit index outside of the layer
    #[error("Unit index {index} out of range, N = {len}")]
    IndexOutOfRange {
        /// Flat index that was requested
        index: usize,
        /// Number of units in the layer
        len: usize,
    },

    /// Layer build step failed
    #[error("Build of layer {layer} failed: {reason}")]
    BuildFailure {
        /// Name of the layer being built
        layer: String,
        /// Reason for the failure
        reason: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Network topology error
    #[error("Network topology error: {reason}")]
    NetworkTopology {
        /// Reason for topology error
        reason: String,
    },

    /// Layer lookup by name failed
    #[error("Layer {name} not found")]
    LayerNotFound {
        /// Name that was looked up
        name: String,
    },
}

impl DeepError {
    /// Create an unknown variable error
    pub fn unknown_variable(name: impl Into<String>) -> Self {
        Self::UnknownVariable { name: name.into() }
    }

    /// Create a build failure error
    pub fn build_failure(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BuildFailure {
            layer: layer.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a network topology error
    pub fn network_topology(reason: impl Into<String>) -> Self {
        Self::NetworkTopology {
            reason: reason.into(),
        }
    }

    /// Create a layer-not-found error
    pub fn layer_not_found(name: impl Into<String>) -> Self {
        Self::LayerNotFound { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DeepError::unknown_variable("Foo");
        assert!(matches!(err, DeepError::UnknownVariable { .. }));

        let err = DeepError::invalid_parameter("send", "-1", ">= 0.0");
        assert!(matches!(err, DeepError::InvalidParameter { .. }));

        let err = DeepError::build_failure("V1s", "zero-sized shape");
        assert!(matches!(err, DeepError::BuildFailure { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = DeepError::IndexOutOfRange { index: 12, len: 9 };
        let msg = format!("{}", err);
        assert!(msg.contains("12 out of range, N = 9"));

        let err = DeepError::unknown_variable("Bogus");
        assert_eq!(err.to_string(), "Unknown neuron variable: Bogus");
    }
}
