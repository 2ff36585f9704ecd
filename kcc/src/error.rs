//! Configuration errors.

use thiserror::Error;

/// Rejected controller configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f32 },

    #[error("radius must be positive, got {0}")]
    NonPositiveRadius(f32),

    #[error("height must not be negative, got {0}")]
    NegativeHeight(f32),

    #[error("skin must be positive, got {0}")]
    NonPositiveSkin(f32),

    #[error("max slope must be in (0, 90] degrees, got {0}")]
    SlopeOutOfRange(f32),

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },
}
