//! Resolver construction errors.

use thiserror::Error;

/// Invalid resolver configuration.
///
/// Only construction can fail; every runtime operation clamps instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A cell dimension of zero.
    #[error("grid cell size must be non-zero, got {width}x{height}")]
    ZeroCellSize { width: u32, height: u32 },

    /// A world dimension of zero.
    #[error("grid map size must be non-zero, got {width}x{height}")]
    ZeroMapSize { width: u32, height: u32 },

    /// Tree fattening margin is negative or not finite.
    #[error("tree margin must be finite and non-negative, got {0}")]
    InvalidMargin(f32),

    /// Malformed JSON configuration.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for resolver construction.
pub type ConfigResult<T> = Result<T, ConfigError>;
