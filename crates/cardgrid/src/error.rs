#![forbid(unsafe_code)]

//! cardgrid error model and graceful degradation.
//!
//! # Design Principles
//!
//! 1. **Result everywhere**: no panics on the layout or merge path.
//! 2. **Domain-specific errors**: each crate owns its typed error; this
//!    module only unifies them.
//! 3. **Graceful degradation**: every error maps to a [`DegradationAction`]
//!    that keeps the card on screen. No variant requires tearing the card
//!    down.

use std::fmt;

pub use cardgrid_layout::LayoutError;
pub use cardgrid_runtime::{ConfigError, LoadError, StreamError};

// ── Unified Error ───────────────────────────────────────────────────────

/// Top-level error type for cardgrid users.
///
/// Use [`Error::degradation`] to decide how to keep rendering.
#[derive(Debug)]
pub enum Error {
    /// Packing rejected its input.
    Layout(LayoutError),
    /// A chunk or lifecycle call was rejected.
    Stream(StreamError),
    /// A section renderer could not be produced.
    RendererLoad(LoadError),
    /// Configuration could not be loaded.
    Config(ConfigError),
}

/// Standard result type for cardgrid APIs.
pub type Result<T> = std::result::Result<T, Error>;

// ── Graceful Degradation ────────────────────────────────────────────────

/// What the surface should do instead of failing the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationAction {
    /// Draw the section with the fallback renderer.
    FallbackRenderer,
    /// Ignore the chunk; the snapshot is unchanged.
    DropChunk,
    /// Draw an empty placeholder for the affected section.
    EmptyPlaceholder,
    /// Lay everything out in one column.
    SingleColumn,
    /// Show the stream status indicator.
    SurfaceStatus,
    /// Continue with the default configuration.
    DefaultConfig,
}

impl Error {
    /// Determine the graceful degradation action for this error.
    #[must_use]
    pub fn degradation(&self) -> DegradationAction {
        match self {
            Self::Layout(LayoutError::NegativeHeight { .. }) => DegradationAction::EmptyPlaceholder,
            Self::Layout(LayoutError::NonFinite { .. } | LayoutError::InvalidMetrics(_)) => {
                DegradationAction::SingleColumn
            }

            Self::Stream(StreamError::MalformedChunk(_) | StreamError::DuplicateSectionId(_)) => {
                DegradationAction::DropChunk
            }
            Self::Stream(StreamError::InvalidTransition { .. }) => DegradationAction::SurfaceStatus,

            Self::RendererLoad(_) => DegradationAction::FallbackRenderer,

            Self::Config(_) => DegradationAction::DefaultConfig,
        }
    }

    /// Error type label for logs.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Layout(_) => "layout",
            Self::Stream(_) => "stream",
            Self::RendererLoad(_) => "renderer_load",
            Self::Config(_) => "config",
        }
    }
}

// ── Display ─────────────────────────────────────────────────────────────

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(err) => write!(f, "layout: {err}"),
            Self::Stream(err) => write!(f, "stream: {err}"),
            Self::RendererLoad(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "config: {err}"),
        }
    }
}

impl fmt::Display for DegradationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FallbackRenderer => write!(f, "fallback_renderer"),
            Self::DropChunk => write!(f, "drop_chunk"),
            Self::EmptyPlaceholder => write!(f, "empty_placeholder"),
            Self::SingleColumn => write!(f, "single_column"),
            Self::SurfaceStatus => write!(f, "surface_status"),
            Self::DefaultConfig => write!(f, "default_config"),
        }
    }
}

// ── std::error::Error ───────────────────────────────────────────────────

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(err) => Some(err),
            Self::Stream(err) => Some(err),
            Self::RendererLoad(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

// ── From conversions ────────────────────────────────────────────────────

impl From<LayoutError> for Error {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err)
    }
}

impl From<StreamError> for Error {
    fn from(err: StreamError) -> Self {
        Self::Stream(err)
    }
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        Self::RendererLoad(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;
    use cardgrid_runtime::StreamStage;

    #[test]
    fn malformed_chunk_is_dropped() {
        let err = Error::from(StreamError::MalformedChunk("EOF while parsing".into()));
        assert_eq!(err.degradation(), DegradationAction::DropChunk);
        assert_eq!(err.error_type(), "stream");
        assert!(format!("{err}").contains("EOF while parsing"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn invalid_transition_surfaces_status() {
        let err = Error::from(StreamError::InvalidTransition {
            from: StreamStage::Complete,
            to: StreamStage::Thinking,
        });
        assert_eq!(err.degradation(), DegradationAction::SurfaceStatus);
        assert!(format!("{err}").contains("complete -> thinking"));
    }

    #[test]
    fn load_failure_uses_fallback_renderer() {
        let err = Error::from(LoadError::failed("map", "no tiles"));
        assert_eq!(err.degradation(), DegradationAction::FallbackRenderer);
        assert!(format!("{err}").contains("map"));
    }

    #[test]
    fn layout_errors_degrade() {
        let negative = Error::from(LayoutError::NegativeHeight {
            id: "s1".into(),
            height: -4.0,
        });
        assert_eq!(negative.degradation(), DegradationAction::EmptyPlaceholder);

        let metrics = Error::from(LayoutError::InvalidMetrics("max_columns must be >= 1".into()));
        assert_eq!(metrics.degradation(), DegradationAction::SingleColumn);
    }

    #[test]
    fn config_error_keeps_defaults() {
        let err = Error::from(ConfigError::Validation(vec!["grid.gap must be >= 0".into()]));
        assert_eq!(err.degradation(), DegradationAction::DefaultConfig);
        assert_eq!(format!("{}", err.degradation()), "default_config");
    }
}
