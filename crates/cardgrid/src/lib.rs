#![forbid(unsafe_code)]

//! cardgrid public facade crate.
//!
//! Re-exports the common types from the internal crates and offers a small
//! prelude for day-to-day use.
//!
//! ```ignore
//! use cardgrid::prelude::*;
//!
//! let mut ctx = CardContext::new(CardGridConfig::default());
//! ctx.begin_stream()?;
//! ctx.apply_json_chunk(r#"{"cardTitle": "Acme", "sections": []}"#)?;
//! let plan = ctx.render_plan(&Unmeasured)?;
//! ```

pub mod error;

// --- Core re-exports -------------------------------------------------------

pub use cardgrid_core::{
    Action, CanonicalSectionType, Card, Field, FieldValue, Item, Resolution, ResolvedVia,
    ResizeCoalescer, Section, StaggerGroup, StaggerSequencer, StaggerSlot, UnitId,
    is_placeholder_text, resolve, resolve_name, resolve_with_reason,
};

// --- Layout re-exports -----------------------------------------------------

pub use cardgrid_layout::{
    GridEntry, GridMetrics, LayoutBox, MasonryGrid, Measure, PackItem, Packing, SpanHint,
    Unmeasured, column_span, pack, priority,
};

// --- Runtime re-exports ----------------------------------------------------

pub use cardgrid_runtime::{
    CardContext, CardGridConfig, GenericRenderer, MergeOutcome, MergeReport, PlacedSection,
    RenderPlan, RendererHandle, RendererLoader, RendererRegistry, SectionRenderer, StreamStage,
    StreamingSnapshot,
};

// --- Errors ---------------------------------------------------------------

pub use error::{
    ConfigError, DegradationAction, Error, LayoutError, LoadError, Result, StreamError,
};

/// Common imports for cardgrid users.
pub mod prelude {
    pub use crate::{
        Card, CardContext, CardGridConfig, DegradationAction, Error, Field, GridMetrics, Item,
        Measure, RenderPlan, RendererLoader, Result, Section, SectionRenderer, StreamStage,
        Unmeasured,
    };

    pub use crate::{core, layout, runtime};
}

pub use cardgrid_core as core;
pub use cardgrid_layout as layout;
pub use cardgrid_runtime as runtime;
