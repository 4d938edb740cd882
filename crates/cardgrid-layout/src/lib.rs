#![forbid(unsafe_code)]

//! Column spans and masonry packing.
//!
//! - [`span`]: preferred column span and placement priority per section.
//! - [`masonry`]: the pure packing function [`pack`].
//! - [`grid`]: [`MasonryGrid`], the per-card stateful wrapper that decides
//!   when to repack.
//!
//! Everything here is headless: inputs are plain data and heights arrive
//! through the [`Measure`] capability.

pub mod grid;
pub mod masonry;
pub mod span;

pub use cardgrid_core::{CanonicalSectionType, Section};
pub use grid::{GridEntry, MasonryGrid, Measure, Unmeasured, estimate_height};
pub use masonry::{GridMetrics, LayoutBox, LayoutError, PackItem, Packing, pack};
pub use span::{SpanHint, column_span, placement_order, priority, span_hint, span_hint_for};
