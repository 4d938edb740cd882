#![forbid(unsafe_code)]

//! Stateful masonry grid for one card.
//!
//! [`MasonryGrid`] remembers the inputs of the last packing pass and repacks
//! in full whenever any of them changes:
//!
//! - the container width ([`set_container_width`](MasonryGrid::set_container_width)),
//! - the section set or any section's span/priority ([`set_sections`](MasonryGrid::set_sections)),
//! - any section's measured height (observed through [`Measure`] on every
//!   [`layout`](MasonryGrid::layout) call).
//!
//! There is no incremental patching: a height change in one section can move
//! every box below it, so the whole packing is recomputed.
//!
//! Heights come from an injected [`Measure`] capability so the grid itself
//! never touches a rendering surface. Sections the measurer knows nothing
//! about use [`estimate_height`].

use cardgrid_core::{CanonicalSectionType, Section, resolve};

use crate::masonry::{GridMetrics, LayoutError, PackItem, Packing, pack};
use crate::span::{SpanHint, placement_order, priority_for, span_hint_for};

/// Header allowance in [`estimate_height`].
const HEADER_HEIGHT: f64 = 48.0;
const FIELD_ROW_HEIGHT: f64 = 28.0;
const ITEM_ROW_HEIGHT: f64 = 44.0;
const MIN_SECTION_HEIGHT: f64 = 96.0;

/// Rough height for a section that has not been measured yet.
#[must_use]
pub fn estimate_height(section: &Section) -> f64 {
    let body = section.fields.len() as f64 * FIELD_ROW_HEIGHT
        + section.items.len() as f64 * ITEM_ROW_HEIGHT;
    (HEADER_HEIGHT + body).max(MIN_SECTION_HEIGHT)
}

/// Height lookup for laid-out sections.
pub trait Measure {
    /// Current height of `section_id`, or `None` if unknown.
    fn measure(&self, section_id: &str) -> Option<f64>;
}

impl<F> Measure for F
where
    F: Fn(&str) -> Option<f64>,
{
    fn measure(&self, section_id: &str) -> Option<f64> {
        self(section_id)
    }
}

/// A measurer that knows nothing; every section uses its estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmeasured;

impl Measure for Unmeasured {
    fn measure(&self, _section_id: &str) -> Option<f64> {
        None
    }
}

/// Layout-relevant facts about one section.
#[derive(Debug, Clone, PartialEq)]
pub struct GridEntry {
    pub id: String,
    pub ty: CanonicalSectionType,
    pub span: SpanHint,
    pub priority: u8,
    pub estimated_height: f64,
}

impl GridEntry {
    /// Derive the entry for the section at `index` within its card.
    #[must_use]
    pub fn from_section(section: &Section, index: usize) -> Self {
        let ty = resolve(section);
        Self {
            id: section.key(index),
            ty,
            span: span_hint_for(section, ty),
            priority: priority_for(ty),
            estimated_height: estimate_height(section),
        }
    }
}

/// Full-repack masonry grid with change detection.
#[derive(Debug, Clone)]
pub struct MasonryGrid {
    metrics: GridMetrics,
    container_width: f64,
    entries: Vec<GridEntry>,
    /// Heights used by the last pass, in `entries` order.
    last_heights: Vec<f64>,
    /// Valid only when `dirty` is false.
    packing: Packing,
    dirty: bool,
    generation: u64,
}

impl MasonryGrid {
    #[must_use]
    pub fn new(metrics: GridMetrics, container_width: f64) -> Self {
        Self {
            metrics,
            container_width,
            entries: Vec::new(),
            last_heights: Vec::new(),
            packing: Packing::empty(1, 0.0),
            dirty: true,
            generation: 0,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    #[must_use]
    pub fn entries(&self) -> &[GridEntry] {
        &self.entries
    }

    /// Number of full repacks performed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the next [`layout`](Self::layout) call is known to repack.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the grid metrics.
    pub fn set_metrics(&mut self, metrics: GridMetrics) {
        if self.metrics != metrics {
            self.metrics = metrics;
            self.dirty = true;
        }
    }

    /// Update the container width. Returns whether it changed.
    pub fn set_container_width(&mut self, width: f64) -> bool {
        if self.container_width == width {
            return false;
        }
        self.container_width = width;
        self.dirty = true;
        true
    }

    /// Replace the section set. Returns whether anything layout-relevant changed.
    pub fn set_sections(&mut self, sections: &[Section]) -> bool {
        let entries: Vec<GridEntry> = sections
            .iter()
            .enumerate()
            .map(|(i, s)| GridEntry::from_section(s, i))
            .collect();
        self.set_entries(entries)
    }

    /// Replace the entries directly.
    pub fn set_entries(&mut self, entries: Vec<GridEntry>) -> bool {
        if self.entries == entries {
            return false;
        }
        self.entries = entries;
        self.dirty = true;
        true
    }

    /// Drop the cached packing so the next layout repacks.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// The last packing, if any pass has run.
    #[must_use]
    pub fn packing(&self) -> Option<&Packing> {
        (self.generation > 0).then_some(&self.packing)
    }

    /// Lay out all entries, repacking only when an input changed.
    pub fn layout(&mut self, measure: &dyn Measure) -> Result<&Packing, LayoutError> {
        let heights: Vec<f64> = self
            .entries
            .iter()
            .map(|e| measure.measure(&e.id).unwrap_or(e.estimated_height))
            .collect();

        if self.dirty || heights != self.last_heights {
            self.packing = self.repack(&heights)?;
            self.last_heights = heights;
            self.dirty = false;
        }
        Ok(&self.packing)
    }

    fn repack(&mut self, heights: &[f64]) -> Result<Packing, LayoutError> {
        let columns = self.metrics.column_count(self.container_width);
        let priorities: Vec<u8> = self.entries.iter().map(|e| e.priority).collect();
        let order = placement_order(&priorities);

        let items: Vec<PackItem> = order
            .iter()
            .map(|&i| {
                let entry = &self.entries[i];
                PackItem::new(entry.id.clone(), entry.span.resolve(columns), heights[i])
            })
            .collect();

        let packing = pack(&items, self.container_width, &self.metrics)?;
        self.generation += 1;
        tracing::trace!(
            generation = self.generation,
            columns = packing.column_count,
            sections = items.len(),
            width = self.container_width,
            "masonry repack"
        );
        Ok(packing)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
