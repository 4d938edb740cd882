#![forbid(unsafe_code)]

//! Per-card context.
//!
//! [`CardContext`] owns everything one rendered card needs: its streaming
//! snapshot, its renderer registry cache, its masonry grid, a resize
//! coalescer and a stagger sequencer. Nothing is shared between cards, so
//! any number of contexts can live side by side without leaking state.
//!
//! # Usage
//!
//! ```ignore
//! let mut ctx = CardContext::new(CardGridConfig::default());
//! ctx.begin_stream()?;
//! ctx.apply_json_chunk(chunk_text)?;
//! ctx.resize(window_width, Instant::now());
//! if ctx.tick(Instant::now()) {
//!     let plan = ctx.render_plan(&measurer)?;
//!     surface.draw(&plan);
//! }
//! ```
//!
//! The context never draws; it produces a [`RenderPlan`] of placed sections,
//! renderer handles and stagger delays for the rendering surface to play.

use std::time::Duration;

use cardgrid_core::{
    CanonicalSectionType, Card, ResizeCoalescer, ResolvedVia, Section, StaggerSequencer,
    StaggerSlot, UnitId, resolve_with_reason,
};
use cardgrid_layout::{LayoutBox, LayoutError, MasonryGrid, Measure};
use rustc_hash::{FxHashMap, FxHashSet};
use web_time::Instant;

use crate::config::CardGridConfig;
use crate::registry::{RendererHandle, RendererRegistry};
use crate::stream::{MergeOutcome, StreamError, StreamStage, StreamingSnapshot};

/// One section as the surface should draw it.
#[derive(Debug, Clone)]
pub struct PlacedSection {
    pub id: String,
    pub ty: CanonicalSectionType,
    pub layout: LayoutBox,
    /// `Pending` means draw an empty placeholder of `layout`'s size.
    pub renderer: RendererHandle,
    pub entered: bool,
    /// The section's own entrance slot.
    pub stagger: Option<StaggerSlot>,
    /// Entrance slots of the section's fields and items.
    pub unit_stagger: Vec<StaggerSlot>,
}

/// Everything needed to draw one frame of a card.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub stage: StreamStage,
    pub title: String,
    pub subtitle: Option<String>,
    pub column_count: usize,
    pub column_width: f64,
    pub total_height: f64,
    /// Sections in placement order.
    pub sections: Vec<PlacedSection>,
    pub error: Option<String>,
}

impl RenderPlan {
    /// The user-visible status indicator, shown only for failed streams.
    #[must_use]
    pub fn status(&self) -> Option<StreamStage> {
        matches!(self.stage, StreamStage::Aborted | StreamStage::Error).then_some(self.stage)
    }

    #[must_use]
    pub fn section(&self, id: &str) -> Option<&PlacedSection> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// Owner of one card's streaming, layout and animation state.
#[derive(Debug)]
pub struct CardContext {
    config: CardGridConfig,
    snapshot: StreamingSnapshot,
    registry: RendererRegistry,
    grid: MasonryGrid,
    resize: ResizeCoalescer,
    sequencer: StaggerSequencer,
    /// Sections already warned about for an unresolvable type.
    reported_unknown: FxHashSet<String>,
}

impl Default for CardContext {
    fn default() -> Self {
        Self::new(CardGridConfig::default())
    }
}

impl CardContext {
    #[must_use]
    pub fn new(config: CardGridConfig) -> Self {
        Self::with_registry(config, RendererRegistry::new())
    }

    /// A context using a prepared registry (loaders shared, cache fresh).
    #[must_use]
    pub fn with_registry(config: CardGridConfig, registry: RendererRegistry) -> Self {
        Self {
            snapshot: StreamingSnapshot::new(),
            registry,
            grid: MasonryGrid::new(config.grid, config.initial_width),
            resize: ResizeCoalescer::new(config.resize_quiet()),
            sequencer: StaggerSequencer::new(config.stagger_increment()),
            reported_unknown: FxHashSet::default(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &CardGridConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> &StreamingSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub fn stage(&self) -> StreamStage {
        self.snapshot.stage()
    }

    #[must_use]
    pub fn grid(&self) -> &MasonryGrid {
        &self.grid
    }

    #[must_use]
    pub fn registry(&self) -> &RendererRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RendererRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn stagger_increment(&self) -> Duration {
        self.sequencer.increment()
    }

    // -- streaming ---------------------------------------------------------

    pub fn begin_stream(&mut self) -> Result<(), StreamError> {
        self.snapshot.begin()
    }

    /// Merge a parsed chunk.
    pub fn apply_chunk(&mut self, chunk: Card) -> Result<MergeOutcome, StreamError> {
        let outcome = self.snapshot.merge(chunk);
        self.after_merge(outcome)
    }

    /// Parse and merge a JSON chunk.
    pub fn apply_json_chunk(&mut self, text: &str) -> Result<MergeOutcome, StreamError> {
        let outcome = self.snapshot.merge_json(text);
        self.after_merge(outcome)
    }

    pub fn complete_stream(&mut self) -> bool {
        self.snapshot.complete()
    }

    pub fn abort_stream(&mut self) -> bool {
        self.snapshot.abort()
    }

    pub fn fail_stream(&mut self, reason: impl Into<String>) -> bool {
        self.snapshot.fail(reason)
    }

    /// Replace the card wholesale with a complete one.
    pub fn load_card(&mut self, card: Card) {
        self.reset();
        self.snapshot = StreamingSnapshot::from_card(card);
        self.sync_sections();
    }

    /// Back to an empty, idle card. Renderer loaders and width are kept.
    pub fn reset(&mut self) {
        self.snapshot.reset();
        self.reported_unknown.clear();
        self.grid.set_sections(&[]);
    }

    fn after_merge(
        &mut self,
        outcome: Result<MergeOutcome, StreamError>,
    ) -> Result<MergeOutcome, StreamError> {
        match &outcome {
            Ok(MergeOutcome::Merged(_)) => self.sync_sections(),
            Ok(MergeOutcome::Dropped { .. }) => {}
            Err(err) => tracing::debug!(error = %err, stage = %self.stage(), "chunk dropped"),
        }
        outcome
    }

    fn sync_sections(&mut self) {
        let sections: Vec<Section> = self.snapshot.sections().cloned().collect();
        for (index, section) in sections.iter().enumerate() {
            let resolution = resolve_with_reason(section);
            if resolution.via == ResolvedVia::Fallback && section.has_content() {
                let key = section.key(index);
                if !self.reported_unknown.contains(&key) {
                    tracing::warn!(
                        section = %key,
                        declared = section.section_type.as_deref().unwrap_or(""),
                        "unrecognized section type; rendering as fallback"
                    );
                    self.reported_unknown.insert(key);
                }
            }
        }
        self.grid.set_sections(&sections);
    }

    // -- sizing ------------------------------------------------------------

    /// Record a container width observation; applied once it settles.
    pub fn resize(&mut self, width: f64, now: Instant) {
        self.resize.push(width, now);
    }

    /// Apply a width immediately, bypassing debounce.
    pub fn set_container_width(&mut self, width: f64) -> bool {
        self.resize.mark_applied(width);
        self.grid.set_container_width(width)
    }

    /// Advance time. Returns whether the card needs a new render plan.
    pub fn tick(&mut self, now: Instant) -> bool {
        let resized = self
            .resize
            .poll(now)
            .is_some_and(|width| self.grid.set_container_width(width));
        let loaded = !self.registry.poll().is_empty();
        resized || loaded || self.grid.is_dirty()
    }

    /// Settle pending deferred renderer loads. Returns the names that settled.
    pub fn poll_renderers(&mut self) -> Vec<String> {
        self.registry.poll()
    }

    // -- planning ----------------------------------------------------------

    /// Lay out the card and assemble a plan for the surface.
    ///
    /// Heights come from `measure` first, then from each section's renderer
    /// estimate, then from the content-based estimate.
    pub fn render_plan(&mut self, measure: &dyn Measure) -> Result<RenderPlan, LayoutError> {
        let metrics = self.grid.metrics();
        let width = self.grid.container_width();
        let column_width = metrics.column_width(width, metrics.column_count(width));

        let mut handles: FxHashMap<String, RendererHandle> = FxHashMap::default();
        let mut estimates: FxHashMap<String, f64> = FxHashMap::default();
        let entries: Vec<(String, CanonicalSectionType)> = self
            .grid
            .entries()
            .iter()
            .map(|e| (e.id.clone(), e.ty))
            .collect();
        for (id, ty) in &entries {
            let handle = self.registry.get_renderer(ty.as_str());
            if let (Some(renderer), Some(section)) = (handle.renderer(), self.snapshot.section(id))
                && let Some(height) = renderer.estimate_height(section, column_width)
            {
                estimates.insert(id.clone(), height);
            }
            handles.insert(id.clone(), handle);
        }

        let composed = |id: &str| measure.measure(id).or_else(|| estimates.get(id).copied());
        let packing = self.grid.layout(&composed)?.clone();

        let mut section_slots: FxHashMap<String, StaggerSlot> = FxHashMap::default();
        let mut unit_slots: FxHashMap<String, Vec<StaggerSlot>> = FxHashMap::default();
        for slot in self.sequencer.plan(self.snapshot.entered_units()) {
            match &slot.unit {
                UnitId::Section(id) => {
                    section_slots.insert(id.clone(), slot);
                }
                unit => {
                    unit_slots
                        .entry(unit.section_id().to_string())
                        .or_default()
                        .push(slot);
                }
            }
        }

        let types: FxHashMap<String, CanonicalSectionType> = entries.into_iter().collect();
        let sections = packing
            .boxes
            .iter()
            .map(|layout| {
                let id = layout.id.clone();
                PlacedSection {
                    ty: types
                        .get(&id)
                        .copied()
                        .unwrap_or(CanonicalSectionType::Fallback),
                    renderer: handles
                        .remove(&id)
                        .unwrap_or(RendererHandle::Pending),
                    entered: self.snapshot.is_entered(&UnitId::Section(id.clone())),
                    stagger: section_slots.remove(&id),
                    unit_stagger: unit_slots.remove(&id).unwrap_or_default(),
                    layout: layout.clone(),
                    id,
                }
            })
            .collect();

        Ok(RenderPlan {
            stage: self.snapshot.stage(),
            title: self.snapshot.title().to_string(),
            subtitle: self.snapshot.subtitle().map(str::to_string),
            column_count: packing.column_count,
            column_width: packing.column_width,
            total_height: packing.total_height(),
            sections,
            error: self.snapshot.error().map(str::to_string),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
