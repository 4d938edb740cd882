#![forbid(unsafe_code)]

//! Streaming merge state machine.
//!
//! A [`StreamingSnapshot`] accumulates a card that arrives as a sequence of
//! partial chunks. Each chunk has the same shape as a complete [`Card`];
//! sections are matched by id, fields by label and items by title.
//!
//! Sections without an id match an earlier id-less section by title: the
//! same title first, then the one at the same id-less position whose title
//! is unset or a prefix of the other, then an earlier title the incoming one
//! extends. Anything else is a new section, so delta chunks never fold a
//! section into its predecessor. Id-less sections get generated
//! `section-{n}` keys; a generated key never shadows a declared id, and an
//! id-less section is re-keyed if a later chunk declares its key.
//!
//! # Lifecycle
//!
//! ```text
//!  Idle ──begin──▶ Thinking ──merge──▶ Streaming ──complete──▶ Complete
//!    │                │                   │
//!    └──────merge─────┴───────────────────┼──abort──▶ Aborted
//!                                         └──fail───▶ Error
//! ```
//!
//! # Invariants
//!
//! - Merging never removes or reorders a section, field or item. Slots only
//!   grow or have their values updated.
//! - A unit (section, field, item) enters exactly once: the first time it
//!   holds non-placeholder content. Entrances are recorded in a global log
//!   in the order they happened.
//! - A placeholder never overwrites real content.
//! - Once terminal, further chunks are dropped without error and the
//!   content merged so far is kept.
//!
//! # Failure Modes
//!
//! - Unparseable JSON → [`StreamError::MalformedChunk`], snapshot unchanged.
//! - A chunk naming the same section twice → [`StreamError::DuplicateSectionId`],
//!   snapshot unchanged.
//! - Neither error moves the stage to [`StreamStage::Error`]; only an explicit
//!   [`StreamingSnapshot::fail`] from the transport does.

use std::fmt;

use cardgrid_core::{Action, Card, Field, Item, Section, UnitId, is_placeholder_text};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Where a card is in its streaming lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStage {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Request issued, no content yet.
    Thinking,
    /// Partial content is arriving.
    Streaming,
    /// Terminal success.
    Complete,
    /// Terminal, cancelled by the caller.
    Aborted,
    /// Terminal, fatal transport failure.
    Error,
}

impl StreamStage {
    /// Whether no further merges are accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted | Self::Error)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Thinking => "thinking",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for StreamStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors / outcomes
// ---------------------------------------------------------------------------

/// Rejected chunk or lifecycle call. The snapshot is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The chunk text was not a valid card shape.
    MalformedChunk(String),
    /// Two sections in one chunk resolved to the same id.
    DuplicateSectionId(String),
    /// A lifecycle call that the current stage does not allow.
    InvalidTransition { from: StreamStage, to: StreamStage },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedChunk(reason) => write!(f, "malformed chunk: {reason}"),
            Self::DuplicateSectionId(id) => write!(f, "duplicate section id in chunk: {id}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid stream transition: {from} -> {to}")
            }
        }
    }
}

impl std::error::Error for StreamError {}

/// What one merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids of sections first seen in this chunk, in arrival order.
    pub added_sections: Vec<String>,
    /// Units that entered during this merge, in entrance order.
    pub entered: Vec<UnitId>,
}

/// Result of offering a chunk to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged(MergeReport),
    /// The stream was already terminal; the chunk was ignored.
    Dropped { stage: StreamStage },
}

impl MergeOutcome {
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }

    /// Units entered by this merge (empty when dropped).
    #[must_use]
    pub fn entered(&self) -> &[UnitId] {
        match self {
            Self::Merged(report) => &report.entered,
            Self::Dropped { .. } => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct SectionState {
    key: String,
    /// Whether `key` came from the producer rather than being generated.
    declared: bool,
    section: Section,
    entered: bool,
    field_entered: Vec<bool>,
    item_entered: Vec<bool>,
}

impl SectionState {
    fn new(key: String, declared: bool) -> Self {
        Self {
            section: Section {
                id: Some(key.clone()),
                ..Section::default()
            },
            key,
            declared,
            entered: false,
            field_entered: Vec::new(),
            item_entered: Vec::new(),
        }
    }

    /// Record first-time entrances after a merge: section, fields, items.
    fn collect_entrances(&mut self, out: &mut Vec<UnitId>) {
        if !self.entered && self.section.has_content() {
            self.entered = true;
            out.push(UnitId::Section(self.key.clone()));
        }

        self.field_entered.resize(self.section.fields.len(), false);
        for (slot, field) in self.section.fields.iter().enumerate() {
            if !self.field_entered[slot] && field.has_content() {
                self.field_entered[slot] = true;
                out.push(UnitId::Field {
                    section: self.key.clone(),
                    slot,
                });
            }
        }

        self.item_entered.resize(self.section.items.len(), false);
        for (slot, item) in self.section.items.iter().enumerate() {
            if !self.item_entered[slot] && item.has_content() {
                self.item_entered[slot] = true;
                out.push(UnitId::Item {
                    section: self.key.clone(),
                    slot,
                });
            }
        }
    }
}

/// Accumulated view of one card under progressive construction.
#[derive(Debug, Clone, Default)]
pub struct StreamingSnapshot {
    stage: StreamStage,
    title: String,
    subtitle: Option<String>,
    card_type: Option<String>,
    actions: Vec<Action>,
    sections: Vec<SectionState>,
    index: FxHashMap<String, usize>,
    next_generated: usize,
    entered_log: Vec<UnitId>,
    error: Option<String>,
    chunks_merged: u64,
    chunks_dropped: u64,
}

impl StreamingSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot seeded from a complete card and marked complete.
    #[must_use]
    pub fn from_card(card: Card) -> Self {
        let mut snapshot = Self::new();
        // A fresh snapshot is never terminal; only a duplicate id can fail.
        if let Err(err) = snapshot.merge(card) {
            tracing::debug!(error = %err, "card rejected while seeding snapshot");
        }
        snapshot.complete();
        snapshot
    }

    #[must_use]
    pub fn stage(&self) -> StreamStage {
        self.stage
    }

    /// Reason given to [`fail`](Self::fail), if the stream failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref()
    }

    #[must_use]
    pub fn card_type(&self) -> Option<&str> {
        self.card_type.as_deref()
    }

    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Sections in arrival order. Each has its id set to its stable key.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().map(|s| &s.section)
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.index.get(id).map(|&i| &self.sections[i].section)
    }

    /// Every entrance so far, in the order it happened.
    #[must_use]
    pub fn entered_units(&self) -> &[UnitId] {
        &self.entered_log
    }

    #[must_use]
    pub fn is_entered(&self, unit: &UnitId) -> bool {
        let Some(&i) = self.index.get(unit.section_id()) else {
            return false;
        };
        let state = &self.sections[i];
        match unit {
            UnitId::Section(_) => state.entered,
            UnitId::Field { slot, .. } => state.field_entered.get(*slot).copied().unwrap_or(false),
            UnitId::Item { slot, .. } => state.item_entered.get(*slot).copied().unwrap_or(false),
        }
    }

    /// Entered sections over known sections, `0.0` when none are known.
    #[must_use]
    pub fn progress(&self) -> f64 {
        if self.sections.is_empty() {
            return 0.0;
        }
        let entered = self.sections.iter().filter(|s| s.entered).count();
        entered as f64 / self.sections.len() as f64
    }

    #[must_use]
    pub fn chunks_merged(&self) -> u64 {
        self.chunks_merged
    }

    #[must_use]
    pub fn chunks_dropped(&self) -> u64 {
        self.chunks_dropped
    }

    /// The merged card as a plain value.
    #[must_use]
    pub fn card(&self) -> Card {
        Card {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            card_type: self.card_type.clone(),
            sections: self.sections().cloned().collect(),
            actions: self.actions.clone(),
        }
    }

    // -- lifecycle ---------------------------------------------------------

    /// Mark the request as issued. Only valid from [`StreamStage::Idle`].
    pub fn begin(&mut self) -> Result<(), StreamError> {
        if self.stage != StreamStage::Idle {
            return Err(StreamError::InvalidTransition {
                from: self.stage,
                to: StreamStage::Thinking,
            });
        }
        self.stage = StreamStage::Thinking;
        Ok(())
    }

    /// Terminal success. Returns false if already terminal.
    pub fn complete(&mut self) -> bool {
        self.finish(StreamStage::Complete)
    }

    /// Caller cancellation. Content merged so far is kept.
    pub fn abort(&mut self) -> bool {
        self.finish(StreamStage::Aborted)
    }

    /// Fatal transport failure. Content merged so far is kept.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        if !self.finish(StreamStage::Error) {
            return false;
        }
        self.error = Some(reason);
        true
    }

    /// Discard everything and return to [`StreamStage::Idle`].
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn finish(&mut self, stage: StreamStage) -> bool {
        if self.stage.is_terminal() {
            return false;
        }
        self.stage = stage;
        true
    }

    // -- merging -----------------------------------------------------------

    /// Parse a JSON chunk and merge it.
    ///
    /// Chunks offered after a terminal stage are dropped before parsing.
    pub fn merge_json(&mut self, text: &str) -> Result<MergeOutcome, StreamError> {
        if self.stage.is_terminal() {
            return Ok(self.drop_chunk());
        }
        let chunk: Card =
            serde_json::from_str(text).map_err(|e| StreamError::MalformedChunk(e.to_string()))?;
        self.merge(chunk)
    }

    /// Merge one chunk into the snapshot.
    pub fn merge(&mut self, chunk: Card) -> Result<MergeOutcome, StreamError> {
        if self.stage.is_terminal() {
            return Ok(self.drop_chunk());
        }

        let declared: Vec<Option<String>> = chunk
            .sections
            .iter()
            .map(|s| s.declared_id().map(str::to_string))
            .collect();
        let mut reserved = FxHashSet::default();
        for id in declared.iter().flatten() {
            if !reserved.insert(id.clone()) {
                return Err(StreamError::DuplicateSectionId(id.clone()));
            }
        }

        if matches!(self.stage, StreamStage::Idle | StreamStage::Thinking) {
            self.stage = StreamStage::Streaming;
        }

        for id in declared.iter().flatten() {
            if let Some(&i) = self.index.get(id)
                && !self.sections[i].declared
            {
                self.rekey(i, &reserved);
            }
        }

        let Card {
            title,
            subtitle,
            card_type,
            sections,
            actions,
        } = chunk;
        if !is_placeholder_text(&title) {
            self.title = title;
        }
        merge_text(&mut self.subtitle, subtitle);
        merge_text(&mut self.card_type, card_type);
        if !actions.is_empty() {
            self.actions = actions;
        }

        let mut report = MergeReport::default();
        let mut claimed = FxHashSet::default();
        let mut ordinal = 0;
        for (incoming, id) in sections.into_iter().zip(declared) {
            let found = match &id {
                Some(id) => self.index.get(id).copied(),
                None => {
                    ordinal += 1;
                    self.match_anonymous(&incoming.title, ordinal - 1, &claimed)
                }
            };
            let i = match (found, id) {
                (Some(i), _) => i,
                (None, Some(id)) => self.push_section(id, true, &mut report),
                (None, None) => {
                    let key = self.generate_key(&reserved);
                    self.push_section(key, false, &mut report)
                }
            };
            claimed.insert(i);
            let state = &mut self.sections[i];
            merge_section(&mut state.section, incoming);
            state.collect_entrances(&mut report.entered);
        }

        self.entered_log.extend(report.entered.iter().cloned());
        self.chunks_merged += 1;
        Ok(MergeOutcome::Merged(report))
    }

    /// Existing id-less section for the `ordinal`-th id-less section of a chunk.
    fn match_anonymous(
        &self,
        title: &str,
        ordinal: usize,
        claimed: &FxHashSet<usize>,
    ) -> Option<usize> {
        let anonymous: Vec<usize> = (0..self.sections.len())
            .filter(|&i| !self.sections[i].declared)
            .collect();
        let title_of = |i: usize| self.sections[i].section.title.as_str();
        let open = || anonymous.iter().copied().filter(|i| !claimed.contains(i));

        if !is_placeholder_text(title)
            && let Some(i) = open().find(|&i| title_of(i) == title)
        {
            return Some(i);
        }
        if let Some(&i) = anonymous.get(ordinal)
            && !claimed.contains(&i)
            && labels_compatible(title_of(i), title)
        {
            return Some(i);
        }
        open().rev().find(|&i| extends(title_of(i), title))
    }

    fn push_section(&mut self, key: String, declared: bool, report: &mut MergeReport) -> usize {
        let i = self.sections.len();
        self.index.insert(key.clone(), i);
        self.sections.push(SectionState::new(key.clone(), declared));
        report.added_sections.push(key);
        i
    }

    /// Next `section-{n}` key not taken by a known section or by `reserved`.
    fn generate_key(&mut self, reserved: &FxHashSet<String>) -> String {
        loop {
            let key = format!("section-{}", self.next_generated);
            self.next_generated += 1;
            if !self.index.contains_key(&key) && !reserved.contains(&key) {
                return key;
            }
        }
    }

    /// Move an id-less section off a key a producer has now declared.
    fn rekey(&mut self, i: usize, reserved: &FxHashSet<String>) {
        let fresh = self.generate_key(reserved);
        let state = &mut self.sections[i];
        let old = std::mem::replace(&mut state.key, fresh.clone());
        state.section.id = Some(fresh.clone());
        self.index.remove(&old);
        self.index.insert(fresh.clone(), i);
        for unit in &mut self.entered_log {
            if unit.section_id() == old {
                *unit = unit.with_section(&fresh);
            }
        }
        tracing::debug!(from = %old, to = %fresh, "id-less section re-keyed for a declared id");
    }

    fn drop_chunk(&mut self) -> MergeOutcome {
        self.chunks_dropped += 1;
        tracing::debug!(stage = %self.stage, "chunk dropped after terminal stage");
        MergeOutcome::Dropped { stage: self.stage }
    }
}

// ---------------------------------------------------------------------------
// Merge rules
// ---------------------------------------------------------------------------

/// Take `src` unless it is a placeholder replacing real text.
fn merge_text(dst: &mut Option<String>, src: Option<String>) {
    let Some(src) = src else { return };
    if !is_placeholder_text(&src) || dst.as_deref().is_none_or(is_placeholder_text) {
        *dst = Some(src);
    }
}

fn merge_map(dst: &mut Map<String, Value>, src: Map<String, Value>) {
    for (key, value) in src {
        if value.is_null() {
            continue;
        }
        let stale = value.as_str().is_some_and(is_placeholder_text) && dst.contains_key(&key);
        if !stale {
            dst.insert(key, value);
        }
    }
}

fn merge_section(dst: &mut Section, src: Section) {
    let Section {
        id: _,
        title,
        section_type,
        fields,
        items,
        extra,
    } = src;
    merge_label(&mut dst.title, title);
    merge_text(&mut dst.section_type, section_type);
    merge_slots(&mut dst.fields, fields, |f| f.label.as_str(), merge_field);
    merge_slots(&mut dst.items, items, |i| i.title.as_str(), merge_item);
    merge_map(&mut dst.extra, extra);
}

/// Take `src` as a label unless it is a placeholder over a real label or a
/// stale prefix of the current one.
fn merge_label(dst: &mut String, src: String) {
    let keep = if is_placeholder_text(&src) {
        !is_placeholder_text(dst)
    } else {
        !is_placeholder_text(dst) && dst.starts_with(src.as_str())
    };
    if !keep {
        *dst = src;
    }
}

/// Whether two labels can name the same slot: one is unset, or one extends
/// the other as it streams in token by token.
fn labels_compatible(existing: &str, incoming: &str) -> bool {
    is_placeholder_text(existing)
        || is_placeholder_text(incoming)
        || incoming.starts_with(existing)
        || existing.starts_with(incoming)
}

/// Whether `incoming` is a longer version of the real label `existing`.
fn extends(existing: &str, incoming: &str) -> bool {
    !is_placeholder_text(existing)
        && incoming.len() > existing.len()
        && incoming.starts_with(existing)
}

/// Match incoming slots to existing ones by key, then by position.
///
/// A slot matches the first unclaimed existing slot with the same key, or
/// else its positional slot when the two keys are compatible (either unset,
/// or one a prefix of the other). Anything unmatched is appended.
fn merge_slots<T>(
    dst: &mut Vec<T>,
    src: Vec<T>,
    key: impl Fn(&T) -> &str,
    update: impl Fn(&mut T, T),
) {
    let mut claimed = vec![false; dst.len()];
    for (pos, incoming) in src.into_iter().enumerate() {
        let incoming_key = key(&incoming);
        let by_key = if is_placeholder_text(incoming_key) {
            None
        } else {
            dst.iter()
                .enumerate()
                .position(|(i, existing)| !claimed[i] && key(existing) == incoming_key)
        };
        let by_position = || {
            let existing = dst.get(pos).filter(|_| !claimed[pos])?;
            labels_compatible(key(existing), incoming_key).then_some(pos)
        };

        match by_key.or_else(by_position) {
            Some(i) => {
                update(&mut dst[i], incoming);
                claimed[i] = true;
            }
            None => {
                dst.push(incoming);
                claimed.push(true);
            }
        }
    }
}

fn merge_field(dst: &mut Field, src: Field) {
    merge_label(&mut dst.label, src.label);
    if !src.value.is_placeholder() || dst.value.is_placeholder() {
        dst.value = src.value;
    }
    merge_text(&mut dst.trend, src.trend);
    if src.percentage.is_some_and(f64::is_finite) {
        dst.percentage = src.percentage;
    }
    merge_text(&mut dst.performance, src.performance);
    merge_text(&mut dst.icon, src.icon);
}

fn merge_item(dst: &mut Item, src: Item) {
    merge_label(&mut dst.title, src.title);
    merge_text(&mut dst.description, src.description);
    merge_text(&mut dst.status, src.status);
    merge_text(&mut dst.date, src.date);
    merge_map(&mut dst.meta, src.meta);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(sections: Vec<Section>) -> Card {
        Card {
            sections,
            ..Card::default()
        }
    }

    fn merged(outcome: Result<MergeOutcome, StreamError>) -> MergeReport {
        match outcome.unwrap() {
            MergeOutcome::Merged(report) => report,
            MergeOutcome::Dropped { stage } => panic!("dropped in {stage}"),
        }
    }

    #[test]
    fn placeholder_does_not_enter() {
        let mut snap = StreamingSnapshot::new();
        snap.begin().unwrap();

        let first = merged(snap.merge(chunk(vec![
            Section::new("Stats")
                .with_id("s1")
                .with_field(Field::new("X", "Streaming…")),
        ])));
        assert_eq!(first.added_sections, vec!["s1"]);
        assert!(first.entered.is_empty());
        assert_eq!(snap.stage(), StreamStage::Streaming);

        let second = merged(snap.merge(chunk(vec![
            Section::new("Stats").with_id("s1").with_field(Field::new("X", "42")),
        ])));
        assert_eq!(
            second.entered,
            vec![
                UnitId::Section("s1".into()),
                UnitId::Field {
                    section: "s1".into(),
                    slot: 0
                },
            ]
        );
        assert_eq!(snap.section("s1").unwrap().fields[0].value.as_text(), Some("42"));
    }

    #[test]
    fn entrance_happens_once() {
        let mut snap = StreamingSnapshot::new();
        let s = || Section::new("A").with_id("a").with_field(Field::new("k", "v"));
        assert_eq!(merged(snap.merge(chunk(vec![s()]))).entered.len(), 2);
        assert!(merged(snap.merge(chunk(vec![s()]))).entered.is_empty());
        let updated = Section::new("A").with_id("a").with_field(Field::new("k", "w"));
        assert!(merged(snap.merge(chunk(vec![updated]))).entered.is_empty());
        assert_eq!(snap.entered_units().len(), 2);
    }

    #[test]
    fn placeholder_never_overwrites_content() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![
            Section::new("A").with_id("a").with_field(Field::new("k", "real")),
        ]))
        .unwrap();
        snap.merge(chunk(vec![
            Section::new("…").with_id("a").with_field(Field::new("k", "loading...")),
        ]))
        .unwrap();
        let section = snap.section("a").unwrap();
        assert_eq!(section.title, "A");
        assert_eq!(section.fields[0].value.as_text(), Some("real"));
    }

    #[test]
    fn fields_match_by_label_then_position() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![
            Section::new("A")
                .with_id("a")
                .with_field(Field::new("one", 1.0))
                .with_field(Field::new("", "…")),
        ]))
        .unwrap();
        // The unlabeled slot picks up its label by position.
        snap.merge(chunk(vec![
            Section::new("A")
                .with_id("a")
                .with_field(Field::new("one", 11.0))
                .with_field(Field::new("two", 2.0))
                .with_field(Field::new("three", 3.0)),
        ]))
        .unwrap();
        // Reordered labels still match their own slots.
        snap.merge(chunk(vec![
            Section::new("A")
                .with_id("a")
                .with_field(Field::new("three", 33.0))
                .with_field(Field::new("one", 111.0)),
        ]))
        .unwrap();

        let fields = &snap.section("a").unwrap().fields;
        let labels: Vec<&str> = fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["one", "two", "three"]);
        assert_eq!(fields[0].value, cardgrid_core::FieldValue::Number(111.0));
        assert_eq!(fields[2].value, cardgrid_core::FieldValue::Number(33.0));
    }

    #[test]
    fn items_merge_by_title() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![
            Section::new("News").with_id("n").with_item(Item::new("Launch")),
        ]))
        .unwrap();
        let mut update = Item::new("Launch");
        update.date = Some("2024-01-01".into());
        snap.merge(chunk(vec![
            Section::new("News")
                .with_id("n")
                .with_item(Item::new("Hiring"))
                .with_item(update),
        ]))
        .unwrap();
        let items = &snap.section("n").unwrap().items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Launch");
        assert_eq!(items[0].date.as_deref(), Some("2024-01-01"));
        assert_eq!(items[1].title, "Hiring");
    }

    #[test]
    fn cumulative_sections_without_ids_match_by_title() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![Section::new("First")])).unwrap();
        snap.merge(chunk(vec![
            Section::new("First").with_field(Field::new("k", "v")),
            Section::new("Second"),
        ]))
        .unwrap();
        let ids: Vec<_> = snap.sections().map(|s| s.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["section-0", "section-1"]);
        assert!(snap.is_entered(&UnitId::Section("section-0".into())));
    }

    #[test]
    fn delta_sections_without_ids_stay_separate() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![
            Section::new("Overview").with_field(Field::new("a", 1.0)),
        ]))
        .unwrap();
        snap.merge(chunk(vec![
            Section::new("News").with_field(Field::new("b", 2.0)),
        ]))
        .unwrap();

        let card = snap.card();
        let titles: Vec<&str> = card.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Overview", "News"]);
        assert_eq!(card.sections[0].fields.len(), 1);
        assert_eq!(card.sections[0].fields[0].label, "a");
        assert_eq!(card.sections[1].fields[0].label, "b");
    }

    #[test]
    fn growing_section_title_keeps_one_section() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![Section::new("Over")])).unwrap();
        snap.merge(chunk(vec![Section::new("Overview")])).unwrap();
        snap.merge(chunk(vec![Section::new("Ne")])).unwrap();
        // A delta chunk still finds the section its title grew from.
        snap.merge(chunk(vec![Section::new("News")])).unwrap();

        let titles: Vec<String> = snap.sections().map(|s| s.title.clone()).collect();
        assert_eq!(titles, vec!["Overview", "News"]);
    }

    #[test]
    fn growing_field_label_keeps_one_slot() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![
            Section::new("S").with_id("s").with_field(Field::new("Rev", "…")),
        ]))
        .unwrap();
        snap.merge(chunk(vec![
            Section::new("S").with_id("s").with_field(Field::new("Revenue", "10")),
        ]))
        .unwrap();
        // A stale shorter label does not shrink the slot back.
        snap.merge(chunk(vec![
            Section::new("S").with_id("s").with_field(Field::new("Rev", "…")),
        ]))
        .unwrap();

        let fields = &snap.section("s").unwrap().fields;
        let labels: Vec<&str> = fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Revenue"]);
        assert_eq!(fields[0].value.as_text(), Some("10"));
        assert_eq!(snap.entered_units().len(), 2);
    }

    #[test]
    fn generated_keys_avoid_declared_ids() {
        let mut snap = StreamingSnapshot::new();
        let report = merged(snap.merge(chunk(vec![
            Section::new("A").with_id("section-1"),
            Section::new("B"),
        ])));
        assert_eq!(report.added_sections, vec!["section-1", "section-0"]);
        assert_eq!(snap.section("section-1").unwrap().title, "A");
        assert_eq!(snap.section("section-0").unwrap().title, "B");
    }

    #[test]
    fn declared_id_takes_over_generated_key() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![
            Section::new("A").with_field(Field::new("k", "v")),
        ]))
        .unwrap();
        assert!(snap.section("section-0").is_some());

        snap.merge(chunk(vec![
            Section::new("B").with_id("section-0").with_field(Field::new("k", "w")),
        ]))
        .unwrap();

        assert_eq!(snap.section_count(), 2);
        assert_eq!(snap.section("section-0").unwrap().title, "B");
        assert_eq!(snap.section("section-1").unwrap().title, "A");
        assert!(snap.is_entered(&UnitId::Section("section-1".into())));
        let sections_entered: Vec<&UnitId> = snap
            .entered_units()
            .iter()
            .filter(|u| matches!(u, UnitId::Section(_)))
            .collect();
        assert_eq!(
            sections_entered,
            vec![
                &UnitId::Section("section-1".into()),
                &UnitId::Section("section-0".into())
            ]
        );
    }

    #[test]
    fn payload_less_section_enters_on_extension() {
        let mut snap = StreamingSnapshot::new();
        let report = merged(snap.merge(chunk(vec![
            Section::new("Where")
                .with_id("m")
                .with_type("map")
                .with_extra("markers", json!([{"lat": 1.0, "lng": 2.0}])),
        ])));
        assert_eq!(report.entered, vec![UnitId::Section("m".into())]);
    }

    #[test]
    fn duplicate_ids_drop_whole_chunk() {
        let mut snap = StreamingSnapshot::new();
        let err = snap
            .merge(chunk(vec![
                Section::new("A").with_id("x"),
                Section::new("B").with_id("x"),
            ]))
            .unwrap_err();
        assert_eq!(err, StreamError::DuplicateSectionId("x".into()));
        assert_eq!(snap.section_count(), 0);
        assert_eq!(snap.stage(), StreamStage::Idle);
    }

    #[test]
    fn malformed_json_leaves_snapshot_alone() {
        let mut snap = StreamingSnapshot::new();
        snap.begin().unwrap();
        snap.merge_json(r#"{"cardTitle": "Acme", "sections": [{"id": "a"}]}"#)
            .unwrap();
        let before = snap.card();

        let err = snap.merge_json(r#"{"sections": [{"id": "#).unwrap_err();
        assert!(matches!(err, StreamError::MalformedChunk(_)));
        assert_eq!(snap.card(), before);
        assert_eq!(snap.stage(), StreamStage::Streaming);
    }

    #[test]
    fn abort_keeps_content_and_drops_late_chunks() {
        let mut snap = StreamingSnapshot::new();
        snap.merge(chunk(vec![
            Section::new("A").with_id("a").with_field(Field::new("k", "v")),
        ]))
        .unwrap();
        assert!(snap.abort());
        assert!(!snap.complete());

        let late = snap
            .merge(chunk(vec![Section::new("B").with_id("b")]))
            .unwrap();
        assert_eq!(
            late,
            MergeOutcome::Dropped {
                stage: StreamStage::Aborted
            }
        );
        assert!(snap.merge_json("not json").unwrap().is_dropped());
        assert_eq!(snap.section_count(), 1);
        assert_eq!(snap.chunks_dropped(), 2);
        assert!(snap.is_entered(&UnitId::Section("a".into())));
    }

    #[test]
    fn lifecycle_transitions() {
        let mut snap = StreamingSnapshot::new();
        snap.begin().unwrap();
        assert_eq!(
            snap.begin(),
            Err(StreamError::InvalidTransition {
                from: StreamStage::Thinking,
                to: StreamStage::Thinking
            })
        );
        assert!(snap.fail("connection reset"));
        assert_eq!(snap.stage(), StreamStage::Error);
        assert_eq!(snap.error(), Some("connection reset"));
        assert!(!snap.fail("again"));

        snap.reset();
        assert_eq!(snap.stage(), StreamStage::Idle);
        assert!(snap.error().is_none());
        assert!(snap.entered_units().is_empty());
    }

    #[test]
    fn card_level_fields_latest_non_empty_wins() {
        let mut snap = StreamingSnapshot::new();
        snap.merge_json(r#"{"cardTitle": "Acme", "cardSubtitle": "Corp"}"#)
            .unwrap();
        snap.merge_json(r#"{"cardTitle": "", "cardSubtitle": "Streaming…", "cardType": "company"}"#)
            .unwrap();
        assert_eq!(snap.title(), "Acme");
        assert_eq!(snap.subtitle(), Some("Corp"));
        assert_eq!(snap.card_type(), Some("company"));
    }

    #[test]
    fn progress_counts_entered_sections() {
        let mut snap = StreamingSnapshot::new();
        assert_eq!(snap.progress(), 0.0);
        snap.merge(chunk(vec![
            Section::new("A").with_id("a").with_field(Field::new("k", "v")),
            Section::new("B").with_id("b").with_field(Field::new("k", "…")),
        ]))
        .unwrap();
        assert_eq!(snap.progress(), 0.5);
    }

    #[test]
    fn from_card_is_complete() {
        let card = Card::new("Acme").with_section(Section::new("A").with_field(Field::new("k", "v")));
        let snap = StreamingSnapshot::from_card(card);
        assert_eq!(snap.stage(), StreamStage::Complete);
        assert_eq!(snap.progress(), 1.0);
    }
}
