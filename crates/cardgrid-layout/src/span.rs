#![forbid(unsafe_code)]

//! Column-span and placement-priority rules.
//!
//! A section's *preferred* span depends only on the section itself (its
//! canonical type, content volume, and an optional explicit `colSpan`
//! hint). The span actually used is the preference clamped to the columns
//! available. Because the preference never looks at the available column
//! count, growing the grid can only keep or widen a span, never shrink it.
//!
//! # Rules
//!
//! | Input | Preference |
//! |-------|------------|
//! | `overview` | full width |
//! | `map` | 2 |
//! | `chart` with more than one series | 2 |
//! | 8+ fields/items | at least 2 |
//! | 16+ fields/items | at least 3 |
//! | `colSpan: n` extension | exactly `n` |
//! | anything else | 1 |
//!
//! Priority is 0 for `overview` sections and 1 otherwise; ordering is a
//! stable sort so equal priorities keep input order.

use cardgrid_core::{CanonicalSectionType, Section, resolve};
use serde_json::Value;

/// Content volume at which a section asks for two columns.
pub const DENSE_TWO_COLUMNS: usize = 8;
/// Content volume at which a section asks for three columns.
pub const DENSE_THREE_COLUMNS: usize = 16;

/// How many columns a section would like, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanHint {
    /// A fixed number of columns (at least 1).
    Columns(usize),
    /// Every available column.
    FullWidth,
}

impl SpanHint {
    /// Clamp the hint to `available` columns. Always in `[1, max(available, 1)]`.
    #[must_use]
    pub fn resolve(self, available: usize) -> usize {
        let available = available.max(1);
        match self {
            Self::Columns(n) => n.clamp(1, available),
            Self::FullWidth => available,
        }
    }
}

fn explicit_hint(section: &Section) -> Option<usize> {
    ["colSpan", "columnSpan"]
        .iter()
        .filter_map(|k| section.extension(k))
        .find_map(Value::as_u64)
        .filter(|&n| n >= 1)
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}

fn series_count(section: &Section) -> usize {
    ["series", "datasets"]
        .iter()
        .filter_map(|k| section.extension(k))
        .filter_map(Value::as_array)
        .map(Vec::len)
        .max()
        .unwrap_or(0)
}

fn is_multi_series(section: &Section) -> bool {
    series_count(section) > 1
        || section
            .extension("multiSeries")
            .and_then(Value::as_bool)
            .unwrap_or(false)
}

/// Preferred span for a section already resolved to `ty`.
#[must_use]
pub fn span_hint_for(section: &Section, ty: CanonicalSectionType) -> SpanHint {
    if let Some(n) = explicit_hint(section) {
        return SpanHint::Columns(n);
    }
    let by_type = match ty {
        CanonicalSectionType::Overview => return SpanHint::FullWidth,
        CanonicalSectionType::Map => 2,
        CanonicalSectionType::Chart if is_multi_series(section) => 2,
        _ => 1,
    };
    let by_density = match section.content_len() {
        n if n >= DENSE_THREE_COLUMNS => 3,
        n if n >= DENSE_TWO_COLUMNS => 2,
        _ => 1,
    };
    SpanHint::Columns(by_type.max(by_density))
}

/// Preferred span, resolving the section type first.
#[must_use]
pub fn span_hint(section: &Section) -> SpanHint {
    span_hint_for(section, resolve(section))
}

/// Columns a section occupies given `available` columns.
#[must_use]
pub fn column_span(section: &Section, available: usize) -> usize {
    span_hint(section).resolve(available)
}

/// Placement priority for a resolved type. Lower is placed first.
#[must_use]
pub fn priority_for(ty: CanonicalSectionType) -> u8 {
    match ty {
        CanonicalSectionType::Overview => 0,
        _ => 1,
    }
}

/// Placement priority for a section.
#[must_use]
pub fn priority(section: &Section) -> u8 {
    priority_for(resolve(section))
}

/// Indices of `priorities` in placement order (stable).
#[must_use]
pub fn placement_order(priorities: &[u8]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..priorities.len()).collect();
    order.sort_by_key(|&i| priorities[i]);
    order
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
