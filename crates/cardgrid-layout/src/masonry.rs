#![forbid(unsafe_code)]

//! Greedy shortest-column masonry packing.
//!
//! [`pack`] places variable-height boxes into equal-width columns. Each box
//! spans a contiguous run of columns; it goes to the run whose tallest
//! column is lowest (ties to the leftmost run) and sits just below that
//! tallest column.
//!
//! # Algorithm
//!
//! ```text
//! columns = clamp(floor((W + gap) / (min_col + gap)), 1, max_columns)
//! col_w   = (W - gap * (columns - 1)) / columns
//! for each item in order:
//!     s      = clamp(item.span, 1, columns)
//!     anchor = argmin over a in 0..=columns-s of max(heights[a..a+s])
//!     top    = max(heights[anchor..anchor+s])
//!     heights[anchor..anchor+s] = top + item.height + gap
//! ```
//!
//! # Invariants
//!
//! 1. No two boxes overlap: if their column ranges intersect, their
//!    vertical ranges do not.
//! 2. `left + width <= container_width` for every box (up to float error).
//! 3. Deterministic: identical input yields identical output.
//! 4. Boxes come back in input order, one per item, tagged by id.
//!
//! # Failure Modes
//!
//! - Zero or negative container width: single column of width 0.
//! - Empty input: empty packing.
//! - Span larger than the column count: clamped.
//! - Non-finite numbers, negative heights, or unusable metrics: rejected
//!   with [`LayoutError`] (programmer error, not a runtime condition).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Grid sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMetrics {
    /// Narrowest a column may get before the column count drops.
    pub min_column_width: f64,
    /// Upper bound on the column count.
    pub max_columns: usize,
    /// Horizontal and vertical gap between boxes.
    pub gap: f64,
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            min_column_width: 260.0,
            max_columns: 4,
            gap: 12.0,
        }
    }
}

impl GridMetrics {
    /// Check the metrics are usable. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.min_column_width.is_finite() || self.min_column_width <= 0.0 {
            errors.push(format!(
                "min_column_width must be > 0, got {}",
                self.min_column_width
            ));
        }
        if self.max_columns == 0 {
            errors.push("max_columns must be > 0".into());
        }
        if !self.gap.is_finite() || self.gap < 0.0 {
            errors.push(format!("gap must be >= 0, got {}", self.gap));
        }
        errors
    }

    /// Column count for a container width.
    #[must_use]
    pub fn column_count(&self, container_width: f64) -> usize {
        if container_width.is_nan() || container_width <= 0.0 {
            return 1;
        }
        let fit = ((container_width + self.gap) / (self.min_column_width + self.gap)).floor();
        // `fit` is finite and non-negative here; saturate on absurd widths.
        let fit = if fit >= usize::MAX as f64 {
            usize::MAX
        } else {
            fit as usize
        };
        fit.clamp(1, self.max_columns.max(1))
    }

    /// Width of one column when `columns` columns share `container_width`.
    #[must_use]
    pub fn column_width(&self, container_width: f64, columns: usize) -> f64 {
        let columns = columns.max(1);
        let usable = container_width.max(0.0) - self.gap * (columns - 1) as f64;
        (usable / columns as f64).max(0.0)
    }
}

/// One box to be packed.
#[derive(Debug, Clone, PartialEq)]
pub struct PackItem {
    pub id: String,
    pub column_span: usize,
    pub height: f64,
}

impl PackItem {
    #[must_use]
    pub fn new(id: impl Into<String>, column_span: usize, height: f64) -> Self {
        Self {
            id: id.into(),
            column_span,
            height,
        }
    }
}

/// The computed position of one section. Recomputed on every pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutBox {
    pub id: String,
    /// Columns actually occupied (after clamping).
    pub column_span: usize,
    /// First column of the span.
    pub column: usize,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl LayoutBox {
    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Half-open column range `[column, column + span)`.
    #[must_use]
    pub fn columns(&self) -> std::ops::Range<usize> {
        self.column..self.column + self.column_span
    }

    /// Whether two boxes share a column and a vertical interval.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        let cols = self.columns();
        let other_cols = other.columns();
        let share_column = cols.start < other_cols.end && other_cols.start < cols.end;
        let share_rows = self.top < other.bottom() && other.top < self.bottom();
        share_column && share_rows
    }
}

/// Result of one packing pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Packing {
    pub column_count: usize,
    pub column_width: f64,
    /// Running height of every column, including the trailing gap.
    pub column_heights: Vec<f64>,
    /// One box per input item, in input order.
    pub boxes: Vec<LayoutBox>,
}

impl Packing {
    pub(crate) fn empty(column_count: usize, column_width: f64) -> Self {
        Self {
            column_count,
            column_width,
            column_heights: vec![0.0; column_count],
            boxes: Vec::new(),
        }
    }

    /// Height of the packed content (no trailing gap).
    #[must_use]
    pub fn total_height(&self) -> f64 {
        self.boxes.iter().map(LayoutBox::bottom).fold(0.0, f64::max)
    }

    /// Look up a box by section id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LayoutBox> {
        self.boxes.iter().find(|b| b.id == id)
    }
}

/// Contract violations rejected by [`pack`].
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// A numeric input was NaN or infinite.
    NonFinite { what: &'static str, value: f64 },
    /// A section reported a negative height.
    NegativeHeight { id: String, height: f64 },
    /// Grid metrics failed validation.
    InvalidMetrics(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { what, value } => write!(f, "{what} must be finite, got {value}"),
            Self::NegativeHeight { id, height } => {
                write!(f, "section {id:?} has negative height {height}")
            }
            Self::InvalidMetrics(msg) => write!(f, "invalid grid metrics: {msg}"),
        }
    }
}

impl std::error::Error for LayoutError {}

// ---------------------------------------------------------------------------
// Packing
// ---------------------------------------------------------------------------

fn check_inputs(
    items: &[PackItem],
    container_width: f64,
    metrics: &GridMetrics,
) -> Result<(), LayoutError> {
    if let Some(msg) = metrics.validate().into_iter().next() {
        return Err(LayoutError::InvalidMetrics(msg));
    }
    if !container_width.is_finite() {
        return Err(LayoutError::NonFinite {
            what: "container_width",
            value: container_width,
        });
    }
    for item in items {
        if !item.height.is_finite() {
            return Err(LayoutError::NonFinite {
                what: "height",
                value: item.height,
            });
        }
        if item.height < 0.0 {
            return Err(LayoutError::NegativeHeight {
                id: item.id.clone(),
                height: item.height,
            });
        }
    }
    Ok(())
}

/// Tallest column in `heights[anchor..anchor + span]`.
fn run_max(heights: &[f64], anchor: usize, span: usize) -> f64 {
    heights[anchor..anchor + span]
        .iter()
        .copied()
        .fold(0.0, f64::max)
}

/// Choose the anchor column for a box spanning `span` columns.
fn pick_anchor(heights: &[f64], span: usize) -> (usize, f64) {
    let mut best = (0, run_max(heights, 0, span));
    for anchor in 1..=heights.len() - span {
        let top = run_max(heights, anchor, span);
        if top < best.1 {
            best = (anchor, top);
        }
    }
    best
}

/// Pack `items` in the given order into a grid `container_width` wide.
///
/// Callers wanting priority placement must order `items` first (see
/// [`crate::span::placement_order`]).
pub fn pack(
    items: &[PackItem],
    container_width: f64,
    metrics: &GridMetrics,
) -> Result<Packing, LayoutError> {
    check_inputs(items, container_width, metrics)?;

    let column_count = metrics.column_count(container_width);
    let column_width = metrics.column_width(container_width, column_count);
    let mut packing = Packing::empty(column_count, column_width);
    packing.boxes.reserve(items.len());

    for item in items {
        let span = item.column_span.clamp(1, column_count);
        let (anchor, top) = pick_anchor(&packing.column_heights, span);
        let next = top + item.height + metrics.gap;
        for h in &mut packing.column_heights[anchor..anchor + span] {
            *h = next;
        }
        packing.boxes.push(LayoutBox {
            id: item.id.clone(),
            column_span: span,
            column: anchor,
            left: anchor as f64 * (column_width + metrics.gap),
            top,
            width: span as f64 * column_width + (span - 1) as f64 * metrics.gap,
            height: item.height,
        });
    }

    Ok(packing)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
