#![forbid(unsafe_code)]

//! Stagger indices and delays derived from entrance order.
//!
//! Units are grouped into stagger groups (the card's sections, the fields of
//! one section, the items of one section). Within a group a unit's index is
//! its position in *entrance* order, never layout order: if section B
//! finishes streaming before section A, B gets index 0 and A index 1 even
//! when A is placed above B.
//!
//! Every group uses the same linear increment, so
//! `delay = index * increment`.
//!
//! # Invariants
//!
//! 1. Indices within a group are dense: `0, 1, 2, ...` in entrance order.
//! 2. A unit that never entered has no index.
//! 3. [`StaggerSequencer::plan`] is deterministic for a given entrance log.

use std::fmt;
use std::time::Duration;

use rustc_hash::FxHashMap;

/// Default delay between successive units of one group.
pub const DEFAULT_STAGGER_INCREMENT: Duration = Duration::from_millis(40);

/// Identity of one animatable unit of a card.
///
/// Field and item slots are positions within their parent section; merges
/// never reorder or remove slots, so a slot identifies a unit for the whole
/// stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitId {
    Section(String),
    Field { section: String, slot: usize },
    Item { section: String, slot: usize },
}

impl UnitId {
    /// The stagger group this unit belongs to.
    #[must_use]
    pub fn group(&self) -> StaggerGroup {
        match self {
            Self::Section(_) => StaggerGroup::Sections,
            Self::Field { section, .. } => StaggerGroup::Fields(section.clone()),
            Self::Item { section, .. } => StaggerGroup::Items(section.clone()),
        }
    }

    /// Id of the section owning this unit (itself for sections).
    #[must_use]
    pub fn section_id(&self) -> &str {
        match self {
            Self::Section(id) => id,
            Self::Field { section, .. } | Self::Item { section, .. } => section,
        }
    }

    /// The same unit under another section id.
    #[must_use]
    pub fn with_section(&self, section: &str) -> Self {
        match self {
            Self::Section(_) => Self::Section(section.to_string()),
            Self::Field { slot, .. } => Self::Field {
                section: section.to_string(),
                slot: *slot,
            },
            Self::Item { slot, .. } => Self::Item {
                section: section.to_string(),
                slot: *slot,
            },
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Section(id) => write!(f, "{id}"),
            Self::Field { section, slot } => write!(f, "{section}/field/{slot}"),
            Self::Item { section, slot } => write!(f, "{section}/item/{slot}"),
        }
    }
}

/// A set of sibling units that stagger against each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StaggerGroup {
    Sections,
    Fields(String),
    Items(String),
}

/// Index of `unit` among the members of its group in `siblings_in_entered_order`.
///
/// Units of other groups in the slice are skipped, so the full entrance log
/// can be passed directly. Returns `None` when `unit` has not entered.
#[must_use]
pub fn stagger_index(unit: &UnitId, siblings_in_entered_order: &[UnitId]) -> Option<usize> {
    let group = unit.group();
    siblings_in_entered_order
        .iter()
        .filter(|u| u.group() == group)
        .position(|u| u == unit)
}

/// Linear start offsets for `count` units.
#[must_use]
pub fn stagger_offsets(count: usize, increment: Duration) -> Vec<Duration> {
    (0..count)
        .map(|i| increment.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
        .collect()
}

/// The scheduled entrance of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaggerSlot {
    pub unit: UnitId,
    pub index: usize,
    pub delay: Duration,
}

/// Assigns stagger delays from entrance order with one shared increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaggerSequencer {
    increment: Duration,
}

impl Default for StaggerSequencer {
    fn default() -> Self {
        Self::new(DEFAULT_STAGGER_INCREMENT)
    }
}

impl StaggerSequencer {
    #[must_use]
    pub const fn new(increment: Duration) -> Self {
        Self { increment }
    }

    #[must_use]
    pub const fn increment(&self) -> Duration {
        self.increment
    }

    /// Delay for the unit at `index` within its group.
    #[must_use]
    pub fn delay(&self, index: usize) -> Duration {
        self.increment
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Slot for a single unit, or `None` if it has not entered.
    #[must_use]
    pub fn slot(&self, unit: &UnitId, entered: &[UnitId]) -> Option<StaggerSlot> {
        stagger_index(unit, entered).map(|index| StaggerSlot {
            unit: unit.clone(),
            index,
            delay: self.delay(index),
        })
    }

    /// Slots for every unit of an entrance log, in log order.
    ///
    /// Runs in a single pass with one counter per group.
    #[must_use]
    pub fn plan(&self, entered: &[UnitId]) -> Vec<StaggerSlot> {
        let mut counters: FxHashMap<StaggerGroup, usize> = FxHashMap::default();
        entered
            .iter()
            .map(|unit| {
                let counter = counters.entry(unit.group()).or_insert(0);
                let index = *counter;
                *counter += 1;
                StaggerSlot {
                    unit: unit.clone(),
                    index,
                    delay: self.delay(index),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
