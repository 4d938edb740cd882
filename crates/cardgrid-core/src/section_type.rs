#![forbid(unsafe_code)]

//! Canonical section types and the section type resolver.
//!
//! Every [`Section`] resolves to exactly one [`CanonicalSectionType`]. The
//! resolver is pure and total: identical input always yields the identical
//! type, and unknown input yields [`CanonicalSectionType::Fallback`] rather
//! than an error. Layout calls it on every pass, so it allocates only when
//! normalizing a declared type string.
//!
//! # Resolution order
//!
//! 1. Declared type is a known alias → the alias target.
//! 2. Declared type is already canonical → unchanged.
//! 3. Declared type missing or unknown → title keywords, then content shape.
//! 4. Nothing matched → `Fallback`.
//!
//! Step 3 is best-effort. Title keywords can misclassify a section whose
//! title merely happens to contain a keyword; it exists for legacy and
//! incomplete input and is never consulted when the declared type is known.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Section;

/// The closed set of section categories understood by layout and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalSectionType {
    Info,
    Analytics,
    ContactCard,
    NetworkCard,
    Map,
    Chart,
    Event,
    List,
    Product,
    Solutions,
    Overview,
    Quotation,
    TextReference,
    BrandColors,
    News,
    SocialMedia,
    Fallback,
}

impl CanonicalSectionType {
    /// All canonical types in declaration order.
    pub const ALL: [Self; 17] = [
        Self::Info,
        Self::Analytics,
        Self::ContactCard,
        Self::NetworkCard,
        Self::Map,
        Self::Chart,
        Self::Event,
        Self::List,
        Self::Product,
        Self::Solutions,
        Self::Overview,
        Self::Quotation,
        Self::TextReference,
        Self::BrandColors,
        Self::News,
        Self::SocialMedia,
        Self::Fallback,
    ];

    /// Canonical kebab-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Analytics => "analytics",
            Self::ContactCard => "contact-card",
            Self::NetworkCard => "network-card",
            Self::Map => "map",
            Self::Chart => "chart",
            Self::Event => "event",
            Self::List => "list",
            Self::Product => "product",
            Self::Solutions => "solutions",
            Self::Overview => "overview",
            Self::Quotation => "quotation",
            Self::TextReference => "text-reference",
            Self::BrandColors => "brand-colors",
            Self::News => "news",
            Self::SocialMedia => "social-media",
            Self::Fallback => "fallback",
        }
    }

    /// Types that lay out wider than one column when space allows.
    #[must_use]
    pub const fn is_wide(self) -> bool {
        matches!(self, Self::Overview | Self::Map | Self::Chart)
    }

    /// Map a normalized alias to its canonical type.
    fn from_alias(name: &str) -> Option<Self> {
        let ty = match name {
            "timeline" | "events" => Self::Event,
            "metrics" | "stats" | "kpi" | "kpis" => Self::Analytics,
            "table" => Self::List,
            "locations" | "location" => Self::Map,
            "quote" => Self::Quotation,
            "reference" | "references" | "text-ref" => Self::TextReference,
            "contact" | "contacts" => Self::ContactCard,
            "network" => Self::NetworkCard,
            "products" => Self::Product,
            "solution" => Self::Solutions,
            "graph" => Self::Chart,
            "brand" | "colors" => Self::BrandColors,
            "social" => Self::SocialMedia,
            "summary" => Self::Overview,
            "info-card" | "details" => Self::Info,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for CanonicalSectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for strings that are not a canonical type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSectionType(pub String);

impl fmt::Display for UnknownSectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown section type: {:?}", self.0)
    }
}

impl std::error::Error for UnknownSectionType {}

impl FromStr for CanonicalSectionType {
    type Err = UnknownSectionType;

    /// Parse an exact canonical name (no aliases, no normalization).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| UnknownSectionType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Which rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedVia {
    Alias,
    Canonical,
    TitleHeuristic,
    ContentHeuristic,
    Fallback,
}

/// A resolved type together with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub ty: CanonicalSectionType,
    pub via: ResolvedVia,
}

/// Title keywords in match order. First hit wins.
const TITLE_RULES: &[(&[&str], CanonicalSectionType)] = &[
    (&["overview", "summary"], CanonicalSectionType::Overview),
    (&["timeline", "history", "milestone"], CanonicalSectionType::Event),
    (&["contact", "team", "people"], CanonicalSectionType::ContactCard),
    (&["location", "office", "map"], CanonicalSectionType::Map),
    (&["chart", "trend", "graph"], CanonicalSectionType::Chart),
    (
        &["analytics", "metric", "kpi", "performance"],
        CanonicalSectionType::Analytics,
    ),
    (&["news", "press"], CanonicalSectionType::News),
    (&["product"], CanonicalSectionType::Product),
    (&["solution", "service"], CanonicalSectionType::Solutions),
    (&["quote", "quotation", "pricing"], CanonicalSectionType::Quotation),
    (&["social"], CanonicalSectionType::SocialMedia),
    (&["brand", "color"], CanonicalSectionType::BrandColors),
    (&["reference", "source"], CanonicalSectionType::TextReference),
];

/// Lowercase, trim, and fold `_` and spaces into `-`.
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

fn from_title(title: &str) -> Option<CanonicalSectionType> {
    let title = title.to_lowercase();
    TITLE_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| title.contains(k)))
        .map(|&(_, ty)| ty)
}

fn from_content(section: &Section) -> Option<CanonicalSectionType> {
    if ["markers", "locations"]
        .iter()
        .any(|k| section.extra.contains_key(*k))
    {
        return Some(CanonicalSectionType::Map);
    }
    if ["series", "chartData"]
        .iter()
        .any(|k| section.extra.contains_key(*k))
    {
        return Some(CanonicalSectionType::Chart);
    }
    if section.fields.is_empty() && !section.items.is_empty() {
        return Some(CanonicalSectionType::List);
    }
    None
}

/// Resolve a section and report which rule decided.
#[must_use]
pub fn resolve_with_reason(section: &Section) -> Resolution {
    if let Some(declared) = section.section_type.as_deref() {
        let name = normalize(declared);
        if let Some(ty) = CanonicalSectionType::from_alias(&name) {
            return Resolution {
                ty,
                via: ResolvedVia::Alias,
            };
        }
        if let Ok(ty) = name.parse::<CanonicalSectionType>() {
            return Resolution {
                ty,
                via: ResolvedVia::Canonical,
            };
        }
    }
    if let Some(ty) = from_title(&section.title) {
        return Resolution {
            ty,
            via: ResolvedVia::TitleHeuristic,
        };
    }
    if let Some(ty) = from_content(section) {
        return Resolution {
            ty,
            via: ResolvedVia::ContentHeuristic,
        };
    }
    Resolution {
        ty: CanonicalSectionType::Fallback,
        via: ResolvedVia::Fallback,
    }
}

/// Resolve a section to its canonical type.
#[must_use]
pub fn resolve(section: &Section) -> CanonicalSectionType {
    resolve_with_reason(section).ty
}

/// Resolve a bare declared type string (no title or content heuristics).
#[must_use]
pub fn resolve_name(declared: &str) -> CanonicalSectionType {
    let name = normalize(declared);
    CanonicalSectionType::from_alias(&name)
        .or_else(|| name.parse().ok())
        .unwrap_or(CanonicalSectionType::Fallback)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
