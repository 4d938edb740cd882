#![forbid(unsafe_code)]

//! Card data model.
//!
//! These types mirror the card configuration consumed from an external data
//! source. The same shapes are used for complete cards and for partial
//! chunks arriving while a card is still streaming; any leaf value may hold
//! a placeholder (see [`is_placeholder_text`]) until real content arrives.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "cardTitle": "Acme Corp",
//!   "sections": [
//!     { "id": "s1", "title": "Overview", "type": "overview",
//!       "fields": [{ "label": "Industry", "value": "Manufacturing" }] }
//!   ]
//! }
//! ```
//!
//! Keys that are not part of the common section shape (`series`, `markers`,
//! `colSpan`, ...) are kept verbatim in [`Section::extra`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel strings an upstream producer uses for in-flight leaf values.
const PLACEHOLDERS: [&str; 6] = [
    "streaming…",
    "streaming...",
    "loading…",
    "loading...",
    "…",
    "...",
];

/// Whether `text` is a placeholder rather than real content.
///
/// Empty and whitespace-only strings count as placeholders.
#[must_use]
pub fn is_placeholder_text(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || PLACEHOLDERS
            .iter()
            .any(|p| trimmed.eq_ignore_ascii_case(p))
}

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A leaf value: text, number, or nothing yet.
///
/// Booleans and nested JSON are folded into [`FieldValue::Text`] on ingest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// True for `Null` and for placeholder text.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Number(n) => !n.is_finite(),
            Self::Text(s) => is_placeholder_text(s),
        }
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::Text(s),
            Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Null => Value::Null,
            FieldValue::Number(n) => serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
            FieldValue::Text(s) => Value::String(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// Field / Item
// ---------------------------------------------------------------------------

/// A labelled leaf datum owned by one section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Field {
    /// Create a field with a label and value.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Whether the field holds real (non-placeholder) content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.value.is_placeholder()
    }
}

/// A list-style leaf datum owned by one section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Item {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Whether the title or description carries real content.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !is_placeholder_text(&self.title)
            || self
                .description
                .as_deref()
                .is_some_and(|d| !is_placeholder_text(d))
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// A typed content unit within a card.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    /// Declared type, possibly an alias or missing.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub section_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    /// Type-specific extension attributes (chart series, map markers, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Section {
    /// Create an empty section with a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, section_type: impl Into<String>) -> Self {
        self.section_type = Some(section_type.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The declared id, trimmed. `None` when absent or blank.
    #[must_use]
    pub fn declared_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    /// Identity of the section at `index` within a complete card.
    ///
    /// Uses the declared id when present, otherwise `section-{index}`.
    /// Streamed cards get their keys from the streaming snapshot instead.
    #[must_use]
    pub fn key(&self, index: usize) -> String {
        self.declared_id()
            .map_or_else(|| format!("section-{index}"), str::to_string)
    }

    /// Number of fields plus items.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.fields.len() + self.items.len()
    }

    /// Look up an extension attribute.
    #[must_use]
    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Whether any part of the section carries real content.
    ///
    /// Sections without fields or items count as soon as they carry any
    /// extension attribute.
    #[must_use]
    pub fn has_content(&self) -> bool {
        if self.fields.is_empty() && self.items.is_empty() {
            return self.extra.values().any(|v| !v.is_null());
        }
        self.fields.iter().any(Field::has_content) || self.items.iter().any(Item::has_content)
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A call-to-action attached to a card. Carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub label: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A complete or partial card configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Card {
    #[serde(default, rename = "cardTitle")]
    pub title: String,
    #[serde(default, rename = "cardSubtitle", skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, rename = "cardType", skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Card {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Parse a card (or card chunk) from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder_text(""));
        assert!(is_placeholder_text("   "));
        assert!(is_placeholder_text("Streaming…"));
        assert!(is_placeholder_text(" streaming... "));
        assert!(is_placeholder_text("LOADING..."));
        assert!(!is_placeholder_text("42"));
        assert!(!is_placeholder_text("Streaming services"));
    }

    #[test]
    fn field_value_from_json_scalars() {
        assert_eq!(FieldValue::from(json!(null)), FieldValue::Null);
        assert_eq!(FieldValue::from(json!(3.5)), FieldValue::Number(3.5));
        assert_eq!(FieldValue::from(json!("x")), FieldValue::Text("x".into()));
        assert_eq!(FieldValue::from(json!(true)), FieldValue::Text("true".into()));
    }

    #[test]
    fn parses_card_shape() {
        let card = Card::from_json(
            r#"{
                "cardTitle": "Acme",
                "cardType": "company",
                "sections": [
                    {"id": "s1", "title": "Overview", "type": "overview",
                     "fields": [{"label": "Employees", "value": 120, "trend": "up"}]},
                    {"title": "Offices", "type": "locations", "markers": [{"lat": 1, "lng": 2}]}
                ],
                "actions": [{"label": "Email", "type": "mail", "email": "a@b.c"}]
            }"#,
        )
        .expect("valid card");

        assert_eq!(card.title, "Acme");
        assert_eq!(card.card_type.as_deref(), Some("company"));
        assert_eq!(card.sections.len(), 2);
        assert_eq!(card.sections[0].fields[0].value, FieldValue::Number(120.0));
        assert_eq!(card.sections[0].fields[0].trend.as_deref(), Some("up"));
        assert!(card.sections[1].extension("markers").is_some());
        assert_eq!(card.actions[0].action_type.as_deref(), Some("mail"));
        assert!(card.actions[0].extra.contains_key("email"));
    }

    #[test]
    fn section_key_falls_back_to_position() {
        assert_eq!(Section::new("a").with_id("abc").key(3), "abc");
        assert_eq!(Section::new("a").key(3), "section-3");
        assert_eq!(Section::new("a").with_id("  ").key(0), "section-0");
        assert_eq!(Section::new("a").with_id(" x ").declared_id(), Some("x"));
        assert_eq!(Section::new("a").with_id("").declared_id(), None);
    }

    #[test]
    fn section_content_detection() {
        let pending = Section::new("s").with_field(Field::new("X", "Streaming…"));
        assert!(!pending.has_content());

        let ready = Section::new("s").with_field(Field::new("X", "42"));
        assert!(ready.has_content());

        let chart = Section::new("c").with_extra("series", json!([1, 2, 3]));
        assert!(chart.has_content());

        assert!(!Section::new("empty").has_content());
    }

    #[test]
    fn item_content_uses_title_or_description() {
        assert!(!Item::new("...").has_content());
        let mut item = Item::new("");
        item.description = Some("Shipped v2".into());
        assert!(item.has_content());
    }
}
