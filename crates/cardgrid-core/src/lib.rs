#![forbid(unsafe_code)]

//! Core: card data model, section type resolution, and entrance sequencing.
//!
//! # Role in cardgrid
//! `cardgrid-core` holds the plain data every other crate speaks: cards,
//! sections, fields and items as they arrive from a data source, the closed
//! set of canonical section types, and the pure rules that map one to the
//! other.
//!
//! # Primary responsibilities
//! - **Model**: [`Card`], [`Section`], [`Field`], [`Item`] with serde support
//!   for the card JSON shape, including placeholder detection for values
//!   that are still streaming.
//! - **Resolution**: [`resolve`] maps any section to exactly one
//!   [`CanonicalSectionType`].
//! - **Sequencing**: [`StaggerSequencer`] turns entrance order into stagger
//!   delays.
//! - **Resize coalescing**: [`ResizeCoalescer`] debounces width changes.
//!
//! # How it fits in the system
//! `cardgrid-layout` consumes resolved sections to compute spans and pack
//! them; `cardgrid-runtime` drives streaming merges and owns one context
//! per card. Nothing here performs I/O or holds global state.

pub mod animation;
pub mod model;
pub mod resize_coalescer;
pub mod section_type;

pub use animation::{StaggerGroup, StaggerSequencer, StaggerSlot, UnitId};
pub use model::{Action, Card, Field, FieldValue, Item, Section, is_placeholder_text};
pub use resize_coalescer::ResizeCoalescer;
pub use section_type::{
    CanonicalSectionType, Resolution, ResolvedVia, resolve, resolve_name, resolve_with_reason,
};
