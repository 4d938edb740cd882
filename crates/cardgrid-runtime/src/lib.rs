#![forbid(unsafe_code)]

//! cardgrid Runtime
//!
//! This crate ties the core model and the layout engine together into a
//! per-card runtime that can be driven from a UI event loop.
//!
//! # Key Components
//!
//! - [`StreamingSnapshot`] - Merge state machine for progressively streamed cards
//! - [`RendererRegistry`] - Open map from section type to renderer loader
//! - [`CardContext`] - One card's snapshot, registry cache, grid and sequencer
//! - [`RenderPlan`] - Placed sections, renderer handles and stagger delays
//! - [`CardGridConfig`] - Tunables loaded from TOML or JSON
//!
//! # How it fits in the system
//! The runtime is the only stateful layer. `cardgrid-core` supplies the data
//! model and the pure resolution rules; `cardgrid-layout` supplies the
//! packer. The rendering surface feeds chunks, widths and time into a
//! [`CardContext`] and draws whatever [`RenderPlan`] comes back.

pub mod config;
pub mod context;
pub mod registry;
pub mod stream;

pub use config::{CardGridConfig, ConfigError};
pub use context::{CardContext, PlacedSection, RenderPlan};
pub use registry::{
    FALLBACK_RENDERER, GenericRenderer, LoadError, LoadResult, RendererHandle, RendererLoader,
    RendererRegistry, SectionRenderer,
};
pub use stream::{MergeOutcome, MergeReport, StreamError, StreamStage, StreamingSnapshot};
