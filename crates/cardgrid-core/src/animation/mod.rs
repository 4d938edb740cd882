#![forbid(unsafe_code)]

//! Entrance animation sequencing.
//!
//! The core never plays animations. It only decides *when* each content
//! unit should start entering, expressed as a stagger index and delay; the
//! rendering surface owns timing curves and playback.

pub mod stagger;

pub use stagger::{
    DEFAULT_STAGGER_INCREMENT, StaggerGroup, StaggerSequencer, StaggerSlot, UnitId,
    stagger_index, stagger_offsets,
};
