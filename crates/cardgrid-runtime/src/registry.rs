#![forbid(unsafe_code)]

//! Section renderer registry.
//!
//! Maps section type names to renderer loaders. The map is open: plugins may
//! register names outside [`CanonicalSectionType`](cardgrid_core::CanonicalSectionType)
//! without touching the resolver or the packer.
//!
//! # Invariants
//!
//! - Each name maps to exactly one loader. Registering a name again replaces
//!   the loader (last write wins) and discards the cached handle.
//! - Aliases are resolved before lookup. Registering a name that was an
//!   alias drops the alias.
//! - A loader runs at most once per registration; its outcome is cached.
//!
//! # Failure Modes
//!
//! | Failure | Handle | Logged |
//! |---------|--------|--------|
//! | Loader returns `Err` | `Fallback` | `warn!`, once |
//! | Loader panics | `Fallback` | `warn!`, once |
//! | Deferred worker vanished | `Fallback` | `warn!`, once |
//! | Name never registered | `Fallback` | `debug!` |
//!
//! A failure is never propagated to the caller: rendering a card must not
//! fail because one section's renderer is missing.
//!
//! # Deferred loads
//!
//! [`RendererLoader::deferred`] runs the loader on a worker thread and hands
//! the result back over a channel. Until it arrives the handle is
//! [`RendererHandle::Pending`]; callers render an empty placeholder for that
//! section only and call [`RendererRegistry::poll`] on their next tick.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use cardgrid_core::Section;
use rustc_hash::FxHashMap;

/// Name of the built-in fallback renderer.
pub const FALLBACK_RENDERER: &str = "fallback";

/// A renderer for one kind of section.
pub trait SectionRenderer: Send + Sync {
    /// Stable name, used in logs and plans.
    fn name(&self) -> &str;

    /// Height this renderer expects `section` to take at `width`, if known
    /// before measurement.
    fn estimate_height(&self, _section: &Section, _width: f64) -> Option<f64> {
        None
    }
}

/// Built-in renderer used whenever a type has no working renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRenderer;

impl SectionRenderer for GenericRenderer {
    fn name(&self) -> &str {
        FALLBACK_RENDERER
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a renderer could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The loader reported a failure.
    Failed { name: String, reason: String },
    /// The loader panicked.
    Panicked { name: String, message: String },
    /// A deferred loader's worker exited without a result.
    Disconnected { name: String },
    /// The worker thread could not be started.
    Spawn { name: String, reason: String },
    /// No loader is registered under this name.
    NotRegistered { name: String },
}

impl LoadError {
    /// A loader failure with a reason, for use inside loader closures.
    #[must_use]
    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Failed { name, .. }
            | Self::Panicked { name, .. }
            | Self::Disconnected { name }
            | Self::Spawn { name, .. }
            | Self::NotRegistered { name } => name,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { name, reason } => write!(f, "renderer '{name}' failed to load: {reason}"),
            Self::Panicked { name, message } => {
                write!(f, "renderer '{name}' panicked while loading: {message}")
            }
            Self::Disconnected { name } => {
                write!(f, "renderer '{name}' loader exited without a result")
            }
            Self::Spawn { name, reason } => {
                write!(f, "renderer '{name}' loader thread failed to start: {reason}")
            }
            Self::NotRegistered { name } => write!(f, "no renderer registered for '{name}'"),
        }
    }
}

impl std::error::Error for LoadError {}

/// What a loader produces.
pub type LoadResult = Result<Arc<dyn SectionRenderer>, LoadError>;

type LoaderFn = Arc<dyn Fn() -> LoadResult + Send + Sync>;

// ---------------------------------------------------------------------------
// Loaders / handles
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum LoaderKind {
    Ready(Arc<dyn SectionRenderer>),
    Eager(LoaderFn),
    Deferred(LoaderFn),
}

/// How to obtain the renderer for one name.
#[derive(Clone)]
pub struct RendererLoader {
    kind: LoaderKind,
}

impl RendererLoader {
    /// An already-built renderer.
    pub fn ready(renderer: impl SectionRenderer + 'static) -> Self {
        Self {
            kind: LoaderKind::Ready(Arc::new(renderer)),
        }
    }

    /// A loader run synchronously on first lookup.
    pub fn eager<F>(load: F) -> Self
    where
        F: Fn() -> LoadResult + Send + Sync + 'static,
    {
        Self {
            kind: LoaderKind::Eager(Arc::new(load)),
        }
    }

    /// A loader run on a worker thread; lookups return `Pending` until it ends.
    pub fn deferred<F>(load: F) -> Self
    where
        F: Fn() -> LoadResult + Send + Sync + 'static,
    {
        Self {
            kind: LoaderKind::Deferred(Arc::new(load)),
        }
    }

    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self.kind, LoaderKind::Deferred(_))
    }
}

impl fmt::Debug for RendererLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            LoaderKind::Ready(r) => return write!(f, "RendererLoader::Ready({})", r.name()),
            LoaderKind::Eager(_) => "Eager",
            LoaderKind::Deferred(_) => "Deferred",
        };
        write!(f, "RendererLoader::{kind}")
    }
}

/// Result of a renderer lookup.
#[derive(Clone)]
pub enum RendererHandle {
    Ready(Arc<dyn SectionRenderer>),
    /// A deferred load is still running.
    Pending,
    /// The requested renderer is unavailable; this is the fallback.
    Fallback(Arc<dyn SectionRenderer>),
}

impl RendererHandle {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// The renderer to draw with, if any.
    #[must_use]
    pub fn renderer(&self) -> Option<&Arc<dyn SectionRenderer>> {
        match self {
            Self::Ready(r) | Self::Fallback(r) => Some(r),
            Self::Pending => None,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.renderer().map(|r| r.name())
    }
}

impl fmt::Debug for RendererHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(r) => f.debug_tuple("Ready").field(&r.name()).finish(),
            Self::Pending => f.write_str("Pending"),
            Self::Fallback(r) => f.debug_tuple("Fallback").field(&r.name()).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

enum Slot {
    Ready(Arc<dyn SectionRenderer>),
    Pending(Receiver<LoadResult>),
    Failed,
}

/// Per-card renderer registry and handle cache.
pub struct RendererRegistry {
    loaders: FxHashMap<String, RendererLoader>,
    aliases: FxHashMap<String, String>,
    cache: FxHashMap<String, Slot>,
    fallback: Arc<dyn SectionRenderer>,
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Clones share loaders and aliases but start with an empty cache.
impl Clone for RendererRegistry {
    fn clone(&self) -> Self {
        Self {
            loaders: self.loaders.clone(),
            aliases: self.aliases.clone(),
            cache: FxHashMap::default(),
            fallback: Arc::clone(&self.fallback),
        }
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("names", &self.registered_names())
            .field("cached", &self.cache.len())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl RendererRegistry {
    /// An empty registry with [`GenericRenderer`] as the fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loaders: FxHashMap::default(),
            aliases: FxHashMap::default(),
            cache: FxHashMap::default(),
            fallback: Arc::new(GenericRenderer),
        }
    }

    /// Register `loader` under `name`, reachable also through `aliases`.
    pub fn register(&mut self, name: &str, loader: RendererLoader, aliases: &[&str]) {
        if self.loaders.insert(name.to_string(), loader).is_some() {
            tracing::debug!(renderer = name, "renderer re-registered; last write wins");
        }
        if let Some(target) = self.aliases.remove(name) {
            tracing::debug!(renderer = name, alias_of = %target, "alias replaced by a registered name");
        }
        self.cache.remove(name);
        for alias in aliases {
            if let Some(previous) = self.aliases.insert((*alias).to_string(), name.to_string())
                && previous != name
            {
                tracing::debug!(alias, from = %previous, to = name, "renderer alias re-pointed");
            }
        }
    }

    /// Replace the fallback renderer.
    pub fn set_fallback(&mut self, renderer: impl SectionRenderer + 'static) {
        self.fallback = Arc::new(renderer);
    }

    #[must_use]
    pub fn fallback(&self) -> &Arc<dyn SectionRenderer> {
        &self.fallback
    }

    /// The registered name `name` refers to (itself when not an alias).
    #[must_use]
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map_or(name, String::as_str)
    }

    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.loaders.contains_key(self.canonical_name(name))
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of deferred loads still running.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.cache
            .values()
            .filter(|slot| matches!(slot, Slot::Pending(_)))
            .count()
    }

    /// Forget every cached handle; loaders run again on next lookup.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Look up the renderer for `name`, loading it on first use.
    pub fn get_renderer(&mut self, name: &str) -> RendererHandle {
        let key = self.canonical_name(name).to_string();

        match self.cache.get(&key) {
            Some(Slot::Ready(renderer)) => return RendererHandle::Ready(Arc::clone(renderer)),
            Some(Slot::Failed) => return RendererHandle::Fallback(Arc::clone(&self.fallback)),
            Some(Slot::Pending(rx)) => {
                return match rx.try_recv() {
                    Ok(result) => self.settle(key, result),
                    Err(TryRecvError::Empty) => RendererHandle::Pending,
                    Err(TryRecvError::Disconnected) => {
                        let err = LoadError::Disconnected { name: key.clone() };
                        self.settle(key, Err(err))
                    }
                };
            }
            None => {}
        }

        let Some(loader) = self.loaders.get(&key) else {
            let err = LoadError::NotRegistered { name: key.clone() };
            return self.settle(key, Err(err));
        };

        match loader.kind.clone() {
            LoaderKind::Ready(renderer) => self.settle(key, Ok(renderer)),
            LoaderKind::Eager(load) => {
                let result = run_loader(&key, load.as_ref());
                self.settle(key, result)
            }
            LoaderKind::Deferred(load) => self.spawn_deferred(key, load),
        }
    }

    /// Collect finished deferred loads. Returns the names that settled.
    pub fn poll(&mut self) -> Vec<String> {
        let mut finished = Vec::new();
        for (name, slot) in &self.cache {
            if let Slot::Pending(rx) = slot {
                match rx.try_recv() {
                    Ok(result) => finished.push((name.clone(), result)),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => finished.push((
                        name.clone(),
                        Err(LoadError::Disconnected { name: name.clone() }),
                    )),
                }
            }
        }

        finished.sort_by(|a, b| a.0.cmp(&b.0));
        finished
            .into_iter()
            .map(|(name, result)| {
                self.settle(name.clone(), result);
                name
            })
            .collect()
    }

    fn spawn_deferred(&mut self, key: String, load: LoaderFn) -> RendererHandle {
        let (tx, rx) = mpsc::channel();
        let worker_name = key.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("cardgrid-load-{key}"))
            .spawn(move || {
                // The registry may be gone by the time the load ends.
                let _ = tx.send(run_loader(&worker_name, load.as_ref()));
            });

        match spawned {
            Ok(_) => {
                tracing::debug!(renderer = %key, "deferred renderer load started");
                self.cache.insert(key, Slot::Pending(rx));
                RendererHandle::Pending
            }
            Err(e) => {
                let err = LoadError::Spawn {
                    name: key.clone(),
                    reason: e.to_string(),
                };
                self.settle(key, Err(err))
            }
        }
    }

    fn settle(&mut self, key: String, result: LoadResult) -> RendererHandle {
        match result {
            Ok(renderer) => {
                self.cache.insert(key, Slot::Ready(Arc::clone(&renderer)));
                RendererHandle::Ready(renderer)
            }
            Err(err) => {
                match &err {
                    LoadError::NotRegistered { .. } => {
                        tracing::debug!(renderer = %key, "no renderer registered; using fallback");
                    }
                    _ => tracing::warn!(
                        renderer = %key,
                        error = %err,
                        fallback = self.fallback.name(),
                        "renderer load failed; using fallback"
                    ),
                }
                self.cache.insert(key, Slot::Failed);
                RendererHandle::Fallback(Arc::clone(&self.fallback))
            }
        }
    }
}

fn run_loader(name: &str, load: &(dyn Fn() -> LoadResult + Send + Sync)) -> LoadResult {
    catch_unwind(AssertUnwindSafe(load)).unwrap_or_else(|payload| {
        Err(LoadError::Panicked {
            name: name.to_string(),
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
