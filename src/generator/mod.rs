//! Virtual resources produced on the fly.
//!
//! A member path such as `messages:i18n/app` or `css/theme.less` is not
//! read from disk as-is; a [`Generator`] selected by a [`Resolver`] produces
//! its content. Generators are built from named factories and wired by the
//! [`GeneratorRegistry`] according to the capabilities they declare.

pub mod builtin;
mod cached;
mod registry;
mod resolver;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use cached::{FilePathMapping, GENERATOR_CACHE_DIR, GeneratorCache, cache_key};
pub use registry::{GeneratorEnv, GeneratorRegistries, GeneratorRegistry, Resolution};
pub use resolver::Resolver;

use crate::core::{Mode, ResourceType, Result};
use crate::resource::ResourceReader;
use crate::variant::{VariantMap, VariantSpace};

/// Optional behavior a generator opts into.
///
/// The registry probes this list when instantiating a generator: it injects
/// the matching [`Injection`]s, calls the post-init hook, and records
/// life-cycle listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Receives [`Injection::Type`].
    TypeAware,
    /// Receives [`Injection::Reader`].
    ReaderAware,
    /// Receives [`Injection::Classpath`].
    ClasspathAware,
    /// Receives [`Injection::WorkingDir`].
    WorkingDirAware,
    /// [`Generator::after_properties_set`] runs once after all injections.
    PostInit,
    /// Notified around every bundling pass.
    LifeCycle,
    /// Declares variants through [`Generator::available_variants`].
    VariantProvider,
    /// Generated stylesheets handle their own image references.
    CssImage,
    /// Produces binary content.
    Binary,
}

/// A dependency handed to a generator at registration.
pub enum Injection<'a> {
    Type(ResourceType),
    Reader(Arc<dyn ResourceReader>),
    Classpath(&'a [PathBuf]),
    WorkingDir { dir: &'a Path, use_cache: bool },
}

/// Everything a generator needs to produce one resource.
pub struct GeneratorContext<'a> {
    /// Path with the resolver's prefix stripped.
    pub path: &'a str,
    /// Path as configured in the bundle.
    pub full_path: &'a str,
    pub variants: &'a VariantMap,
    pub mode: Mode,
    /// Reader the resource is read from. Chained generators get the reader
    /// of the generator in front of them.
    pub reader: &'a dyn ResourceReader,
    /// Generator matched by the remainder of a prefixed path.
    pub chained: Option<&'a Resolution>,
}

impl GeneratorContext<'_> {
    pub fn locale(&self) -> Option<&str> {
        self.variants
            .get(crate::variant::LOCALE)
            .map(String::as_str)
            .filter(|l| !l.is_empty())
    }
}

/// Output of a generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub content: String,
    /// Files the content was derived from. Changes to any of them make the
    /// generated resource stale.
    pub linked: Vec<PathBuf>,
}

impl Generated {
    pub fn new(content: String) -> Self {
        Self {
            content,
            linked: Vec::new(),
        }
    }

    pub fn with_linked(mut self, linked: impl IntoIterator<Item = PathBuf>) -> Self {
        self.linked.extend(linked);
        self
    }
}

/// A content-producing plugin for virtual resource paths.
pub trait Generator: Send + Sync {
    fn create_resource(&self, ctx: &GeneratorContext<'_>) -> Result<Generated>;

    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    fn inject(&mut self, _injection: Injection<'_>) {}

    fn after_properties_set(&mut self) -> Result<()> {
        Ok(())
    }

    fn before_bundling(&self) {}

    fn after_bundling(&self) {}

    fn available_variants(&self, _path: &str) -> VariantSpace {
        VariantSpace::new()
    }
}

/// Builds a fresh, uninitialized generator.
pub type GeneratorFactory = Arc<dyn Fn() -> Box<dyn Generator> + Send + Sync>;
