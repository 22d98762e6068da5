//! Name-keyed table of chunking strategies.
//!
//! A [`StrategyRegistry`] is an ordinary value built at start-up: nothing
//! is registered behind the caller's back, and tests can build their own.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use log::debug;

use crate::block_size::SizeHint;
use crate::chunker::{Chunker, FastCdcFactory, StandardFactory, ZeroPatternFactory};

/// Name of the fixed-span strategy.
pub const STANDARD: &str = "standard";

/// Name of the eight-zero-bytes pattern strategy.
pub const ZEROPATTERN: &str = "zeropattern";

/// Name of the content-defined strategy.
pub const FASTCDC: &str = "fastcdc";

/// Strategy returned by [`StrategyRegistry::default_factory`].
pub const DEFAULT_STRATEGY: &str = FASTCDC;

/// Builds chunkers for one strategy.
pub trait ChunkerFactory: Send + Sync {
    /// Creates a chunker over `reader`.
    ///
    /// `size` is the declared stream size and `prior_sizes` the chunk sizes
    /// used last time the stream was split; strategies may ignore either.
    fn new_chunker<'a>(
        &self,
        reader: Box<dyn Read + 'a>,
        size: SizeHint,
        prior_sizes: &[usize],
    ) -> Box<dyn Chunker + 'a>;
}

/// Maps strategy names to factories.
///
/// # Example
///
/// ```
/// use splitrs::{Chunker, SizeHint, StrategyRegistry};
///
/// let registry = StrategyRegistry::with_defaults();
/// let factory = registry.resolve("standard").expect("registered");
///
/// let data = vec![0u8; 1000];
/// let chunker = factory.new_chunker(Box::new(&data[..]), SizeHint::Known(1000), &[]);
/// assert_eq!(chunker.chunks().count(), 1);
///
/// assert!(registry.resolve("nonexistent").is_none());
/// ```
#[derive(Default, Clone)]
pub struct StrategyRegistry {
    factories: HashMap<String, Arc<dyn ChunkerFactory>>,
}

impl StrategyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding `"standard"`, `"zeropattern"` and
    /// `"fastcdc"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(STANDARD, StandardFactory);
        registry.register(ZEROPATTERN, ZeroPatternFactory);
        registry.register(FASTCDC, FastCdcFactory);
        registry
    }

    /// Registers `factory` under `name`, replacing any earlier one.
    pub fn register<F: ChunkerFactory + 'static>(&mut self, name: impl Into<String>, factory: F) {
        self.register_shared(name, Arc::new(factory));
    }

    /// Registers an already shared factory under `name`.
    pub fn register_shared(&mut self, name: impl Into<String>, factory: Arc<dyn ChunkerFactory>) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            debug!("replaced chunking strategy {:?}", name);
        } else {
            debug!("registered chunking strategy {:?}", name);
        }
    }

    /// Looks up the factory registered under `name`.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ChunkerFactory>> {
        self.factories.get(name).cloned()
    }

    /// Returns the factory registered as [`DEFAULT_STRATEGY`].
    pub fn default_factory(&self) -> Option<Arc<dyn ChunkerFactory>> {
        self.resolve(DEFAULT_STRATEGY)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.names())
            .finish()
    }
}
