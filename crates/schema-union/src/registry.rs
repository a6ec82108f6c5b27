//! The version registry and its converter chain.
//!
//! Versions form a single linear chain `v1 → v2 → … → vN`. Each edge
//! `vi → vi+1` carries exactly one [`Converter`]. Reaching the latest version
//! from `vi` always takes exactly `N - i` steps, so composing a chain is a
//! slice over the ordered edges rather than a graph search.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, trace, warn};

use crate::converter::Converter;
use crate::error::{RegistryError, ResolveError};
use crate::version::SchemaVersion;

type SharedConverter<P> = Arc<dyn Converter<P>>;

/// One row of a registration table: a version and its converter to the next
/// version. Only the latest version has no converter.
pub struct VersionEntry<P> {
    /// The version being registered.
    pub version: SchemaVersion,
    /// Converter from `version` to its successor.
    pub converter_to_next: Option<SharedConverter<P>>,
}

impl<P> VersionEntry<P> {
    /// An entry whose variant converts to the next version with `converter`.
    pub fn new(version: SchemaVersion, converter: impl Converter<P> + 'static) -> Self {
        Self {
            version,
            converter_to_next: Some(Arc::new(converter)),
        }
    }

    /// The entry for the latest version.
    pub fn latest(version: SchemaVersion) -> Self {
        Self {
            version,
            converter_to_next: None,
        }
    }
}

impl<P> fmt::Debug for VersionEntry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionEntry")
            .field("version", &self.version)
            .field("converter_to_next", &self.converter_to_next.is_some())
            .finish()
    }
}

struct Step<P> {
    from: SchemaVersion,
    to: SchemaVersion,
    converter: SharedConverter<P>,
}

/// The ordered converters leading from one version to the latest.
///
/// Cloning is cheap: the steps are shared.
pub struct ComposedChain<P> {
    source: SchemaVersion,
    target: SchemaVersion,
    steps: Arc<[Step<P>]>,
}

impl<P> Clone for ComposedChain<P> {
    fn clone(&self) -> Self {
        Self {
            source: self.source,
            target: self.target,
            steps: Arc::clone(&self.steps),
        }
    }
}

impl<P> fmt::Debug for ComposedChain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedChain")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("edges", &self.edges().collect::<Vec<_>>())
            .finish()
    }
}

impl<P> ComposedChain<P> {
    /// Version the chain starts from.
    pub fn source(&self) -> SchemaVersion {
        self.source
    }

    /// Version the chain ends at.
    pub fn target(&self) -> SchemaVersion {
        self.target
    }

    /// Number of converters in the chain.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for the identity chain.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The `(from, to)` edges in application order.
    pub fn edges(&self) -> impl Iterator<Item = (SchemaVersion, SchemaVersion)> + '_ {
        self.steps.iter().map(|s| (s.from, s.to))
    }

    /// Run every converter in order, feeding each output into the next.
    ///
    /// The first failure aborts the chain; the partially converted value is
    /// dropped and never returned.
    pub fn apply(&self, input: P) -> Result<P, ResolveError> {
        self.steps.iter().try_fold(input, |value, step| {
            trace!(from = %step.from, to = %step.to, "applying converter");
            step.converter
                .convert(value)
                .map_err(|source| ResolveError::ConversionFailed {
                    from: step.from,
                    to: step.to,
                    source,
                })
        })
    }
}

/// The authoritative chain of schema versions and their adjacent converters.
///
/// Build it once at startup with [`register_variant`](Self::register_variant)
/// and [`register_converter`](Self::register_converter), then call
/// [`validate`](Self::validate). After that the registry is only read, and can
/// be shared across threads behind an `Arc`.
///
/// # Example
///
/// ```
/// use schema_union::{converter, SchemaVersion, VersionRegistry};
///
/// let v1 = SchemaVersion::FIRST;
/// let v2 = SchemaVersion::new(2).unwrap();
///
/// let mut registry = VersionRegistry::new();
/// registry.register_variant(v1).unwrap();
/// registry.register_variant(v2).unwrap();
/// registry
///     .register_converter(v1, v2, converter::pure(|s: String| s + "|humidity=none"))
///     .unwrap();
/// registry.validate().unwrap();
///
/// let chain = registry.compose(v1).unwrap();
/// assert_eq!(chain.len(), 1);
/// assert_eq!(chain.apply("temp=22.5".into()).unwrap(), "temp=22.5|humidity=none");
/// ```
pub struct VersionRegistry<P> {
    latest: Option<SchemaVersion>,
    converters: BTreeMap<SchemaVersion, SharedConverter<P>>,
    /// Memoized chains, indexed by source version. Reset whenever the latest
    /// version moves.
    chains: Vec<OnceLock<ComposedChain<P>>>,
}

impl<P> Default for VersionRegistry<P> {
    fn default() -> Self {
        Self {
            latest: None,
            converters: BTreeMap::new(),
            chains: Vec::new(),
        }
    }
}

impl<P> fmt::Debug for VersionRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionRegistry")
            .field("latest", &self.latest)
            .field("edges", &self.edges())
            .finish()
    }
}

impl<P: 'static> VersionRegistry<P> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding versions `v1..=vN` and no converters yet.
    pub fn with_versions(count: u32) -> Self {
        let mut registry = Self::new();
        if let Some(latest) = SchemaVersion::new(count) {
            registry.latest = Some(latest);
            registry.chains = (0..count).map(|_| OnceLock::new()).collect();
        }
        registry
    }

    /// Build and validate a registry from a registration table.
    ///
    /// Entries must be listed in version order starting at v1. Every entry
    /// but the last carries its converter to the next version.
    pub fn from_table(
        entries: impl IntoIterator<Item = VersionEntry<P>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for entry in entries {
            registry.register_variant(entry.version)?;
            if let Some(converter) = entry.converter_to_next {
                let to = entry
                    .version
                    .next()
                    .ok_or(RegistryError::NonAdjacentConversion {
                        from: entry.version,
                        to: entry.version,
                    })?;
                registry.register_shared(entry.version, to, converter)?;
            }
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Register `version` as the new latest version.
    ///
    /// The first registered version must be v1 and every later one must be
    /// the direct successor of the current latest.
    pub fn register_variant(&mut self, version: SchemaVersion) -> Result<(), RegistryError> {
        if self.contains(version) {
            return Err(RegistryError::DuplicateVersion { version });
        }
        let expected = match self.latest {
            None => SchemaVersion::FIRST,
            Some(latest) => latest.next().unwrap_or(latest),
        };
        if version != expected {
            return Err(RegistryError::VersionGap {
                expected,
                found: version,
            });
        }

        // Every memoized chain ended at the old latest.
        for cell in &mut self.chains {
            cell.take();
        }
        self.chains.push(OnceLock::new());
        self.latest = Some(version);

        debug!(%version, "registered variant");
        Ok(())
    }

    /// Register the converter for the edge `from → to`.
    ///
    /// `to` must be the direct successor of `from`. The edge may be
    /// registered before its versions are; [`validate`](Self::validate)
    /// reports converters that never get a target.
    pub fn register_converter(
        &mut self,
        from: SchemaVersion,
        to: SchemaVersion,
        converter: impl Converter<P> + 'static,
    ) -> Result<(), RegistryError> {
        self.register_shared(from, to, Arc::new(converter))
    }

    /// Register an already shared converter for the edge `from → to`.
    pub fn register_shared(
        &mut self,
        from: SchemaVersion,
        to: SchemaVersion,
        converter: Arc<dyn Converter<P>>,
    ) -> Result<(), RegistryError> {
        if !from.is_followed_by(to) {
            return Err(RegistryError::NonAdjacentConversion { from, to });
        }
        if self.converters.contains_key(&from) {
            return Err(RegistryError::DuplicateConverter { from, to });
        }
        self.converters.insert(from, converter);

        debug!(%from, %to, "registered converter");
        Ok(())
    }

    /// Compose the chain of converters from `from` to the latest version.
    ///
    /// Returns the empty chain when `from` is already the latest version.
    /// Chains are memoized per source version.
    pub fn compose(&self, from: SchemaVersion) -> Result<ComposedChain<P>, RegistryError> {
        let latest = self
            .latest
            .filter(|latest| from <= *latest)
            .ok_or(RegistryError::UnknownVersion {
                version: from,
                latest: self.latest,
            })?;

        let cell = &self.chains[from.index()];
        if let Some(chain) = cell.get() {
            return Ok(chain.clone());
        }
        let chain = self.build_chain(from, latest)?;
        Ok(cell.get_or_init(|| chain).clone())
    }

    fn build_chain(
        &self,
        from: SchemaVersion,
        latest: SchemaVersion,
    ) -> Result<ComposedChain<P>, RegistryError> {
        let mut steps = Vec::with_capacity((latest.get() - from.get()) as usize);
        let mut expected = from;
        for (&source, converter) in self.converters.range(from..latest) {
            if source != expected {
                return Err(missing_edge(expected));
            }
            let Some(to) = source.next() else { break };
            steps.push(Step {
                from: source,
                to,
                converter: Arc::clone(converter),
            });
            expected = to;
        }
        if expected != latest {
            return Err(missing_edge(expected));
        }

        Ok(ComposedChain {
            source: from,
            target: latest,
            steps: steps.into(),
        })
    }

    /// Check the whole chain: at least one version, a converter on every
    /// edge below the latest, and no converter past the latest.
    ///
    /// Call once after all registrations so that a broken chain stops
    /// startup instead of failing on the first read. Validation does not
    /// change the registry, so calling it again gives the same answer.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let result = self.check();
        match &result {
            Ok(()) => info!(
                latest = %self.latest.unwrap_or(SchemaVersion::FIRST),
                edges = self.converters.len(),
                "version registry validated"
            ),
            Err(error) => warn!(%error, "version registry failed validation"),
        }
        result
    }

    fn check(&self) -> Result<(), RegistryError> {
        let latest = self.latest.ok_or(RegistryError::Empty)?;

        let mut version = SchemaVersion::FIRST;
        while version < latest {
            if !self.converters.contains_key(&version) {
                return Err(missing_edge(version));
            }
            let Some(next) = version.next() else { break };
            version = next;
        }

        if let Some((&from, _)) = self.converters.range(latest..).next() {
            return Err(RegistryError::DanglingConverter {
                from,
                to: from.next().unwrap_or(from),
            });
        }
        Ok(())
    }
}

impl<P> VersionRegistry<P> {
    /// The latest registered version.
    pub fn latest(&self) -> Option<SchemaVersion> {
        self.latest
    }

    /// The oldest registered version: always v1 once anything is registered.
    pub fn oldest(&self) -> Option<SchemaVersion> {
        self.latest.map(|_| SchemaVersion::FIRST)
    }

    /// Whether `version` is registered.
    pub fn contains(&self, version: SchemaVersion) -> bool {
        self.latest.is_some_and(|latest| version <= latest)
    }

    /// All registered versions, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = SchemaVersion> {
        let count = self.latest.map_or(0, SchemaVersion::get);
        (1..=count).filter_map(SchemaVersion::new)
    }

    /// Registered converter edges as `(from, to)` pairs, ordered by source.
    pub fn edges(&self) -> Vec<(SchemaVersion, SchemaVersion)> {
        self.converters
            .keys()
            .filter_map(|&from| from.next().map(|to| (from, to)))
            .collect()
    }

    /// Whether data at `version` has to be converted to reach the latest.
    pub fn needs_conversion(&self, version: SchemaVersion) -> bool {
        self.latest != Some(version)
    }
}

fn missing_edge(from: SchemaVersion) -> RegistryError {
    RegistryError::MissingConverter {
        from,
        to: from.next().unwrap_or(from),
    }
}
