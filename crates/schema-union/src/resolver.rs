//! Runtime resolution of tagged messages to the latest variant.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::envelope::Envelope;
use crate::error::{RegistryError, ResolveError};
use crate::registry::VersionRegistry;
use crate::version::SchemaVersion;

/// A variant value together with the version it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedMessage<P> {
    /// Union discriminant.
    pub version: SchemaVersion,
    /// The variant, opaque to the engine.
    pub payload: P,
}

impl<P> TaggedMessage<P> {
    /// Tag `payload` with `version`.
    pub fn new(version: SchemaVersion, payload: P) -> Self {
        Self { version, payload }
    }

    /// Drop the tag.
    pub fn into_payload(self) -> P {
        self.payload
    }
}

/// Converts messages of any readable version into the latest variant.
///
/// A resolver owns a validated, read-only registry. It is cheap to clone and
/// safe to call from any number of threads at once; `resolve` never blocks
/// and never mutates shared state.
///
/// # Example
///
/// ```
/// use schema_union::{converter, Resolver, SchemaVersion, TaggedMessage, VersionRegistry};
///
/// let v = |n| SchemaVersion::new(n).unwrap();
///
/// let mut registry = VersionRegistry::with_versions(3);
/// registry.register_converter(v(1), v(2), converter::pure(|n: i64| n * 2)).unwrap();
/// registry.register_converter(v(2), v(3), converter::pure(|n: i64| n + 1)).unwrap();
///
/// let resolver = Resolver::new(registry).unwrap();
/// let latest = resolver.resolve(TaggedMessage::new(v(1), 5)).unwrap();
/// assert_eq!(latest, TaggedMessage::new(v(3), 11));
/// ```
pub struct Resolver<P> {
    registry: Arc<VersionRegistry<P>>,
    oldest: SchemaVersion,
    latest: SchemaVersion,
}

impl<P> Clone for Resolver<P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            oldest: self.oldest,
            latest: self.latest,
        }
    }
}

impl<P> fmt::Debug for Resolver<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("oldest", &self.oldest)
            .field("latest", &self.latest)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<P: 'static> Resolver<P> {
    /// Validate `registry` and build a resolver over it.
    pub fn new(registry: VersionRegistry<P>) -> Result<Self, RegistryError> {
        Self::with_config(registry, ResolverConfig::default())
    }

    /// Build a resolver with explicit configuration.
    ///
    /// Fails if validation is enabled and the registry is broken, if the
    /// registry is empty, or if the configured floor is above the latest
    /// version.
    pub fn with_config(
        registry: VersionRegistry<P>,
        config: ResolverConfig,
    ) -> Result<Self, RegistryError> {
        if config.validate_on_build {
            registry.validate()?;
        }
        let latest = registry.latest().ok_or(RegistryError::Empty)?;
        let oldest = config.min_supported_version.unwrap_or(SchemaVersion::FIRST);
        if oldest > latest {
            return Err(RegistryError::UnknownVersion {
                version: oldest,
                latest: Some(latest),
            });
        }

        Ok(Self {
            registry: Arc::new(registry),
            oldest,
            latest,
        })
    }

    /// Convert `message` to the latest variant.
    ///
    /// A message already at the latest version is returned untouched without
    /// running any converter. A message newer than the latest version, or
    /// older than the configured floor, is rejected rather than guessed at.
    /// If any converter fails, the whole resolution fails and no partially
    /// converted value escapes.
    pub fn resolve(&self, message: TaggedMessage<P>) -> Result<TaggedMessage<P>, ResolveError> {
        if message.version == self.latest {
            return Ok(message);
        }
        if !self.accepts(message.version) {
            debug!(
                version = %message.version,
                oldest = %self.oldest,
                latest = %self.latest,
                "rejecting message with unreadable version"
            );
            return Err(ResolveError::UnknownVersion {
                version: message.version,
                oldest: self.oldest,
                latest: self.latest,
            });
        }

        let source = message.version;
        let chain = self.registry.compose(source)?;
        let payload = chain.apply(message.payload).map_err(|error| {
            debug!(%error, %source, "resolution aborted");
            error
        })?;
        Ok(TaggedMessage::new(self.latest, payload))
    }

    /// Convert a bare payload written at `version`, returning the latest
    /// variant without its tag.
    pub fn resolve_payload(&self, version: SchemaVersion, payload: P) -> Result<P, ResolveError> {
        self.resolve(TaggedMessage::new(version, payload))
            .map(TaggedMessage::into_payload)
    }
}

impl<P> Resolver<P> {
    /// The registry this resolver reads.
    pub fn registry(&self) -> &VersionRegistry<P> {
        &self.registry
    }

    /// The version every resolved message ends up at.
    pub fn latest(&self) -> SchemaVersion {
        self.latest
    }

    /// The oldest version this resolver accepts.
    pub fn oldest(&self) -> SchemaVersion {
        self.oldest
    }

    /// Whether messages at `version` can be resolved.
    pub fn accepts(&self, version: SchemaVersion) -> bool {
        (self.oldest..=self.latest).contains(&version)
    }
}

impl Resolver<Vec<u8>> {
    /// Decode an [`Envelope`], resolve it, and re-encode the result at the
    /// latest version.
    pub fn resolve_bytes(&self, data: &[u8]) -> Result<Vec<u8>, ResolveError> {
        let envelope = Envelope::from_bytes(data)?;
        if envelope.version == self.latest {
            return Ok(data.to_vec());
        }
        let resolved = self.resolve(envelope.into())?;
        Ok(Envelope::from(resolved).to_bytes())
    }
}
